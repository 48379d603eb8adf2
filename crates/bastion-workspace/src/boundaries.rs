//! Path resolution and confinement checking.

use bastion_core::PlatformProfile;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::config::GuardConfig;
use crate::error::{GuardError, GuardResult};
use crate::normalize::{detect_special_form, is_within, normalize_lexically, real_path, strip_verbatim};

/// A caller path that passed confinement.
///
/// Only [`PathGuard`] constructs this type, so holding one is proof that
/// `absolute_path` lies inside `root`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ResolvedPath {
    absolute_path: PathBuf,
    within_root: bool,
    root: PathBuf,
}

impl ResolvedPath {
    /// Canonical absolute path.
    #[must_use]
    pub fn absolute_path(&self) -> &Path {
        &self.absolute_path
    }

    /// Always `true`; kept as an explicit field for callers that serialize it.
    #[must_use]
    pub fn within_root(&self) -> bool {
        self.within_root
    }

    /// Confinement root the path matched.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether the target currently exists (symlinks not followed).
    #[must_use]
    pub fn exists(&self) -> bool {
        std::fs::symlink_metadata(&self.absolute_path).is_ok()
    }

    /// Path relative to the root (empty for the root itself).
    #[must_use]
    pub fn relative(&self) -> &Path {
        self.absolute_path
            .strip_prefix(&self.root)
            .unwrap_or(&self.absolute_path)
    }

    /// Resolve a direct descendant discovered by walking this directory.
    ///
    /// Used by recursive walkers that enumerate entries under an already
    /// confined directory. The child is re-checked against the same root.
    ///
    /// # Errors
    ///
    /// Returns [`GuardError::OutsideRoot`] if `child` is not under this path.
    pub fn child(&self, child: &Path) -> GuardResult<Self> {
        let normalized = normalize_lexically(child);
        if !normalized.starts_with(&self.absolute_path) || !normalized.starts_with(&self.root) {
            return Err(GuardError::OutsideRoot {
                path: normalized.display().to_string(),
                root: self.root.display().to_string(),
            });
        }
        Ok(Self {
            absolute_path: normalized,
            within_root: true,
            root: self.root.clone(),
        })
    }
}

impl AsRef<Path> for ResolvedPath {
    fn as_ref(&self) -> &Path {
        &self.absolute_path
    }
}

/// Per-call resolution options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Explicit confinement root for this call (absolute).
    pub working_root: Option<PathBuf>,
    /// Check the link location rather than the link target.
    /// `None` falls back to the guard's configured default.
    pub allow_symlink_escape: Option<bool>,
}

impl ResolveOptions {
    /// Options with an explicit working root.
    #[must_use]
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            working_root: Some(root.into()),
            allow_symlink_escape: None,
        }
    }

    /// Allow symlinks to point outside the root.
    #[must_use]
    pub fn allowing_symlink_escape(mut self) -> Self {
        self.allow_symlink_escape = Some(true);
        self
    }
}

/// Result of a yes/no confinement check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PathCheck {
    /// Path resolves inside the root.
    Allowed,
    /// Path was refused.
    Denied,
}

impl PathCheck {
    /// Check if the path is allowed.
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }
}

/// Resolves caller paths and proves confinement.
///
/// Stateless apart from its configuration; safe to share between calls.
#[derive(Debug, Clone)]
pub struct PathGuard {
    config: GuardConfig,
    profile: PlatformProfile,
}

impl PathGuard {
    /// Create a guard for the process platform profile.
    #[must_use]
    pub fn new(config: GuardConfig) -> Self {
        Self::with_profile(config, bastion_core::profile().clone())
    }

    /// Create a guard for an explicit platform profile.
    #[must_use]
    pub fn with_profile(config: GuardConfig, profile: PlatformProfile) -> Self {
        Self { config, profile }
    }

    /// Create a guard rooted at the caller's home directory.
    ///
    /// # Errors
    ///
    /// Returns [`GuardError::RootUnavailable`] if no home directory exists.
    pub fn for_caller() -> GuardResult<Self> {
        let home =
            bastion_core::caller_home().map_err(|e| GuardError::RootUnavailable(e.to_string()))?;
        Ok(Self::new(GuardConfig::new(home)))
    }

    /// Get the guard configuration.
    #[must_use]
    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    /// Get the platform profile in use.
    #[must_use]
    pub fn profile(&self) -> &PlatformProfile {
        &self.profile
    }

    /// Resolve a caller-supplied path into a confined absolute path.
    ///
    /// # Errors
    ///
    /// Returns a [`GuardError`] for malformed input, unsupported path forms,
    /// over-long paths, and any path (or symlink target) outside the root.
    pub fn resolve(&self, input: &str, options: &ResolveOptions) -> GuardResult<ResolvedPath> {
        if input.trim().is_empty() {
            return Err(GuardError::EmptyPath);
        }
        if input.contains('\0') {
            return Err(GuardError::NulByte);
        }

        let input = self.check_special_form(input)?;
        let root = self.select_root(options)?;
        let candidate = self.candidate(&input, &root);
        let lexical = normalize_lexically(&candidate);

        let length = lexical.as_os_str().len();
        if length > self.profile.max_path_length {
            warn!(length, limit = self.profile.max_path_length, "Rejected over-long path");
            return Err(GuardError::PathTooLong {
                length,
                limit: self.profile.max_path_length,
            });
        }

        let allow_escape = options
            .allow_symlink_escape
            .unwrap_or(self.config.allow_symlink_escape);
        let case_insensitive = self.profile.case_insensitive_paths();

        let resolved = if allow_escape {
            let lexical_root = normalize_lexically(&root);
            if !is_within(&lexical, &lexical_root, case_insensitive) {
                return Err(outside(&lexical, &lexical_root));
            }
            ResolvedPath {
                absolute_path: lexical,
                within_root: true,
                root: lexical_root,
            }
        } else {
            let real_root = real_path(&normalize_lexically(&root))
                .map_err(|e| GuardError::RootUnavailable(format!("{}: {e}", root.display())))?;
            let real = real_path(&lexical).map_err(|e| GuardError::Io {
                path: lexical.display().to_string(),
                source: e,
            })?;

            if !is_within(&real, &real_root, case_insensitive) {
                // Distinguish a plain escape from one that only a symlink enables.
                let lexical_root = normalize_lexically(&root);
                if is_within(&lexical, &lexical_root, case_insensitive) {
                    warn!(
                        path = %lexical.display(),
                        target = %real.display(),
                        "Rejected symlink escape"
                    );
                    return Err(GuardError::SymlinkEscape {
                        path: lexical.display().to_string(),
                        target: real.display().to_string(),
                        root: real_root.display().to_string(),
                    });
                }
                return Err(outside(&real, &real_root));
            }
            ResolvedPath {
                absolute_path: real,
                within_root: true,
                root: real_root,
            }
        };

        debug!(
            input = %input,
            resolved = %resolved.absolute_path.display(),
            root = %resolved.root.display(),
            "Resolved path"
        );
        Ok(resolved)
    }

    /// Resolve a path that must already exist.
    ///
    /// # Errors
    ///
    /// As [`resolve`](Self::resolve), plus [`GuardError::NotFound`].
    pub fn resolve_existing(
        &self,
        input: &str,
        options: &ResolveOptions,
    ) -> GuardResult<ResolvedPath> {
        let resolved = self.resolve(input, options)?;
        if resolved.exists() {
            Ok(resolved)
        } else {
            Err(GuardError::NotFound(resolved.absolute_path.display().to_string()))
        }
    }

    /// Check a path against the default root without producing a value.
    #[must_use]
    pub fn check(&self, input: &str) -> PathCheck {
        match self.resolve(input, &ResolveOptions::default()) {
            Ok(_) => PathCheck::Allowed,
            Err(_) => PathCheck::Denied,
        }
    }

    /// Check multiple paths and return the most restrictive result.
    #[must_use]
    pub fn check_all(&self, inputs: &[&str]) -> PathCheck {
        if inputs.iter().all(|p| self.check(p).is_allowed()) {
            PathCheck::Allowed
        } else {
            PathCheck::Denied
        }
    }

    fn check_special_form(&self, input: &str) -> GuardResult<String> {
        // Only meaningful where backslash is a separator.
        if !self.profile.is_windows() {
            return Ok(input.to_string());
        }
        match detect_special_form(input) {
            None => Ok(input.to_string()),
            Some(form) if self.config.allow_long_path_forms && form != "device" => {
                Ok(strip_verbatim(input))
            },
            Some(form) => {
                warn!(path = %input, form, "Rejected special path form");
                Err(GuardError::UnsupportedForm {
                    path: input.to_string(),
                    form,
                })
            },
        }
    }

    fn select_root(&self, options: &ResolveOptions) -> GuardResult<PathBuf> {
        let root = options
            .working_root
            .as_ref()
            .or(self.config.working_root.as_ref())
            .unwrap_or(&self.config.home);

        if !root.is_absolute() {
            return Err(GuardError::RelativeRoot(root.display().to_string()));
        }
        Ok(root.clone())
    }

    fn candidate(&self, input: &str, root: &Path) -> PathBuf {
        if input == "~" {
            return self.config.home.clone();
        }
        if let Some(rest) = input
            .strip_prefix("~/")
            .or_else(|| input.strip_prefix("~\\").filter(|_| self.profile.is_windows()))
        {
            return self.config.home.join(rest);
        }

        let path = Path::new(input);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            root.join(path)
        }
    }
}

fn outside(path: &Path, root: &Path) -> GuardError {
    warn!(path = %path.display(), root = %root.display(), "Rejected path outside root");
    GuardError::OutsideRoot {
        path: path.display().to_string(),
        root: root.display().to_string(),
    }
}
