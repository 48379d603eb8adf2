//! Guard configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for a [`PathGuard`](crate::PathGuard).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardConfig {
    /// The caller's home directory; the default confinement root.
    pub home: PathBuf,
    /// Default working root for calls that do not supply one.
    #[serde(default)]
    pub working_root: Option<PathBuf>,
    /// Default for `allow_symlink_escape` when a call does not override it.
    #[serde(default)]
    pub allow_symlink_escape: bool,
    /// Accept UNC (`\\server\share`) and `\\?\` long-path forms.
    #[serde(default)]
    pub allow_long_path_forms: bool,
}

impl GuardConfig {
    /// Create a config rooted at the given home directory.
    #[must_use]
    pub fn new(home: impl Into<PathBuf>) -> Self {
        Self {
            home: home.into(),
            working_root: None,
            allow_symlink_escape: false,
            allow_long_path_forms: false,
        }
    }

    /// Set a default working root.
    #[must_use]
    pub fn with_working_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.working_root = Some(root.into());
        self
    }

    /// Accept UNC and long-path forms.
    #[must_use]
    pub fn allow_long_path_forms(mut self) -> Self {
        self.allow_long_path_forms = true;
        self
    }

    /// Resolve symlinks lexically only (the link location is checked, not its target).
    #[must_use]
    pub fn allow_symlink_escape(mut self) -> Self {
        self.allow_symlink_escape = true;
        self
    }
}
