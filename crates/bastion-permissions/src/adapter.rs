//! Permission adapter: snapshots and bounded, reported mutation.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use bastion_core::error::io_error_kind;
use bastion_core::{ErrorKind, PlatformProfile};
use bastion_workspace::ResolvedPath;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::apply::{OpApplier, SystemApplier};
use crate::error::{PermissionError, PermissionResult};
use crate::request::{PermissionOp, PermissionRequest, plan};
use crate::snapshot::PermissionSnapshot;

/// Default recursion bound.
pub const DEFAULT_MAX_DEPTH: usize = 16;

/// Options for [`PermissionAdapter::set`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetOptions {
    /// Apply to the whole subtree of a directory target.
    #[serde(default)]
    pub recursive: bool,
    /// Deepest level modified (the target is depth 0).
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    /// Record failures and keep going instead of aborting.
    #[serde(default)]
    pub skip_errors: bool,
}

fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

impl Default for SetOptions {
    fn default() -> Self {
        Self {
            recursive: false,
            max_depth: DEFAULT_MAX_DEPTH,
            skip_errors: false,
        }
    }
}

impl SetOptions {
    /// Recursive options with the given bound.
    #[must_use]
    pub fn recursive(max_depth: usize) -> Self {
        Self {
            recursive: true,
            max_depth,
            skip_errors: false,
        }
    }

    /// Record failures instead of aborting.
    #[must_use]
    pub fn skip_errors(mut self) -> Self {
        self.skip_errors = true;
        self
    }
}

/// Outcome of one sub-operation on one path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubOperation {
    /// Path the operation targeted.
    pub path: PathBuf,
    /// Operation description (`chmod 0755`, `attrib +R`, `walk`, `descend`).
    pub op: String,
    /// Whether it succeeded.
    pub success: bool,
    /// Failure detail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Failure kind.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
}

impl SubOperation {
    fn ok(path: &Path, op: &PermissionOp) -> Self {
        Self {
            path: path.to_path_buf(),
            op: op.to_string(),
            success: true,
            error: None,
            error_kind: None,
        }
    }

    fn failed(path: &Path, op: impl Into<String>, kind: ErrorKind, error: impl Into<String>) -> Self {
        Self {
            path: path.to_path_buf(),
            op: op.into(),
            success: false,
            error: Some(error.into()),
            error_kind: Some(kind),
        }
    }
}

/// Per-item report of a permission change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MutationReport {
    /// The resolved target.
    pub target: PathBuf,
    /// Every sub-operation attempted, in execution order.
    pub operations: Vec<SubOperation>,
    /// Whether part of the tree was left unvisited by `max_depth`.
    pub truncated: bool,
}

impl MutationReport {
    /// Number of successful sub-operations.
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.operations.iter().filter(|o| o.success).count()
    }

    /// Failed sub-operations.
    #[must_use]
    pub fn failures(&self) -> Vec<&SubOperation> {
        self.operations.iter().filter(|o| !o.success).collect()
    }

    /// Check if every sub-operation succeeded and nothing was truncated.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.truncated && self.operations.iter().all(|o| o.success)
    }
}

/// Entries collected before any modification.
#[derive(Debug, Default)]
struct TreeScan {
    /// Entries to modify, children before their directory.
    entries: Vec<PathBuf>,
    /// Directories at `max_depth` whose children were not visited.
    truncated_dirs: Vec<PathBuf>,
    /// Walk failures (only kept with `skip_errors`).
    walk_failures: Vec<SubOperation>,
}

/// Inspects and changes permissions on confined paths.
#[derive(Debug, Clone)]
pub struct PermissionAdapter {
    profile: PlatformProfile,
    applier: Arc<dyn OpApplier>,
}

impl PermissionAdapter {
    /// Adapter for a profile using the host's native facilities.
    #[must_use]
    pub fn new(profile: PlatformProfile) -> Self {
        Self::with_applier(profile, Arc::new(SystemApplier))
    }

    /// Adapter with a custom sub-operation applier.
    #[must_use]
    pub fn with_applier(profile: PlatformProfile, applier: Arc<dyn OpApplier>) -> Self {
        Self { profile, applier }
    }

    /// Get the platform profile in use.
    #[must_use]
    pub fn profile(&self) -> &PlatformProfile {
        &self.profile
    }

    /// Snapshot the permission state of a path.
    ///
    /// # Errors
    ///
    /// Returns [`PermissionError::NotFound`] if the target does not exist.
    pub fn get(&self, target: &ResolvedPath) -> PermissionResult<PermissionSnapshot> {
        let path = target.absolute_path();
        let meta = std::fs::symlink_metadata(path).map_err(|e| not_found_or_io(path, e))?;
        Ok(PermissionSnapshot::from_metadata(path, &meta))
    }

    /// Apply a permission request to a path and, optionally, its subtree.
    ///
    /// # Errors
    ///
    /// - Planning errors (`InvalidArgument`, `PlatformUnsupported`)
    /// - [`PermissionError::NotFound`] if the target does not exist
    /// - [`PermissionError::SymlinkTarget`] if the target is a symlink
    /// - With `skip_errors = false`: [`PermissionError::DepthExceeded`]
    ///   before any change, or the first failing sub-operation
    pub fn set(
        &self,
        target: &ResolvedPath,
        request: &PermissionRequest,
        options: &SetOptions,
    ) -> PermissionResult<MutationReport> {
        let ops = plan(request, &self.profile)?;
        let root = target.absolute_path();
        let meta = std::fs::symlink_metadata(root).map_err(|e| not_found_or_io(root, e))?;
        // chmod follows links; the walk never does, and neither does the target.
        if meta.file_type().is_symlink() {
            warn!(target = %root.display(), "Refusing permission change on a symlink");
            return Err(PermissionError::SymlinkTarget(root.to_path_buf()));
        }

        let scan = if options.recursive && meta.is_dir() {
            scan_tree(root, options)?
        } else {
            TreeScan {
                entries: vec![root.to_path_buf()],
                ..TreeScan::default()
            }
        };

        let mut report = MutationReport {
            target: root.to_path_buf(),
            operations: scan.walk_failures,
            truncated: !scan.truncated_dirs.is_empty(),
        };

        for path in &scan.entries {
            for op in &ops {
                match self.applier.apply(path, op) {
                    Ok(()) => {
                        debug!(path = %path.display(), op = %op, "Applied permission change");
                        report.operations.push(SubOperation::ok(path, op));
                    },
                    Err(e) if options.skip_errors => {
                        warn!(path = %path.display(), op = %op, error = %e, "Permission change failed, continuing");
                        report.operations.push(SubOperation::failed(
                            path,
                            op.to_string(),
                            io_error_kind(&e),
                            e.to_string(),
                        ));
                    },
                    Err(e) => {
                        warn!(path = %path.display(), op = %op, error = %e, "Permission change failed");
                        return Err(PermissionError::OperationFailed {
                            path: path.clone(),
                            op: op.to_string(),
                            source: e,
                        });
                    },
                }
            }
        }

        for dir in &scan.truncated_dirs {
            report.operations.push(SubOperation::failed(
                dir,
                "descend",
                ErrorKind::LimitReached,
                format!("children not visited: max_depth {} reached", options.max_depth),
            ));
        }

        info!(
            target = %root.display(),
            entries = scan.entries.len(),
            succeeded = report.succeeded(),
            failed = report.failures().len(),
            truncated = report.truncated,
            "Permission change complete"
        );
        Ok(report)
    }
}

/// Collect the subtree without modifying anything.
///
/// Walks one level past `max_depth` so an over-deep tree is detected
/// without scanning all of it.
fn scan_tree(root: &Path, options: &SetOptions) -> PermissionResult<TreeScan> {
    let mut scan = TreeScan::default();
    let walker = WalkDir::new(root)
        .follow_links(false)
        .contents_first(true)
        .max_depth(options.max_depth.saturating_add(1));

    for item in walker {
        let entry = match item {
            Ok(entry) => entry,
            Err(e) => {
                let path = e.path().unwrap_or(root).to_path_buf();
                let message = e.to_string();
                let source = e
                    .into_io_error()
                    .unwrap_or_else(|| std::io::Error::other(message.clone()));
                if !options.skip_errors {
                    return Err(PermissionError::Io { path, source });
                }
                warn!(path = %path.display(), error = %message, "Skipping unreadable entry");
                scan.walk_failures.push(SubOperation::failed(
                    &path,
                    "walk",
                    io_error_kind(&source),
                    message,
                ));
                continue;
            },
        };

        if entry.depth() > options.max_depth {
            if !options.skip_errors {
                return Err(PermissionError::DepthExceeded {
                    path: entry.path().to_path_buf(),
                    depth: entry.depth(),
                    max_depth: options.max_depth,
                });
            }
            if let Some(parent) = entry.path().parent()
                && scan.truncated_dirs.last().map(PathBuf::as_path) != Some(parent)
            {
                scan.truncated_dirs.push(parent.to_path_buf());
            }
            continue;
        }

        if entry.path_is_symlink() {
            debug!(path = %entry.path().display(), "Skipping symlink");
            continue;
        }
        scan.entries.push(entry.into_path());
    }

    scan.truncated_dirs.dedup();
    Ok(scan)
}

fn not_found_or_io(path: &Path, e: std::io::Error) -> PermissionError {
    if e.kind() == std::io::ErrorKind::NotFound {
        PermissionError::NotFound(path.to_path_buf())
    } else {
        PermissionError::Io {
            path: path.to_path_buf(),
            source: e,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{AclEntry, AclRights, WindowsDelta};
    use bastion_core::HasErrorKind;
    use bastion_workspace::{GuardConfig, PathGuard, ResolveOptions};
    use std::io;
    use std::sync::Mutex;

    /// Records applied ops; fails on entries named `deny-me.txt`.
    #[derive(Debug, Default)]
    struct RecordingApplier {
        applied: Mutex<Vec<(PathBuf, String)>>,
    }

    impl OpApplier for RecordingApplier {
        fn apply(&self, path: &Path, op: &PermissionOp) -> io::Result<()> {
            if path.file_name().is_some_and(|n| n == "deny-me.txt") {
                return Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"));
            }
            self.applied
                .lock()
                .unwrap()
                .push((path.to_path_buf(), op.to_string()));
            Ok(())
        }
    }

    /// root/a/b/c/file.txt plus root/top.txt
    fn tree() -> (tempfile::TempDir, PathGuard, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        std::fs::create_dir_all(root.join("a/b/c")).unwrap();
        std::fs::write(root.join("a/b/c/file.txt"), "x").unwrap();
        std::fs::write(root.join("top.txt"), "x").unwrap();
        let guard = PathGuard::with_profile(GuardConfig::new(&root), PlatformProfile::linux());
        (dir, guard, root)
    }

    fn resolve(guard: &PathGuard, p: &str) -> ResolvedPath {
        guard.resolve(p, &ResolveOptions::default()).unwrap()
    }

    fn recording(profile: PlatformProfile) -> (PermissionAdapter, Arc<RecordingApplier>) {
        let applier = Arc::new(RecordingApplier::default());
        (
            PermissionAdapter::with_applier(profile, applier.clone()),
            applier,
        )
    }

    #[test]
    fn test_non_recursive_touches_only_target() {
        let (_dir, guard, root) = tree();
        let (adapter, applier) = recording(PlatformProfile::linux());

        let report = adapter
            .set(
                &resolve(&guard, "a"),
                &PermissionRequest::Mode { mode: 0o700 },
                &SetOptions::default(),
            )
            .unwrap();
        assert_eq!(report.operations.len(), 1);
        assert!(report.is_complete());
        let applied = applier.applied.lock().unwrap();
        assert_eq!(applied[0].0, root.join("a"));
    }

    #[test]
    fn test_depth_exceeded_modifies_nothing() {
        let (_dir, guard, _root) = tree();
        let (adapter, applier) = recording(PlatformProfile::linux());

        // a/b/c/file.txt is depth 3 below "a".
        let err = adapter
            .set(
                &resolve(&guard, "a"),
                &PermissionRequest::Mode { mode: 0o700 },
                &SetOptions::recursive(2),
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::LimitReached);
        assert!(applier.applied.lock().unwrap().is_empty());
    }

    #[test]
    fn test_recursive_within_bound_children_first() {
        let (_dir, guard, root) = tree();
        let (adapter, applier) = recording(PlatformProfile::linux());

        let report = adapter
            .set(
                &resolve(&guard, "a"),
                &PermissionRequest::Mode { mode: 0o750 },
                &SetOptions::recursive(3),
            )
            .unwrap();
        assert!(report.is_complete());
        assert_eq!(report.succeeded(), 4);

        let applied = applier.applied.lock().unwrap();
        let paths: Vec<_> = applied.iter().map(|(p, _)| p.clone()).collect();
        assert_eq!(paths.last(), Some(&root.join("a")));
        let file_pos = paths.iter().position(|p| p.ends_with("file.txt")).unwrap();
        let c_pos = paths.iter().position(|p| p.ends_with("c")).unwrap();
        assert!(file_pos < c_pos);
    }

    #[test]
    fn test_skip_errors_truncates_and_records() {
        let (_dir, guard, root) = tree();
        let (adapter, applier) = recording(PlatformProfile::linux());

        let report = adapter
            .set(
                &resolve(&guard, "a"),
                &PermissionRequest::Mode { mode: 0o750 },
                &SetOptions::recursive(1).skip_errors(),
            )
            .unwrap();
        assert!(report.truncated);
        let failures = report.failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].path, root.join("a/b"));
        assert_eq!(failures[0].error_kind, Some(ErrorKind::LimitReached));
        // a and a/b modified, nothing below.
        assert_eq!(applier.applied.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_skip_errors_continues_past_failures() {
        let (_dir, guard, root) = tree();
        std::fs::write(root.join("a/deny-me.txt"), "x").unwrap();
        let (adapter, _applier) = recording(PlatformProfile::linux());

        let report = adapter
            .set(
                &resolve(&guard, "a"),
                &PermissionRequest::Mode { mode: 0o750 },
                &SetOptions::recursive(8).skip_errors(),
            )
            .unwrap();
        assert!(!report.truncated);
        assert_eq!(report.failures().len(), 1);
        assert_eq!(report.succeeded(), 4);
    }

    #[test]
    fn test_first_failure_aborts_without_skip_errors() {
        let (_dir, guard, root) = tree();
        std::fs::write(root.join("a/deny-me.txt"), "x").unwrap();
        let (adapter, _applier) = recording(PlatformProfile::linux());

        let err = adapter
            .set(
                &resolve(&guard, "a"),
                &PermissionRequest::Mode { mode: 0o750 },
                &SetOptions::recursive(8),
            )
            .unwrap_err();
        assert!(matches!(err, PermissionError::OperationFailed { .. }));
    }

    #[test]
    fn test_windows_plan_reports_each_sub_operation() {
        let (_dir, guard, root) = tree();
        let (adapter, applier) = recording(PlatformProfile::windows());

        let delta = WindowsDelta {
            readonly: Some(true),
            hidden: Some(true),
            grant: vec![AclEntry {
                principal: "Users".to_string(),
                rights: AclRights::Read,
            }],
            ..WindowsDelta::default()
        };
        let report = adapter
            .set(
                &resolve(&guard, "top.txt"),
                &PermissionRequest::Windows(delta),
                &SetOptions::default(),
            )
            .unwrap();
        let ops: Vec<&str> = report.operations.iter().map(|o| o.op.as_str()).collect();
        assert_eq!(ops, ["attrib +R", "attrib +H", "grant Users:(R)"]);
        assert!(applier.applied.lock().unwrap().iter().all(|(p, _)| *p == root.join("top.txt")));
    }

    #[test]
    fn test_unsupported_request_fails_before_io() {
        let (_dir, guard, _root) = tree();
        let adapter = PermissionAdapter::new(PlatformProfile::linux());
        let err = adapter
            .set(
                &resolve(&guard, "top.txt"),
                &PermissionRequest::Windows(WindowsDelta {
                    hidden: Some(true),
                    ..WindowsDelta::default()
                }),
                &SetOptions::default(),
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PlatformUnsupported);
    }

    #[test]
    fn test_missing_target_not_found() {
        let (_dir, guard, _root) = tree();
        let adapter = PermissionAdapter::new(PlatformProfile::linux());
        let target = resolve(&guard, "missing.txt");
        assert_eq!(adapter.get(&target).unwrap_err().kind(), ErrorKind::NotFound);
        let err = adapter
            .set(
                &target,
                &PermissionRequest::Mode { mode: 0o600 },
                &SetOptions::default(),
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks_not_followed() {
        let (_dir, guard, root) = tree();
        let outside = tempfile::tempdir().unwrap();
        std::fs::write(outside.path().join("victim"), "x").unwrap();
        std::os::unix::fs::symlink(outside.path().join("victim"), root.join("a/link")).unwrap();
        let (adapter, applier) = recording(PlatformProfile::linux());

        adapter
            .set(
                &resolve(&guard, "a"),
                &PermissionRequest::Mode { mode: 0o700 },
                &SetOptions::recursive(8),
            )
            .unwrap();
        assert!(
            applier
                .applied
                .lock()
                .unwrap()
                .iter()
                .all(|(p, _)| !p.ends_with("link"))
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_target_refused() {
        use std::os::unix::fs::PermissionsExt;
        let (_dir, guard, root) = tree();
        let outside = tempfile::tempdir().unwrap();
        let victim = outside.path().join("victim");
        std::fs::write(&victim, "x").unwrap();
        std::fs::set_permissions(&victim, std::fs::Permissions::from_mode(0o644)).unwrap();
        std::os::unix::fs::symlink(&victim, root.join("link")).unwrap();

        let target = guard
            .resolve("link", &ResolveOptions::default().allowing_symlink_escape())
            .unwrap();
        let adapter = PermissionAdapter::new(PlatformProfile::linux());
        let err = adapter
            .set(&target, &PermissionRequest::Mode { mode: 0o777 }, &SetOptions::default())
            .unwrap_err();
        assert!(matches!(err, PermissionError::SymlinkTarget(_)));
        assert_eq!(err.kind(), ErrorKind::PathDenied);

        let mode = std::fs::metadata(&victim).unwrap().permissions().mode();
        assert_eq!(mode & 0o7777, 0o644);
    }

    #[cfg(unix)]
    #[test]
    fn test_real_chmod_and_snapshot() {
        let (_dir, guard, _root) = tree();
        let adapter = PermissionAdapter::new(PlatformProfile::linux());
        let target = resolve(&guard, "top.txt");

        adapter
            .set(
                &target,
                &PermissionRequest::Mode { mode: 0o600 },
                &SetOptions::default(),
            )
            .unwrap();
        let snap = adapter.get(&target).unwrap();
        assert_eq!(snap.posix.unwrap().octal, "0600");
    }
}
