//! Executing planned sub-operations against the filesystem.

use std::io;
use std::path::Path;
use std::process::Command;

use crate::request::PermissionOp;

/// Applies one sub-operation to one path.
///
/// [`SystemApplier`] talks to the operating system; tests substitute a
/// recording implementation to exercise plans for other platforms.
pub trait OpApplier: Send + Sync + std::fmt::Debug {
    /// Apply `op` to `path`.
    ///
    /// # Errors
    ///
    /// Returns the operating system error for a failed change.
    fn apply(&self, path: &Path, op: &PermissionOp) -> io::Result<()>;
}

/// Applies sub-operations with the host's native facilities.
///
/// - `SetMode`: `chmod(2)` via [`std::fs::set_permissions`]
/// - `SetAttribute`: `attrib`
/// - `Grant` / `Deny`: `icacls`
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemApplier;

impl OpApplier for SystemApplier {
    fn apply(&self, path: &Path, op: &PermissionOp) -> io::Result<()> {
        match op {
            PermissionOp::SetMode { mode } => set_mode(path, *mode),
            PermissionOp::SetAttribute { attribute, enabled } => {
                let sign = if *enabled { '+' } else { '-' };
                run_windows_tool("attrib", &[format!("{sign}{}", attribute.flag())], path, &[])
            },
            PermissionOp::Grant(entry) => run_windows_tool(
                "icacls",
                &[],
                path,
                &[
                    "/grant".to_string(),
                    format!("{}:({})", entry.principal, entry.rights.code()),
                ],
            ),
            PermissionOp::Deny(entry) => run_windows_tool(
                "icacls",
                &[],
                path,
                &[
                    "/deny".to_string(),
                    format!("{}:({})", entry.principal, entry.rights.code()),
                ],
            ),
        }
    }
}

/// Follows symlinks. [`PermissionAdapter::set`](crate::PermissionAdapter::set)
/// never hands it one.
#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "mode bits are not available on this platform",
    ))
}

fn run_windows_tool(
    program: &str,
    before: &[String],
    path: &Path,
    after: &[String],
) -> io::Result<()> {
    if !cfg!(windows) {
        return Err(io::Error::new(
            io::ErrorKind::Unsupported,
            format!("{program} is only available on Windows"),
        ));
    }
    let output = Command::new(program)
        .args(before)
        .arg(path)
        .args(after)
        .output()?;
    if output.status.success() {
        Ok(())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let stdout = String::from_utf8_lossy(&output.stdout);
        let detail = if stderr.trim().is_empty() {
            stdout.trim().to_string()
        } else {
            stderr.trim().to_string()
        };
        Err(io::Error::other(format!(
            "{program} exited with {}: {detail}",
            output.status
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::FileAttribute;

    #[cfg(unix)]
    #[test]
    fn test_set_mode_applies() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("f");
        std::fs::write(&file, "x").unwrap();

        SystemApplier
            .apply(&file, &PermissionOp::SetMode { mode: 0o640 })
            .unwrap();
        let mode = std::fs::metadata(&file).unwrap().permissions().mode();
        assert_eq!(mode & 0o7777, 0o640);
    }

    #[cfg(unix)]
    #[test]
    fn test_windows_ops_unsupported_on_unix() {
        let dir = tempfile::tempdir().unwrap();
        let err = SystemApplier
            .apply(
                dir.path(),
                &PermissionOp::SetAttribute {
                    attribute: FileAttribute::Hidden,
                    enabled: true,
                },
            )
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::Unsupported);
    }
}
