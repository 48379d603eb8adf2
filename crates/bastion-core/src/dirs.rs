//! Home directory discovery.
//!
//! - [`caller_home()`]: the caller's home directory, the default confinement
//!   root for path resolution.
//! - [`BastionHome`]: Bastion's own state at `~/.bastion/` (or
//!   `$BASTION_HOME`), holding the user config and log files.
//!
//! ```text
//! ~/.bastion/                     (BastionHome)
//! ├── logs/                         (rolling log files)
//! └── config.toml                   (user config layer)
//! ```

use std::io;
use std::path::{Path, PathBuf};

/// Environment variable overriding the Bastion home directory.
pub const BASTION_HOME_ENV: &str = "BASTION_HOME";

/// The caller's home directory.
///
/// # Errors
///
/// Returns an error if the platform reports no home directory.
pub fn caller_home() -> io::Result<PathBuf> {
    directories::BaseDirs::new()
        .map(|d| d.home_dir().to_path_buf())
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no home directory for caller"))
}

/// Bastion state directory (`~/.bastion/` or `$BASTION_HOME`).
#[derive(Debug, Clone)]
pub struct BastionHome {
    root: PathBuf,
}

impl BastionHome {
    /// Resolve the state directory.
    ///
    /// Checks `$BASTION_HOME` first, then falls back to `<home>/.bastion/`.
    ///
    /// # Errors
    ///
    /// Returns an error if `$BASTION_HOME` is relative or no home directory
    /// can be found.
    pub fn resolve() -> io::Result<Self> {
        let root = if let Ok(custom) = std::env::var(BASTION_HOME_ENV) {
            let p = PathBuf::from(&custom);
            if !p.is_absolute() {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "BASTION_HOME must be an absolute path",
                ));
            }
            p
        } else {
            caller_home()?.join(".bastion")
        };

        Ok(Self { root })
    }

    /// Create from an explicit path (useful for testing).
    #[must_use]
    pub fn from_path(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Ensure the directory structure exists, owner-only on Unix.
    ///
    /// # Errors
    ///
    /// Returns an error if directory creation or permission setting fails.
    pub fn ensure(&self) -> io::Result<()> {
        std::fs::create_dir_all(self.logs_dir())?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o700);
            std::fs::set_permissions(self.root(), perms.clone())?;
            std::fs::set_permissions(self.logs_dir(), perms)?;
        }
        Ok(())
    }

    /// Root directory path.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Logs directory (`~/.bastion/logs/`).
    #[must_use]
    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    /// User configuration file (`~/.bastion/config.toml`).
    #[must_use]
    pub fn config_path(&self) -> PathBuf {
        self.root.join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout() {
        let home = BastionHome::from_path("/tmp/bastion-test");
        assert_eq!(home.root(), Path::new("/tmp/bastion-test"));
        assert_eq!(home.logs_dir(), PathBuf::from("/tmp/bastion-test/logs"));
        assert_eq!(
            home.config_path(),
            PathBuf::from("/tmp/bastion-test/config.toml")
        );
    }

    #[test]
    fn test_ensure_creates_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let home = BastionHome::from_path(dir.path().join("state"));
        home.ensure().unwrap();
        assert!(home.logs_dir().is_dir());

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(home.root()).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o700);
        }
    }

    #[test]
    fn test_caller_home_is_absolute() {
        if let Ok(home) = caller_home() {
            assert!(home.is_absolute());
        }
    }
}
