//! Shared test harness for integration tests.

use std::path::{Path, PathBuf};

use bastion_config::Config;
use bastion_core::{PlatformProfile, ToolOutcome};
use bastion_tools::{ToolContext, ToolRegistry};
use serde_json::Value;
use tempfile::TempDir;

/// A tool context confined to a fresh temporary root.
///
/// The tempdir is cleaned up when the harness is dropped.
#[allow(dead_code)]
pub struct ToolHarness {
    /// Canonical confinement root.
    pub root: PathBuf,
    /// Context handed to every tool call.
    pub ctx: ToolContext,
    /// Registry with the default tools.
    pub registry: ToolRegistry,
    _dir: TempDir,
}

#[allow(dead_code)]
impl ToolHarness {
    /// Harness with the default configuration and the Linux profile.
    pub fn new() -> Self {
        Self::with_config(&Config::default())
    }

    /// Harness built from a configuration.
    pub fn with_config(config: &Config) -> Self {
        let dir = TempDir::new().expect("failed to create tempdir");
        let root = dir.path().canonicalize().expect("failed to canonicalize tempdir");
        let ctx = ToolContext::from_config(config, &root, PlatformProfile::linux())
            .expect("failed to build tool context");
        Self {
            root,
            ctx,
            registry: ToolRegistry::with_defaults(),
            _dir: dir,
        }
    }

    /// Invoke a tool by name.
    pub async fn call(&self, tool: &str, args: Value) -> ToolOutcome {
        self.registry.execute(tool, args, &self.ctx).await
    }

    /// Absolute path of `rel` under the root.
    pub fn path(&self, rel: &str) -> PathBuf {
        self.root.join(rel)
    }

    /// Write a file under the root, creating parents.
    pub fn write(&self, rel: &str, contents: &str) -> PathBuf {
        let path = self.path(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("failed to create parent");
        }
        std::fs::write(&path, contents).expect("failed to write fixture");
        path
    }
}

/// Permission bits of a path (Unix).
#[cfg(unix)]
#[allow(dead_code)]
pub fn mode_of(path: &Path) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    std::fs::symlink_metadata(path)
        .expect("failed to stat")
        .permissions()
        .mode()
        & 0o7777
}
