//! Platform capability model.
//!
//! A [`PlatformProfile`] captures the handful of platform facts the policy
//! layer branches on: path separator and length limit, permission model,
//! native recursive watch support, and the shell invocation convention.
//!
//! The process-wide profile is computed once by [`profile()`]. Components
//! accept a `&PlatformProfile` so tests can evaluate the Windows rules on a
//! POSIX host (and vice versa) without touching the singleton.

use serde::Serialize;
use std::fmt;
use std::sync::OnceLock;

/// Operating system family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OsFamily {
    /// Linux, macOS, BSDs.
    PosixLike,
    /// Windows.
    WindowsLike,
}

impl fmt::Display for OsFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PosixLike => write!(f, "posix"),
            Self::WindowsLike => write!(f, "windows"),
        }
    }
}

/// How file permissions are expressed on the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionModel {
    /// Numeric POSIX mode bits (`0o7777`).
    ModeBits,
    /// Windows file attributes plus ACL entries.
    AclAttributes,
}

/// Which shell dialect commands are handed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ShellKind {
    /// `sh -c`.
    Posix,
    /// `cmd /C`.
    Cmd,
    /// `powershell -Command`.
    PowerShell,
}

/// Shell invocation convention: program plus the flag preceding the script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ShellConvention {
    /// Shell dialect.
    pub kind: ShellKind,
    /// Program to spawn.
    pub program: &'static str,
    /// Arguments placed before the command string.
    pub args: &'static [&'static str],
}

impl ShellConvention {
    /// `sh -c <command>`.
    pub const POSIX: Self = Self {
        kind: ShellKind::Posix,
        program: "sh",
        args: &["-c"],
    };

    /// `cmd /C <command>`.
    pub const CMD: Self = Self {
        kind: ShellKind::Cmd,
        program: "cmd",
        args: &["/C"],
    };

    /// `powershell -NoProfile -NonInteractive -Command <command>`.
    pub const POWERSHELL: Self = Self {
        kind: ShellKind::PowerShell,
        program: "powershell",
        args: &["-NoProfile", "-NonInteractive", "-Command"],
    };
}

/// Maximum path length on Linux (`PATH_MAX`).
pub const LINUX_MAX_PATH: usize = 4096;
/// Maximum path length on macOS (`PATH_MAX`).
pub const MACOS_MAX_PATH: usize = 1024;
/// Classic Windows `MAX_PATH`.
pub const WINDOWS_MAX_PATH: usize = 260;

/// Immutable platform facts consulted by every Bastion component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlatformProfile {
    /// OS family.
    pub family: OsFamily,
    /// Primary path separator.
    pub path_separator: char,
    /// Longest path (in bytes) accepted by the guard.
    pub max_path_length: usize,
    /// Whether a single registration can watch a whole subtree.
    pub supports_native_recursive_watch: bool,
    /// Permission model used by the permission adapter.
    pub permission_model: PermissionModel,
    /// How commands are handed to a shell.
    pub shell: ShellConvention,
}

impl PlatformProfile {
    /// Linux: inotify has no recursive registration.
    #[must_use]
    pub fn linux() -> Self {
        Self {
            family: OsFamily::PosixLike,
            path_separator: '/',
            max_path_length: LINUX_MAX_PATH,
            supports_native_recursive_watch: false,
            permission_model: PermissionModel::ModeBits,
            shell: ShellConvention::POSIX,
        }
    }

    /// macOS: `FSEvents` watches subtrees natively.
    #[must_use]
    pub fn macos() -> Self {
        Self {
            max_path_length: MACOS_MAX_PATH,
            supports_native_recursive_watch: true,
            ..Self::linux()
        }
    }

    /// Windows with `cmd` as the shell.
    #[must_use]
    pub fn windows() -> Self {
        Self {
            family: OsFamily::WindowsLike,
            path_separator: '\\',
            max_path_length: WINDOWS_MAX_PATH,
            supports_native_recursive_watch: true,
            permission_model: PermissionModel::AclAttributes,
            shell: ShellConvention::CMD,
        }
    }

    /// Windows with PowerShell as the shell (enables the elevated-shell rules).
    #[must_use]
    pub fn windows_powershell() -> Self {
        Self {
            shell: ShellConvention::POWERSHELL,
            ..Self::windows()
        }
    }

    /// Detect the profile for the running process.
    #[must_use]
    pub fn detect() -> Self {
        if cfg!(windows) {
            Self::windows()
        } else if cfg!(target_os = "macos") {
            Self::macos()
        } else {
            Self::linux()
        }
    }

    /// Whether path comparison ignores ASCII case.
    #[must_use]
    pub fn case_insensitive_paths(&self) -> bool {
        matches!(self.family, OsFamily::WindowsLike)
    }

    /// Whether this is a Windows-like profile.
    #[must_use]
    pub fn is_windows(&self) -> bool {
        matches!(self.family, OsFamily::WindowsLike)
    }
}

static PROFILE: OnceLock<PlatformProfile> = OnceLock::new();

/// The process-wide platform profile.
///
/// Computed on first call; every later call returns the same value.
pub fn profile() -> &'static PlatformProfile {
    PROFILE.get_or_init(PlatformProfile::detect)
}
