//! Machine-readable error kinds shared by every Bastion component.
//!
//! Each crate keeps its own `thiserror` enum; [`HasErrorKind`] maps every
//! variant onto one [`ErrorKind`] so a calling tool can branch on the kind
//! instead of parsing messages.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Error classification exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Path failed confinement, escaped via symlink, or used an unsupported form.
    PathDenied,
    /// Target does not exist where existence was required.
    NotFound,
    /// Malformed request shape.
    InvalidArgument,
    /// Deny-tier command classification.
    DangerousCommand,
    /// Warn-tier command awaiting confirmation.
    NeedsConfirmation,
    /// Recursion depth exceeded.
    LimitReached,
    /// No mapping for the request on the active platform.
    PlatformUnsupported,
    /// Operating system failure outside the policy layer.
    Io,
}

impl ErrorKind {
    /// Stable snake-case identifier.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PathDenied => "path_denied",
            Self::NotFound => "not_found",
            Self::InvalidArgument => "invalid_argument",
            Self::DangerousCommand => "dangerous_command",
            Self::NeedsConfirmation => "needs_confirmation",
            Self::LimitReached => "limit_reached",
            Self::PlatformUnsupported => "platform_unsupported",
            Self::Io => "io",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Implemented by every Bastion error enum.
pub trait HasErrorKind {
    /// The machine-readable kind of this error.
    fn kind(&self) -> ErrorKind;
}

/// Map an I/O error onto a kind (`NotFound` stays distinguishable).
#[must_use]
pub fn io_error_kind(err: &std::io::Error) -> ErrorKind {
    match err.kind() {
        std::io::ErrorKind::NotFound => ErrorKind::NotFound,
        std::io::ErrorKind::InvalidInput => ErrorKind::InvalidArgument,
        _ => ErrorKind::Io,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorKind::PathDenied).unwrap();
        assert_eq!(json, "\"path_denied\"");

        let parsed: ErrorKind = serde_json::from_str("\"limit_reached\"").unwrap();
        assert_eq!(parsed, ErrorKind::LimitReached);
    }

    #[test]
    fn test_display_matches_serde() {
        for kind in [
            ErrorKind::PathDenied,
            ErrorKind::NotFound,
            ErrorKind::InvalidArgument,
            ErrorKind::DangerousCommand,
            ErrorKind::NeedsConfirmation,
            ErrorKind::LimitReached,
            ErrorKind::PlatformUnsupported,
            ErrorKind::Io,
        ] {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json.trim_matches('"'), kind.to_string());
        }
    }

    #[test]
    fn test_io_error_kind() {
        let nf = std::io::Error::from(std::io::ErrorKind::NotFound);
        assert_eq!(io_error_kind(&nf), ErrorKind::NotFound);

        let denied = std::io::Error::from(std::io::ErrorKind::PermissionDenied);
        assert_eq!(io_error_kind(&denied), ErrorKind::Io);
    }
}
