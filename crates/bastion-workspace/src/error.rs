//! Guard error types.

use bastion_core::{ErrorKind, HasErrorKind};
use thiserror::Error;

/// Errors raised by path resolution. Every variant is a refusal.
#[derive(Debug, Error)]
pub enum GuardError {
    /// Input was empty or whitespace.
    #[error("path is empty")]
    EmptyPath,

    /// Input contained a NUL byte.
    #[error("path contains a NUL byte")]
    NulByte,

    /// The per-call working root was not absolute.
    #[error("working root must be an absolute path: {0}")]
    RelativeRoot(String),

    /// The path resolves outside the confinement root.
    #[error("path '{path}' resolves outside confinement root '{root}'")]
    OutsideRoot {
        /// Resolved path.
        path: String,
        /// Confinement root.
        root: String,
    },

    /// The path is inside the root lexically but its real target is not.
    #[error("path '{path}' resolves through a symlink to '{target}', outside confinement root '{root}'")]
    SymlinkEscape {
        /// Lexical path.
        path: String,
        /// Real target.
        target: String,
        /// Confinement root.
        root: String,
    },

    /// The path exceeds the platform length limit.
    #[error("path is {length} bytes, exceeding the {limit} byte limit")]
    PathTooLong {
        /// Length of the candidate path.
        length: usize,
        /// Platform limit.
        limit: usize,
    },

    /// UNC or explicit long-path forms are not accepted.
    #[error("unsupported path form ({form}): {path}")]
    UnsupportedForm {
        /// Raw input.
        path: String,
        /// Which form was detected.
        form: &'static str,
    },

    /// The target does not exist where existence was required.
    #[error("path not found: {0}")]
    NotFound(String),

    /// The confinement root could not be determined.
    #[error("confinement root unavailable: {0}")]
    RootUnavailable(String),

    /// Symlink resolution failed (loops, permissions).
    #[error("failed to resolve '{path}': {source}")]
    Io {
        /// Path being resolved.
        path: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
}

impl GuardError {
    /// Stable error code for logs and diagnostics.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::EmptyPath => "E_EMPTY_PATH",
            Self::NulByte => "E_NUL_BYTE",
            Self::RelativeRoot(_) => "E_RELATIVE_ROOT",
            Self::OutsideRoot { .. } => "E_OUTSIDE_ROOT",
            Self::SymlinkEscape { .. } => "E_SYMLINK_ESCAPE",
            Self::PathTooLong { .. } => "E_PATH_TOO_LONG",
            Self::UnsupportedForm { .. } => "E_UNSUPPORTED_FORM",
            Self::NotFound(_) => "E_NOT_FOUND",
            Self::RootUnavailable(_) => "E_ROOT_UNAVAILABLE",
            Self::Io { .. } => "E_RESOLVE_IO",
        }
    }
}

impl HasErrorKind for GuardError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::EmptyPath | Self::NulByte | Self::RelativeRoot(_) => ErrorKind::InvalidArgument,
            Self::OutsideRoot { .. }
            | Self::SymlinkEscape { .. }
            | Self::PathTooLong { .. }
            | Self::UnsupportedForm { .. }
            | Self::Io { .. } => ErrorKind::PathDenied,
            Self::NotFound(_) | Self::RootUnavailable(_) => ErrorKind::NotFound,
        }
    }
}

/// Result type for guard operations.
pub type GuardResult<T> = Result<T, GuardError>;
