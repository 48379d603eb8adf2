//! Permission adapter error types.

use bastion_core::error::io_error_kind;
use bastion_core::{ErrorKind, HasErrorKind, PermissionModel};
use bastion_workspace::GuardError;
use std::path::PathBuf;

/// Errors raised by permission inspection and mutation.
#[derive(Debug, thiserror::Error)]
pub enum PermissionError {
    /// The target path failed confinement.
    #[error(transparent)]
    Guard(#[from] GuardError),

    /// Numeric mode outside `0..=0o7777`.
    #[error("invalid mode {0:#o}: must be between 0 and 0o7777")]
    InvalidMode(u32),

    /// Mode string could not be parsed as octal.
    #[error("invalid mode '{0}': expected an octal number such as 755 or 0o644")]
    UnparsableMode(String),

    /// A Windows delta with nothing to change.
    #[error("permission delta is empty")]
    EmptyDelta,

    /// An ACL principal that cannot be passed to the platform safely.
    #[error("invalid ACL principal '{0}'")]
    InvalidPrincipal(String),

    /// The request shape does not exist on this permission model.
    #[error("{request} requests are not supported on {model:?} platforms")]
    Unsupported {
        /// Request shape.
        request: &'static str,
        /// Active permission model.
        model: PermissionModel,
    },

    /// The tree is deeper than the recursion bound.
    #[error("'{path}' is at depth {depth}, beyond max_depth {max_depth}")]
    DepthExceeded {
        /// First entry found beyond the bound.
        path: PathBuf,
        /// Its depth below the target.
        depth: usize,
        /// Configured bound.
        max_depth: usize,
    },

    /// The target is itself a symbolic link.
    #[error("refusing to change permissions through symlink '{0}'")]
    SymlinkTarget(PathBuf),

    /// The target does not exist.
    #[error("path not found: {0}")]
    NotFound(PathBuf),

    /// A sub-operation failed and `skip_errors` was off.
    #[error("{op} failed on '{path}': {source}")]
    OperationFailed {
        /// Entry being modified.
        path: PathBuf,
        /// Sub-operation description.
        op: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Reading metadata or walking the tree failed.
    #[error("failed to read '{path}': {source}")]
    Io {
        /// Path being read.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
}

impl HasErrorKind for PermissionError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::Guard(e) => e.kind(),
            Self::InvalidMode(_)
            | Self::UnparsableMode(_)
            | Self::EmptyDelta
            | Self::InvalidPrincipal(_) => ErrorKind::InvalidArgument,
            Self::Unsupported { .. } => ErrorKind::PlatformUnsupported,
            Self::DepthExceeded { .. } => ErrorKind::LimitReached,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::SymlinkTarget(_) => ErrorKind::PathDenied,
            Self::OperationFailed { source, .. } | Self::Io { source, .. } => io_error_kind(source),
        }
    }
}

/// Result type for permission operations.
pub type PermissionResult<T> = Result<T, PermissionError>;
