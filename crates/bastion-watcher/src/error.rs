//! Watcher error types.

use bastion_core::error::io_error_kind;
use bastion_core::{ErrorKind, HasErrorKind};
use std::path::PathBuf;

/// Errors raised while starting or running a watch session.
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    /// The watch root does not exist.
    #[error("watch root not found: {0}")]
    NotFound(PathBuf),

    /// The watch root is not a directory.
    #[error("watch root is not a directory: {0}")]
    NotADirectory(PathBuf),

    /// An option is out of range.
    #[error("invalid watch option: {0}")]
    InvalidOption(String),

    /// The notification backend could not be created.
    #[error("filesystem watcher: {0}")]
    Backend(String),

    /// A handle could not be registered and the session is not resilient.
    #[error("failed to watch '{path}': {message}")]
    Registration {
        /// Directory being registered.
        path: PathBuf,
        /// Backend error.
        message: String,
    },

    /// Walking the tree during startup failed.
    #[error("failed to scan '{path}': {source}")]
    Walk {
        /// Directory being scanned.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// No async runtime to host the consumer task.
    #[error("watch sessions must be started inside a Tokio runtime")]
    NoRuntime,
}

impl HasErrorKind for WatchError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::NotADirectory(_) | Self::InvalidOption(_) => ErrorKind::InvalidArgument,
            Self::Backend(_) | Self::Registration { .. } | Self::NoRuntime => ErrorKind::Io,
            Self::Walk { source, .. } => io_error_kind(source),
        }
    }
}

/// Result type for watcher operations.
pub type WatchResult<T> = Result<T, WatchError>;
