//! Tool error types.

use bastion_approval::ClassifierError;
use bastion_core::error::io_error_kind;
use bastion_core::{ErrorKind, HasErrorKind, ToolOutcome};
use bastion_permissions::PermissionError;
use bastion_watcher::WatchError;
use bastion_workspace::GuardError;

/// Errors raised by tool front-ends.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// Arguments missing or of the wrong shape.
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// No tool with this name is registered.
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// The command did not finish in time and was killed.
    #[error("Timeout after {0}ms")]
    Timeout(u64),

    /// The process or task could not run.
    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    /// Path confinement failed.
    #[error(transparent)]
    Guard(#[from] GuardError),

    /// The command was denied or needs confirmation.
    #[error(transparent)]
    Classifier(#[from] ClassifierError),

    /// Permission inspection or mutation failed.
    #[error(transparent)]
    Permission(#[from] PermissionError),

    /// The watch session failed.
    #[error(transparent)]
    Watch(#[from] WatchError),

    /// Filesystem I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A result could not be encoded.
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl HasErrorKind for ToolError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArguments(_) | Self::UnknownTool(_) => ErrorKind::InvalidArgument,
            Self::Timeout(_) => ErrorKind::LimitReached,
            Self::ExecutionFailed(_) | Self::Serialization(_) => ErrorKind::Io,
            Self::Guard(e) => e.kind(),
            Self::Classifier(e) => e.kind(),
            Self::Permission(e) => e.kind(),
            Self::Watch(e) => e.kind(),
            Self::Io(e) => io_error_kind(e),
        }
    }
}

impl ToolError {
    /// The outcome a caller sees for this error.
    ///
    /// A pending confirmation is not an error on the wire: it becomes a
    /// `need_confirm` outcome carrying the rule that fired.
    #[must_use]
    pub fn into_outcome(self) -> ToolOutcome {
        match self {
            Self::Classifier(ClassifierError::ConfirmationRequired { rule, reason }) => {
                ToolOutcome::need_confirm(reason, (!rule.is_empty()).then_some(rule))
            },
            other => ToolOutcome::from_error(&other),
        }
    }
}

/// Result type for tool execution.
pub type ToolResult<T> = Result<T, ToolError>;
