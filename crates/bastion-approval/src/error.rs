//! Classifier error types.

use bastion_core::{ErrorKind, HasErrorKind};

/// Errors raised while building a classifier or enforcing its verdicts.
///
/// Classification itself never fails; these come from construction
/// (bad configured rules) and from callers turning a gate decision into
/// an error.
#[derive(Debug, thiserror::Error)]
pub enum ClassifierError {
    /// A configured rule pattern failed to compile.
    #[error("invalid pattern for rule '{id}': {source}")]
    InvalidPattern {
        /// Rule identifier.
        id: String,
        /// Regex compilation error.
        #[source]
        source: regex::Error,
    },

    /// A configured rule is missing its identifier.
    #[error("command rule has an empty id")]
    EmptyRuleId,

    /// The command is denied outright.
    #[error("command denied by rule '{rule}': {reason}")]
    Denied {
        /// Matched rule identifier.
        rule: String,
        /// Why the rule exists.
        reason: String,
    },

    /// The command needs an explicit confirmation to run.
    #[error("command requires confirmation (rule '{rule}'): {reason}")]
    ConfirmationRequired {
        /// Matched rule identifier.
        rule: String,
        /// Why the rule exists.
        reason: String,
    },
}

impl HasErrorKind for ClassifierError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidPattern { .. } | Self::EmptyRuleId => ErrorKind::InvalidArgument,
            Self::Denied { .. } => ErrorKind::DangerousCommand,
            Self::ConfirmationRequired { .. } => ErrorKind::NeedsConfirmation,
        }
    }
}

/// Result type for classifier operations.
pub type ClassifierResult<T> = Result<T, ClassifierError>;
