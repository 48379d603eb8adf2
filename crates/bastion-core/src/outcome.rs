//! Caller-visible outcome of a mediated tool call.
//!
//! The agent on the other side of the tool boundary decides what to do next
//! from `status` alone: `ok`, `need_confirm` (retry with confirmation), or
//! `error` with a machine-readable `kind`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::error::{ErrorKind, HasErrorKind};

/// Structured result returned to the calling agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ToolOutcome {
    /// The operation completed.
    Ok {
        /// Tool-specific payload.
        output: Value,
    },
    /// A warn-tier command is paused until re-invoked with confirmation.
    NeedConfirm {
        /// Why confirmation is required.
        reason: String,
        /// Identifier of the rule that fired.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        matched_rule: Option<String>,
    },
    /// The operation was refused or failed.
    Error {
        /// Machine-readable error kind.
        kind: ErrorKind,
        /// Human-readable detail.
        message: String,
    },
}

impl ToolOutcome {
    /// Successful outcome with a JSON payload.
    #[must_use]
    pub fn ok(output: Value) -> Self {
        Self::Ok { output }
    }

    /// Successful outcome with a plain text payload.
    #[must_use]
    pub fn text(output: impl Into<String>) -> Self {
        Self::Ok {
            output: Value::String(output.into()),
        }
    }

    /// Confirmation-pending outcome.
    #[must_use]
    pub fn need_confirm(reason: impl Into<String>, matched_rule: Option<String>) -> Self {
        Self::NeedConfirm {
            reason: reason.into(),
            matched_rule,
        }
    }

    /// Error outcome.
    #[must_use]
    pub fn error(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::Error {
            kind,
            message: message.into(),
        }
    }

    /// Error outcome from any Bastion error.
    #[must_use]
    pub fn from_error<E>(err: &E) -> Self
    where
        E: HasErrorKind + fmt::Display,
    {
        Self::error(err.kind(), err.to_string())
    }

    /// Whether the outcome is `ok`.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok { .. })
    }

    /// Whether the outcome awaits confirmation.
    #[must_use]
    pub fn needs_confirmation(&self) -> bool {
        matches!(self, Self::NeedConfirm { .. })
    }

    /// Error kind, if this is an error.
    #[must_use]
    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Error { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Payload, if this is `ok`.
    #[must_use]
    pub fn output(&self) -> Option<&Value> {
        match self {
            Self::Ok { output } => Some(output),
            _ => None,
        }
    }

    /// Process exit code a command-line driver should use.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Ok { .. } => 0,
            Self::Error { .. } => 1,
            Self::NeedConfirm { .. } => 2,
        }
    }
}

impl<T, E> From<Result<T, E>> for ToolOutcome
where
    T: Into<Value>,
    E: HasErrorKind + fmt::Display,
{
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(v) => Self::ok(v.into()),
            Err(e) => Self::from_error(&e),
        }
    }
}
