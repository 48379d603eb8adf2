//! Change events delivered to the caller.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// Kind of change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    /// Path appeared.
    Create,
    /// Path content or metadata changed.
    Modify,
    /// Path disappeared.
    Delete,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => write!(f, "create"),
            Self::Modify => write!(f, "modify"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

/// A debounced change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeEvent {
    /// Kind of change.
    pub kind: ChangeKind,
    /// Affected path.
    pub path: PathBuf,
    /// When the change was flushed.
    pub timestamp: DateTime<Utc>,
}

impl ChangeEvent {
    /// Create an event stamped now.
    #[must_use]
    pub fn now(kind: ChangeKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
            timestamp: Utc::now(),
        }
    }
}
