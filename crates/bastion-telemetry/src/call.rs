//! Per-call correlation.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Identifies one tool call for log correlation.
#[derive(Debug, Clone, Serialize)]
pub struct CallContext {
    /// Unique call id.
    pub call_id: Uuid,
    /// Tool being invoked.
    pub tool: String,
    /// When the call started.
    pub started_at: DateTime<Utc>,
}

impl CallContext {
    /// Start a call context for `tool`.
    #[must_use]
    pub fn new(tool: impl Into<String>) -> Self {
        Self {
            call_id: Uuid::new_v4(),
            tool: tool.into(),
            started_at: Utc::now(),
        }
    }

    /// Milliseconds since the call started.
    #[must_use]
    pub fn elapsed_ms(&self) -> i64 {
        #[allow(clippy::arithmetic_side_effects)]
        // started_at is never in the future
        let elapsed = Utc::now() - self.started_at;
        elapsed.num_milliseconds()
    }

    /// A span carrying the call id and tool name.
    #[must_use]
    pub fn span(&self) -> tracing::Span {
        tracing::info_span!("tool_call", call_id = %self.call_id, tool = %self.tool)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_context() {
        let a = CallContext::new("exec_command");
        let b = CallContext::new("exec_command");
        assert_ne!(a.call_id, b.call_id);
        assert_eq!(a.tool, "exec_command");
        assert!(a.elapsed_ms() >= 0);
    }
}
