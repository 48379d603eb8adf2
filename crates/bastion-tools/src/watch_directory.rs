//! Watch directory tool: a bounded watch session that returns its events.

use std::time::Duration;

use bastion_watcher::WatchSession;
use serde_json::{Value, json};
use tracing::info;

use crate::args::{optional_bool, optional_str, optional_u64, optional_usize, resolve_options};
use crate::error::{ToolError, ToolResult};
use crate::{BuiltinTool, ToolContext};

/// Watches a confined directory for a bounded duration.
pub struct WatchDirectoryTool;

#[async_trait::async_trait]
impl BuiltinTool for WatchDirectoryTool {
    fn name(&self) -> &'static str {
        "watch_directory"
    }

    fn description(&self) -> &'static str {
        "Watches a directory inside the confinement root for duration_ms and returns the \
         debounced create/modify/delete events seen, with session statistics."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": { "type": "string", "description": "Directory to watch (default: the root)" },
                "root": { "type": "string", "description": "Explicit confinement root" },
                "duration_ms": { "type": "integer", "description": "How long to watch" },
                "recursive": { "type": "boolean", "description": "Watch subdirectories (default true)" },
                "max_depth": { "type": "integer", "description": "Deepest subdirectory armed" },
                "debounce_ms": { "type": "integer", "description": "Quiet period before an event is emitted" },
                "resilient": { "type": "boolean", "description": "Keep going when a subdirectory cannot be watched" }
            }
        })
    }

    async fn run(&self, args: Value, ctx: &ToolContext) -> ToolResult<Value> {
        let path = optional_str(&args, "path")?.unwrap_or(".");
        let duration_ms = optional_u64(&args, "duration_ms")?
            .unwrap_or(ctx.defaults.watch_duration_ms)
            .min(ctx.defaults.max_watch_duration_ms);
        if duration_ms == 0 {
            return Err(ToolError::InvalidArguments(
                "duration_ms must be positive".to_string(),
            ));
        }

        let mut options = ctx.defaults.watch.clone();
        if let Some(recursive) = optional_bool(&args, "recursive")? {
            options = options.with_recursive(recursive);
        }
        if let Some(depth) = optional_usize(&args, "max_depth")? {
            options = options.with_max_depth(depth);
        }
        if let Some(debounce) = optional_u64(&args, "debounce_ms")? {
            options = options.with_debounce_ms(debounce);
        }
        if optional_bool(&args, "resilient")?.unwrap_or(false) {
            options = options.resilient();
        }

        let resolved = ctx.guard.resolve_existing(path, &resolve_options(&args)?)?;
        let session = WatchSession::start(&resolved, options, &ctx.profile)?;
        let tracked = ctx.watches.track(session.control());
        let id = tracked.id();
        info!(session = %id, root = %resolved.absolute_path().display(), duration_ms, "Watch started");

        let report = session.run_for(Duration::from_millis(duration_ms)).await;
        drop(tracked);

        info!(
            session = %id,
            events = report.events.len(),
            dropped = report.stats.dropped_raw_events,
            "Watch finished"
        );
        Ok(serde_json::to_value(report)?)
    }
}
