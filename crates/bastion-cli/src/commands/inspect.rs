//! Policy queries that do not touch the filesystem beyond resolution.

use bastion_core::{ErrorKind, ToolOutcome};
use bastion_tools::ToolContext;
use bastion_workspace::ResolveOptions;
use serde::Serialize;

/// Resolve a path through the guard.
pub(crate) fn resolve(ctx: &ToolContext, path: &str, root: Option<&str>) -> ToolOutcome {
    let options = root.map(ResolveOptions::with_root).unwrap_or_default();
    match ctx.guard.resolve(path, &options) {
        Ok(resolved) => to_outcome(&resolved),
        Err(e) => ToolOutcome::from_error(&e),
    }
}

/// Classify a command. Classification itself always succeeds.
pub(crate) fn classify(ctx: &ToolContext, command: &str) -> ToolOutcome {
    to_outcome(&ctx.classifier.classify(command))
}

fn to_outcome<T: Serialize>(value: &T) -> ToolOutcome {
    match serde_json::to_value(value) {
        Ok(v) => ToolOutcome::ok(v),
        Err(e) => ToolOutcome::error(ErrorKind::Io, e.to_string()),
    }
}
