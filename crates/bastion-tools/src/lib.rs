#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
//! Mediated tool front-ends for Bastion.
//!
//! Every tool takes JSON arguments and returns a [`ToolOutcome`]: `ok` with a
//! JSON payload, `need_confirm` when a risky command awaits confirmation, or
//! `error` with a stable [`ErrorKind`](bastion_core::ErrorKind). Paths go
//! through the [`PathGuard`](bastion_workspace::PathGuard) before any
//! filesystem access; commands go through the classifier and the
//! confirmation gate before any process is spawned.

pub mod prelude;

mod args;
pub mod context;
pub mod error;
mod exec_command;
mod list_directory;
mod permissions;
mod read_file;
mod watch_directory;
mod write_file;

pub use context::{ToolContext, ToolDefaults};
pub use error::{ToolError, ToolResult};
pub use exec_command::ExecCommandTool;
pub use list_directory::ListDirectoryTool;
pub use permissions::{GetPermissionsTool, SetPermissionsTool};
pub use read_file::ReadFileTool;
pub use watch_directory::WatchDirectoryTool;
pub use write_file::WriteFileTool;

use std::collections::HashMap;

use bastion_core::ToolOutcome;
use bastion_telemetry::CallContext;
use serde::Serialize;
use serde_json::Value;
use tracing::{Instrument, info, warn};

/// Maximum output size in characters before truncation.
const MAX_OUTPUT_CHARS: usize = 30_000;

/// A built-in tool that executes in-process.
#[async_trait::async_trait]
pub trait BuiltinTool: Send + Sync {
    /// Tool name.
    fn name(&self) -> &'static str;

    /// Human-readable description.
    fn description(&self) -> &'static str;

    /// JSON schema for tool input parameters.
    fn input_schema(&self) -> Value;

    /// Run the tool, returning its JSON payload.
    ///
    /// # Errors
    ///
    /// Returns a [`ToolError`] for invalid arguments, policy refusals and
    /// failed operations.
    async fn run(&self, args: Value, ctx: &ToolContext) -> ToolResult<Value>;

    /// Run the tool and fold the result into a wire outcome.
    async fn execute(&self, args: Value, ctx: &ToolContext) -> ToolOutcome {
        match self.run(args, ctx).await {
            Ok(output) => ToolOutcome::ok(output),
            Err(e) => e.into_outcome(),
        }
    }
}

/// Name, description and input schema of a registered tool.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    /// Tool name.
    pub name: &'static str,
    /// Description.
    pub description: &'static str,
    /// JSON schema for the arguments.
    pub input_schema: Value,
}

/// Registry of built-in tools.
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn BuiltinTool>>,
}

impl ToolRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Create a registry with all default tools registered.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(ExecCommandTool));
        registry.register(Box::new(ReadFileTool));
        registry.register(Box::new(WriteFileTool));
        registry.register(Box::new(ListDirectoryTool));
        registry.register(Box::new(GetPermissionsTool));
        registry.register(Box::new(SetPermissionsTool));
        registry.register(Box::new(WatchDirectoryTool));
        registry
    }

    /// Register a tool.
    pub fn register(&mut self, tool: Box<dyn BuiltinTool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    /// Get a tool by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&dyn BuiltinTool> {
        self.tools.get(name).map(AsRef::as_ref)
    }

    /// Registered tool names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Definitions of all tools, sorted by name.
    #[must_use]
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut defs: Vec<ToolDefinition> = self
            .tools
            .values()
            .map(|t| ToolDefinition {
                name: t.name(),
                description: t.description(),
                input_schema: t.input_schema(),
            })
            .collect();
        defs.sort_by_key(|d| d.name);
        defs
    }

    /// Execute a tool by name inside a `tool_call` span.
    pub async fn execute(&self, name: &str, args: Value, ctx: &ToolContext) -> ToolOutcome {
        let Some(tool) = self.get(name) else {
            warn!(tool = name, "Unknown tool requested");
            return ToolError::UnknownTool(name.to_string()).into_outcome();
        };

        let call = CallContext::new(name);
        let span = call.span();
        async {
            let outcome = tool.execute(args, ctx).await;
            match &outcome {
                ToolOutcome::Ok { .. } => {
                    info!(elapsed_ms = call.elapsed_ms(), "Tool call succeeded");
                },
                ToolOutcome::NeedConfirm { matched_rule, .. } => {
                    info!(
                        rule = matched_rule.as_deref().unwrap_or("-"),
                        "Tool call awaiting confirmation"
                    );
                },
                ToolOutcome::Error { kind, message } => {
                    warn!(kind = %kind, error = %message, "Tool call failed");
                },
            }
            outcome
        }
        .instrument(span)
        .await
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Truncate command output.
///
/// If `output` exceeds [`MAX_OUTPUT_CHARS`] bytes it is cut at a character
/// boundary and a notice is appended.
#[must_use]
pub fn truncate_output(output: String) -> String {
    if output.len() <= MAX_OUTPUT_CHARS {
        return output;
    }
    let mut end = MAX_OUTPUT_CHARS;
    while end > 0 && !output.is_char_boundary(end) {
        end = end.saturating_sub(1);
    }
    let mut truncated = output[..end].to_string();
    truncated.push_str("\n\n... (output truncated: exceeded 30000 character limit)");
    truncated
}
