//! Read file tool.

use serde_json::{Value, json};

use crate::args::{optional_usize, required_str, resolve_options};
use crate::error::{ToolError, ToolResult};
use crate::{BuiltinTool, ToolContext};

/// Default maximum bytes returned.
const DEFAULT_MAX_BYTES: usize = 256 * 1024;
/// Bytes inspected for NUL when detecting binary content.
const BINARY_PROBE_BYTES: usize = 8192;

/// Reads a UTF-8 text file inside the confinement root.
pub struct ReadFileTool;

#[async_trait::async_trait]
impl BuiltinTool for ReadFileTool {
    fn name(&self) -> &'static str {
        "read_file"
    }

    fn description(&self) -> &'static str {
        "Reads a text file inside the confinement root. Binary files are refused. \
         Content beyond max_bytes (default 262144) is cut off."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": { "type": "string", "description": "File to read" },
                "root": { "type": "string", "description": "Explicit confinement root" },
                "max_bytes": { "type": "integer", "description": "Maximum bytes to return" }
            },
            "required": ["path"]
        })
    }

    async fn run(&self, args: Value, ctx: &ToolContext) -> ToolResult<Value> {
        let path = required_str(&args, "path")?;
        let max_bytes = optional_usize(&args, "max_bytes")?.unwrap_or(DEFAULT_MAX_BYTES);
        let resolved = ctx.guard.resolve_existing(path, &resolve_options(&args)?)?;

        if resolved.absolute_path().is_dir() {
            return Err(ToolError::InvalidArguments(format!(
                "{} is a directory",
                resolved.absolute_path().display()
            )));
        }

        let raw = tokio::fs::read(resolved.absolute_path()).await?;
        let probe = raw.len().min(BINARY_PROBE_BYTES);
        if raw[..probe].contains(&0) {
            return Err(ToolError::InvalidArguments(format!(
                "{} appears to be a binary file",
                resolved.absolute_path().display()
            )));
        }

        let size = raw.len();
        let content = String::from_utf8(raw).map_err(|_| {
            ToolError::InvalidArguments(format!(
                "{} is not valid UTF-8",
                resolved.absolute_path().display()
            ))
        })?;
        let truncated = content.len() > max_bytes;
        let content = if truncated {
            let mut end = max_bytes;
            while end > 0 && !content.is_char_boundary(end) {
                end = end.saturating_sub(1);
            }
            content[..end].to_string()
        } else {
            content
        };

        Ok(json!({
            "path": resolved.absolute_path(),
            "size": size,
            "content": content,
            "truncated": truncated,
        }))
    }
}
