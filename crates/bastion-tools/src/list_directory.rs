//! List directory tool.

use serde::Serialize;
use serde_json::{Value, json};

use crate::args::{optional_str, optional_usize, resolve_options};
use crate::error::{ToolError, ToolResult};
use crate::{BuiltinTool, ToolContext};

/// Default maximum entries returned.
const DEFAULT_MAX_ENTRIES: usize = 1000;

#[derive(Debug, Serialize)]
struct Entry {
    name: String,
    kind: &'static str,
    size: u64,
}

/// Lists a directory inside the confinement root.
pub struct ListDirectoryTool;

#[async_trait::async_trait]
impl BuiltinTool for ListDirectoryTool {
    fn name(&self) -> &'static str {
        "list_directory"
    }

    fn description(&self) -> &'static str {
        "Lists the entries of a directory inside the confinement root, sorted by name. \
         Symlinks are reported as symlinks and not followed."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": { "type": "string", "description": "Directory to list (default: the root)" },
                "root": { "type": "string", "description": "Explicit confinement root" },
                "max_entries": { "type": "integer", "description": "Maximum entries to return" }
            }
        })
    }

    async fn run(&self, args: Value, ctx: &ToolContext) -> ToolResult<Value> {
        let path = optional_str(&args, "path")?.unwrap_or(".");
        let max_entries = optional_usize(&args, "max_entries")?.unwrap_or(DEFAULT_MAX_ENTRIES);
        let resolved = ctx.guard.resolve_existing(path, &resolve_options(&args)?)?;
        let dir = resolved.absolute_path();
        if !dir.is_dir() {
            return Err(ToolError::InvalidArguments(format!(
                "{} is not a directory",
                dir.display()
            )));
        }

        let mut entries = Vec::new();
        let mut reader = tokio::fs::read_dir(dir).await?;
        while let Some(item) = reader.next_entry().await? {
            let file_type = item.file_type().await?;
            let kind = if file_type.is_symlink() {
                "symlink"
            } else if file_type.is_dir() {
                "directory"
            } else if file_type.is_file() {
                "file"
            } else {
                "other"
            };
            let size = if file_type.is_file() {
                item.metadata().await.map(|m| m.len()).unwrap_or(0)
            } else {
                0
            };
            entries.push(Entry {
                name: item.file_name().to_string_lossy().into_owned(),
                kind,
                size,
            });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));

        let total = entries.len();
        entries.truncate(max_entries);

        Ok(json!({
            "path": dir,
            "entries": entries,
            "total": total,
            "truncated": total > max_entries,
        }))
    }
}
