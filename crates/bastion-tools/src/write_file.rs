//! Write file tool.

use serde_json::{Value, json};
use tokio::io::AsyncWriteExt;
use tracing::info;

use crate::args::{optional_bool, required_str, resolve_options};
use crate::error::{ToolError, ToolResult};
use crate::{BuiltinTool, ToolContext};

/// Creates or overwrites a file inside the confinement root.
pub struct WriteFileTool;

#[async_trait::async_trait]
impl BuiltinTool for WriteFileTool {
    fn name(&self) -> &'static str {
        "write_file"
    }

    fn description(&self) -> &'static str {
        "Writes text to a file inside the confinement root, replacing it or appending. \
         Missing parent directories are created only with create_dirs=true."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": { "type": "string", "description": "File to write" },
                "content": { "type": "string", "description": "Text to write" },
                "root": { "type": "string", "description": "Explicit confinement root" },
                "append": { "type": "boolean", "description": "Append instead of replacing" },
                "create_dirs": { "type": "boolean", "description": "Create missing parent directories" }
            },
            "required": ["path", "content"]
        })
    }

    async fn run(&self, args: Value, ctx: &ToolContext) -> ToolResult<Value> {
        let path = required_str(&args, "path")?;
        let content = required_str(&args, "content")?;
        let append = optional_bool(&args, "append")?.unwrap_or(false);
        let create_dirs = optional_bool(&args, "create_dirs")?.unwrap_or(false);

        let resolved = ctx.guard.resolve(path, &resolve_options(&args)?)?;
        let target = resolved.absolute_path();
        if target.is_dir() {
            return Err(ToolError::InvalidArguments(format!(
                "{} is a directory",
                target.display()
            )));
        }

        if let Some(parent) = target.parent()
            && !parent.exists()
        {
            if !create_dirs {
                return Err(ToolError::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("parent directory does not exist: {}", parent.display()),
                )));
            }
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .append(append)
            .truncate(!append)
            .open(target)
            .await?;
        file.write_all(content.as_bytes()).await?;
        file.flush().await?;

        info!(path = %target.display(), bytes = content.len(), append, "Wrote file");
        Ok(json!({
            "path": target,
            "bytes_written": content.len(),
            "appended": append,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bastion_core::{ErrorKind, PlatformProfile};
    use bastion_workspace::{GuardConfig, PathGuard};
    use tempfile::TempDir;

    fn ctx(dir: &TempDir) -> ToolContext {
        ToolContext::new(PathGuard::with_profile(
            GuardConfig::new(dir.path().canonicalize().unwrap()),
            PlatformProfile::linux(),
        ))
    }

    #[tokio::test]
    async fn test_write_then_append() {
        let dir = TempDir::new().unwrap();
        let ctx = ctx(&dir);
        let outcome = WriteFileTool
            .execute(json!({"path": "out.txt", "content": "one\n"}), &ctx)
            .await;
        assert!(outcome.is_ok(), "{outcome:?}");
        WriteFileTool
            .execute(json!({"path": "out.txt", "content": "two\n", "append": true}), &ctx)
            .await;
        assert_eq!(
            std::fs::read_to_string(dir.path().join("out.txt")).unwrap(),
            "one\ntwo\n"
        );
    }

    #[tokio::test]
    async fn test_missing_parent_needs_create_dirs() {
        let dir = TempDir::new().unwrap();
        let ctx = ctx(&dir);
        let outcome = WriteFileTool
            .execute(json!({"path": "a/b/c.txt", "content": "x"}), &ctx)
            .await;
        assert_eq!(outcome.error_kind(), Some(ErrorKind::NotFound));

        let outcome = WriteFileTool
            .execute(json!({"path": "a/b/c.txt", "content": "x", "create_dirs": true}), &ctx)
            .await;
        assert!(outcome.is_ok(), "{outcome:?}");
        assert!(dir.path().join("a/b/c.txt").exists());
    }

    #[tokio::test]
    async fn test_write_outside_root_denied() {
        let dir = TempDir::new().unwrap();
        let outcome = WriteFileTool
            .execute(json!({"path": "../escape.txt", "content": "x"}), &ctx(&dir))
            .await;
        assert_eq!(outcome.error_kind(), Some(ErrorKind::PathDenied));
        assert!(!dir.path().parent().unwrap().join("escape.txt").exists());
    }
}
