//! Permission inspection and mutation tools.

use bastion_permissions::{PermissionRequest, SetOptions, WindowsDelta};
use serde_json::{Value, json};
use tracing::info;

use crate::args::{optional_bool, optional_usize, required_str, resolve_options};
use crate::error::{ToolError, ToolResult};
use crate::{BuiltinTool, ToolContext};

/// Deepest `max_depth` a caller may request.
const MAX_DEPTH_LIMIT: usize = 64;

/// Reports the permission state of a confined path.
pub struct GetPermissionsTool;

#[async_trait::async_trait]
impl BuiltinTool for GetPermissionsTool {
    fn name(&self) -> &'static str {
        "get_permissions"
    }

    fn description(&self) -> &'static str {
        "Reports the permissions of a path inside the confinement root: normalized \
         owner access plus POSIX mode/owner or Windows attributes."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": { "type": "string", "description": "Path to inspect" },
                "root": { "type": "string", "description": "Explicit confinement root" }
            },
            "required": ["path"]
        })
    }

    async fn run(&self, args: Value, ctx: &ToolContext) -> ToolResult<Value> {
        let path = required_str(&args, "path")?;
        let resolved = ctx.guard.resolve(path, &resolve_options(&args)?)?;
        let snapshot = ctx.permissions.get(&resolved)?;
        Ok(serde_json::to_value(snapshot)?)
    }
}

/// Changes permissions on a confined path, optionally recursively.
pub struct SetPermissionsTool;

#[async_trait::async_trait]
impl BuiltinTool for SetPermissionsTool {
    fn name(&self) -> &'static str {
        "set_permissions"
    }

    fn description(&self) -> &'static str {
        "Changes permissions of a path inside the confinement root. POSIX takes an octal \
         mode; Windows takes attribute toggles and ACL grants/denies. Symlinks inside \
         a recursive tree are never followed."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": { "type": "string", "description": "Target path" },
                "root": { "type": "string", "description": "Explicit confinement root" },
                "mode": {
                    "type": ["string", "integer"],
                    "description": "Octal mode, e.g. \"0755\" or 644"
                },
                "windows": {
                    "type": "object",
                    "description": "Windows delta: readonly/hidden/system booleans, grant/deny ACL entries",
                    "properties": {
                        "readonly": { "type": "boolean" },
                        "hidden": { "type": "boolean" },
                        "system": { "type": "boolean" },
                        "grant": { "type": "array" },
                        "deny": { "type": "array" }
                    }
                },
                "recursive": { "type": "boolean", "description": "Apply to the whole subtree" },
                "max_depth": { "type": "integer", "description": "Deepest level modified (target is 0)" },
                "skip_errors": { "type": "boolean", "description": "Record failures and continue" }
            },
            "required": ["path"]
        })
    }

    async fn run(&self, args: Value, ctx: &ToolContext) -> ToolResult<Value> {
        let path = required_str(&args, "path")?;
        let request = parse_request(&args)?;
        let max_depth = optional_usize(&args, "max_depth")?
            .unwrap_or(ctx.defaults.permission_max_depth);
        if max_depth > MAX_DEPTH_LIMIT {
            return Err(ToolError::InvalidArguments(format!(
                "max_depth must be at most {MAX_DEPTH_LIMIT}"
            )));
        }
        let options = SetOptions {
            recursive: optional_bool(&args, "recursive")?.unwrap_or(false),
            max_depth,
            skip_errors: optional_bool(&args, "skip_errors")?
                .unwrap_or(ctx.defaults.permission_skip_errors),
        };

        let resolved = ctx.guard.resolve(path, &resolve_options(&args)?)?;
        let adapter = ctx.permissions.clone();
        let target = resolved.clone();
        let report = tokio::task::spawn_blocking(move || adapter.set(&target, &request, &options))
            .await
            .map_err(|e| ToolError::ExecutionFailed(e.to_string()))??;

        info!(
            path = %resolved.absolute_path().display(),
            succeeded = report.succeeded(),
            failed = report.failures().len(),
            truncated = report.truncated,
            "Applied permission change"
        );
        Ok(serde_json::to_value(report)?)
    }
}

/// Build the request from either `mode` or `windows`.
///
/// Integer modes are read by their decimal digits, so `755` means `0o755`.
fn parse_request(args: &Value) -> ToolResult<PermissionRequest> {
    match (args.get("mode"), args.get("windows")) {
        (Some(_), Some(_)) => Err(ToolError::InvalidArguments(
            "give either mode or windows, not both".to_string(),
        )),
        (Some(Value::String(s)), None) => Ok(PermissionRequest::parse_mode(s)?),
        (Some(Value::Number(n)), None) => match n.as_u64() {
            Some(digits) => Ok(PermissionRequest::parse_mode(&digits.to_string())?),
            None => Err(ToolError::InvalidArguments(
                "mode must be a non-negative integer".to_string(),
            )),
        },
        (Some(_), None) => Err(ToolError::InvalidArguments(
            "mode must be a string or integer".to_string(),
        )),
        (None, Some(delta)) => {
            let delta: WindowsDelta = serde_json::from_value(delta.clone())
                .map_err(|e| ToolError::InvalidArguments(format!("invalid windows delta: {e}")))?;
            Ok(PermissionRequest::Windows(delta))
        },
        (None, None) => Err(ToolError::InvalidArguments(
            "mode or windows is required".to_string(),
        )),
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

    #[test]
    fn test_parse_request_forms() {
        assert_eq!(
            parse_request(&json!({"mode": "0640"})).unwrap(),
            PermissionRequest::Mode { mode: 0o640 }
        );
        assert_eq!(
            parse_request(&json!({"mode": 755})).unwrap(),
            PermissionRequest::Mode { mode: 0o755 }
        );
        assert!(matches!(
            parse_request(&json!({"windows": {"readonly": true}})).unwrap(),
            PermissionRequest::Windows(WindowsDelta { readonly: Some(true), .. })
        ));
        assert!(parse_request(&json!({})).is_err());
        assert!(parse_request(&json!({"mode": "0644", "windows": {}})).is_err());
        assert!(parse_request(&json!({"mode": 899})).is_err());
        assert!(parse_request(&json!({"mode": true})).is_err());
    }

    #[tokio::test]
    async fn test_get_reports_kind() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("f.txt"), "x").unwrap();
        let outcome = GetPermissionsTool
            .execute(json!({"path": "f.txt"}), &ctx(&dir))
            .await;
        let out = outcome.output().unwrap();
        assert_eq!(out["kind"], "file");
        assert_eq!(out["size"], 1);
    }

    #[tokio::test]
    async fn test_get_missing() {
        let dir = TempDir::new().unwrap();
        let outcome = GetPermissionsTool
            .execute(json!({"path": "missing"}), &ctx(&dir))
            .await;
        assert_eq!(outcome.error_kind(), Some(ErrorKind::NotFound));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_set_mode_on_file() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let file = dir.path().join("f.txt");
        std::fs::write(&file, "x").unwrap();
        let outcome = SetPermissionsTool
            .execute(json!({"path": "f.txt", "mode": "0600"}), &ctx(&dir))
            .await;
        assert!(outcome.is_ok(), "{outcome:?}");
        let mode = std::fs::metadata(&file).unwrap().permissions().mode() & 0o7777;
        assert_eq!(mode, 0o600);
    }

    #[tokio::test]
    async fn test_windows_delta_unsupported_on_posix_profile() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("f.txt"), "x").unwrap();
        let outcome = SetPermissionsTool
            .execute(
                json!({"path": "f.txt", "windows": {"hidden": true}}),
                &ctx(&dir),
            )
            .await;
        assert_eq!(outcome.error_kind(), Some(ErrorKind::PlatformUnsupported));
    }

    #[tokio::test]
    async fn test_depth_limit_rejected() {
        let dir = TempDir::new().unwrap();
        let outcome = SetPermissionsTool
            .execute(
                json!({"path": ".", "mode": "0755", "recursive": true, "max_depth": 65}),
                &ctx(&dir),
            )
            .await;
        assert_eq!(outcome.error_kind(), Some(ErrorKind::InvalidArgument));
    }

    #[tokio::test]
    async fn test_set_outside_root_denied() {
        let dir = TempDir::new().unwrap();
        let outcome = SetPermissionsTool
            .execute(json!({"path": "/etc", "mode": "0777"}), &ctx(&dir))
            .await;
        assert_eq!(outcome.error_kind(), Some(ErrorKind::PathDenied));
    }
}
