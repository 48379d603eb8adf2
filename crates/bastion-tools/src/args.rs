//! Argument extraction helpers shared by the tools.

use bastion_workspace::ResolveOptions;
use serde_json::Value;

use crate::error::{ToolError, ToolResult};

/// Required string argument.
pub(crate) fn required_str<'a>(args: &'a Value, key: &str) -> ToolResult<&'a str> {
    args.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| ToolError::InvalidArguments(format!("{key} is required")))
}

/// Optional string argument; present but not a string is an error.
pub(crate) fn optional_str<'a>(args: &'a Value, key: &str) -> ToolResult<Option<&'a str>> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(_) => Err(ToolError::InvalidArguments(format!("{key} must be a string"))),
    }
}

/// Optional boolean argument.
pub(crate) fn optional_bool(args: &Value, key: &str) -> ToolResult<Option<bool>> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(_) => Err(ToolError::InvalidArguments(format!("{key} must be a boolean"))),
    }
}

/// Optional non-negative integer argument.
pub(crate) fn optional_u64(args: &Value, key: &str) -> ToolResult<Option<u64>> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v.as_u64().map(Some).ok_or_else(|| {
            ToolError::InvalidArguments(format!("{key} must be a non-negative integer"))
        }),
    }
}

/// Optional integer argument converted to `usize`.
pub(crate) fn optional_usize(args: &Value, key: &str) -> ToolResult<Option<usize>> {
    optional_u64(args, key)?
        .map(|v| {
            usize::try_from(v)
                .map_err(|_| ToolError::InvalidArguments(format!("{key} is too large")))
        })
        .transpose()
}

/// Resolution options from the common `root` argument.
pub(crate) fn resolve_options(args: &Value) -> ToolResult<ResolveOptions> {
    Ok(optional_str(args, "root")?
        .map(ResolveOptions::with_root)
        .unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_required_and_optional() {
        let args = json!({"command": "ls", "confirm": true, "timeout_ms": 5, "root": null});
        assert_eq!(required_str(&args, "command").unwrap(), "ls");
        assert!(required_str(&args, "missing").is_err());
        assert_eq!(optional_bool(&args, "confirm").unwrap(), Some(true));
        assert_eq!(optional_u64(&args, "timeout_ms").unwrap(), Some(5));
        assert_eq!(optional_str(&args, "root").unwrap(), None);
    }

    #[test]
    fn test_wrong_types_rejected() {
        let args = json!({"confirm": "yes", "timeout_ms": -1, "root": 3});
        assert!(optional_bool(&args, "confirm").is_err());
        assert!(optional_u64(&args, "timeout_ms").is_err());
        assert!(optional_str(&args, "root").is_err());
    }

    #[test]
    fn test_resolve_options_root() {
        let opts = resolve_options(&json!({"root": "/srv/project"})).unwrap();
        assert_eq!(opts.working_root.as_deref(), Some(std::path::Path::new("/srv/project")));
        assert!(resolve_options(&json!({})).unwrap().working_root.is_none());
    }
}
