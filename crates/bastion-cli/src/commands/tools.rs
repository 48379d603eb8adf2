//! Subcommands backed by the tool registry.

use anyhow::Result;
use bastion_core::ToolOutcome;
use bastion_tools::{ToolContext, ToolRegistry};
use serde_json::{Map, Value, json};

use crate::formatter::OutputFormat;
use crate::theme::Theme;

/// Flags of `bastion perms set`.
#[derive(Debug, Default)]
pub(crate) struct PermissionChange {
    pub(crate) mode: Option<String>,
    pub(crate) readonly: Option<bool>,
    pub(crate) hidden: Option<bool>,
    pub(crate) system: Option<bool>,
    pub(crate) recursive: bool,
    pub(crate) max_depth: Option<usize>,
    pub(crate) skip_errors: bool,
}

/// Flags of `bastion watch`.
#[derive(Debug)]
pub(crate) struct WatchArgs {
    pub(crate) duration_ms: Option<u64>,
    pub(crate) recursive: bool,
    pub(crate) max_depth: Option<usize>,
    pub(crate) debounce_ms: Option<u64>,
    pub(crate) resilient: bool,
}

async fn run(ctx: &ToolContext, tool: &str, mut args: Map<String, Value>, root: Option<&str>) -> ToolOutcome {
    if let Some(root) = root {
        args.insert("root".to_string(), json!(root));
    }
    ToolRegistry::with_defaults()
        .execute(tool, Value::Object(args), ctx)
        .await
}

/// Insert `key` only when the value is present.
fn put<T: Into<Value>>(args: &mut Map<String, Value>, key: &str, value: Option<T>) {
    if let Some(v) = value {
        args.insert(key.to_string(), v.into());
    }
}

pub(crate) async fn exec(
    ctx: &ToolContext,
    command: &str,
    confirm: bool,
    cwd: Option<&str>,
    timeout_ms: Option<u64>,
    root: Option<&str>,
) -> ToolOutcome {
    let mut args = Map::new();
    args.insert("command".to_string(), json!(command));
    args.insert("confirm".to_string(), json!(confirm));
    put(&mut args, "cwd", cwd);
    put(&mut args, "timeout_ms", timeout_ms);
    run(ctx, "exec_command", args, root).await
}

pub(crate) async fn list(ctx: &ToolContext, path: Option<&str>, root: Option<&str>) -> ToolOutcome {
    let mut args = Map::new();
    put(&mut args, "path", path);
    run(ctx, "list_directory", args, root).await
}

pub(crate) async fn get_permissions(ctx: &ToolContext, path: &str, root: Option<&str>) -> ToolOutcome {
    let mut args = Map::new();
    args.insert("path".to_string(), json!(path));
    run(ctx, "get_permissions", args, root).await
}

pub(crate) async fn set_permissions(
    ctx: &ToolContext,
    path: &str,
    change: &PermissionChange,
    root: Option<&str>,
) -> ToolOutcome {
    run(ctx, "set_permissions", permission_args(path, change), root).await
}

fn permission_args(path: &str, change: &PermissionChange) -> Map<String, Value> {
    let mut args = Map::new();
    args.insert("path".to_string(), json!(path));
    put(&mut args, "mode", change.mode.clone());

    let mut windows = Map::new();
    put(&mut windows, "readonly", change.readonly);
    put(&mut windows, "hidden", change.hidden);
    put(&mut windows, "system", change.system);
    if !windows.is_empty() {
        args.insert("windows".to_string(), Value::Object(windows));
    }

    args.insert("recursive".to_string(), json!(change.recursive));
    args.insert("skip_errors".to_string(), json!(change.skip_errors));
    put(&mut args, "max_depth", change.max_depth);
    args
}

pub(crate) async fn watch(
    ctx: &ToolContext,
    path: Option<&str>,
    watch: &WatchArgs,
    root: Option<&str>,
) -> ToolOutcome {
    let mut args = Map::new();
    put(&mut args, "path", path);
    put(&mut args, "duration_ms", watch.duration_ms);
    put(&mut args, "max_depth", watch.max_depth);
    put(&mut args, "debounce_ms", watch.debounce_ms);
    args.insert("recursive".to_string(), json!(watch.recursive));
    args.insert("resilient".to_string(), json!(watch.resilient));
    run(ctx, "watch_directory", args, root).await
}

/// Print every registered tool.
pub(crate) fn print_definitions(format: OutputFormat) -> Result<()> {
    let definitions = ToolRegistry::with_defaults().definitions();
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&definitions)?),
        OutputFormat::Pretty => {
            for def in &definitions {
                println!("{}", Theme::header(def.name));
                println!("  {}", def.description);
                if let Some(props) = def.input_schema["properties"].as_object() {
                    let names: Vec<&str> = props.keys().map(String::as_str).collect();
                    println!("  {}", Theme::dimmed(&format!("args: {}", names.join(", "))));
                }
            }
        },
    }
    Ok(())
}
