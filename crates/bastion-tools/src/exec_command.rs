//! Exec tool: classify, gate, then run through the platform shell.

use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};

use bastion_approval::ConfirmationGate;
use bastion_core::ShellConvention;
use serde_json::{Value, json};
use tokio::process::Command;
use tracing::{debug, info};

use crate::args::{optional_bool, optional_str, optional_u64, required_str, resolve_options};
use crate::error::{ToolError, ToolResult};
use crate::{BuiltinTool, ToolContext, truncate_output};

/// Runs a shell command once it passes the classifier and confirmation gate.
pub struct ExecCommandTool;

#[async_trait::async_trait]
impl BuiltinTool for ExecCommandTool {
    fn name(&self) -> &'static str {
        "exec_command"
    }

    fn description(&self) -> &'static str {
        "Runs a shell command in a confined working directory. Dangerous commands are refused; \
         risky ones return need_confirm and run only when re-sent with confirm=true."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "command": {
                    "type": "string",
                    "description": "Command text handed to the platform shell"
                },
                "cwd": {
                    "type": "string",
                    "description": "Working directory (default: the confinement root)"
                },
                "root": {
                    "type": "string",
                    "description": "Explicit confinement root for this call"
                },
                "confirm": {
                    "type": "boolean",
                    "description": "Confirm a command that previously returned need_confirm"
                },
                "timeout_ms": {
                    "type": "integer",
                    "description": "Timeout in milliseconds"
                }
            },
            "required": ["command"]
        })
    }

    async fn run(&self, args: Value, ctx: &ToolContext) -> ToolResult<Value> {
        let command = required_str(&args, "command")?;
        let confirmed = optional_bool(&args, "confirm")?.unwrap_or(false);
        let timeout_ms = optional_u64(&args, "timeout_ms")?
            .unwrap_or(ctx.defaults.exec_timeout_ms)
            .min(ctx.defaults.max_timeout_ms);

        let verdict = ctx.classifier.classify(command);
        debug!(level = %verdict.level, rule = verdict.matched_rule.as_deref().unwrap_or("-"), "Classified command");
        let authorization = ConfirmationGate::evaluate(&verdict, confirmed).into_result()?;

        let options = resolve_options(&args)?;
        let cwd = ctx
            .guard
            .resolve_existing(optional_str(&args, "cwd")?.unwrap_or("."), &options)?;
        if !cwd.absolute_path().is_dir() {
            return Err(ToolError::InvalidArguments(format!(
                "cwd is not a directory: {}",
                cwd.absolute_path().display()
            )));
        }

        info!(
            command,
            cwd = %cwd.absolute_path().display(),
            level = %authorization.verdict.level,
            rule = authorization.verdict.matched_rule.as_deref().unwrap_or("-"),
            confirmed = authorization.confirmed,
            "Executing authorized command"
        );

        let started = Instant::now();
        let output = tokio::time::timeout(
            Duration::from_millis(timeout_ms),
            run_shell(&ctx.profile.shell, command, cwd.absolute_path()),
        )
        .await
        .map_err(|_| ToolError::Timeout(timeout_ms))?
        .map_err(|e| ToolError::ExecutionFailed(e.to_string()))?;
        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        info!(exit_code = output.exit_code, duration_ms, "Command finished");

        Ok(json!({
            "stdout": truncate_output(output.stdout),
            "stderr": truncate_output(output.stderr),
            "exit_code": output.exit_code,
            "duration_ms": duration_ms,
            "cwd": cwd.absolute_path(),
            "verdict": authorization.verdict,
            "confirmed": authorization.confirmed,
        }))
    }
}

struct ShellOutput {
    stdout: String,
    stderr: String,
    exit_code: i32,
}

/// Spawn `command` through the shell convention. The child is killed if the
/// future is dropped (timeout).
async fn run_shell(shell: &ShellConvention, command: &str, cwd: &Path) -> std::io::Result<ShellOutput> {
    let output = Command::new(shell.program)
        .args(shell.args)
        .arg(command)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await?;

    Ok(ShellOutput {
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        exit_code: output.status.code().unwrap_or(-1),
    })
}
