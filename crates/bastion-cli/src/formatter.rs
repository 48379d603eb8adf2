//! Outcome rendering and exit codes.

use std::process::ExitCode;

use anyhow::Result;
use bastion_core::ToolOutcome;
use serde_json::Value;

use crate::theme::Theme;

/// How results are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub(crate) enum OutputFormat {
    /// Colored summary.
    Pretty,
    /// The raw JSON outcome.
    Json,
}

/// Text destined for stdout and stderr.
#[derive(Debug, Default)]
pub(crate) struct Rendered {
    pub(crate) stdout: String,
    pub(crate) stderr: String,
}

/// Render an outcome without printing it.
pub(crate) fn render(outcome: &ToolOutcome, format: OutputFormat) -> Result<Rendered> {
    if format == OutputFormat::Json {
        return Ok(Rendered {
            stdout: serde_json::to_string_pretty(outcome)?,
            stderr: String::new(),
        });
    }

    let mut rendered = Rendered::default();
    match outcome {
        ToolOutcome::Ok { output } => {
            if let (Some(stdout), Some(stderr)) = (
                output.get("stdout").and_then(Value::as_str),
                output.get("stderr").and_then(Value::as_str),
            ) {
                // Command output passes through untouched.
                stdout.clone_into(&mut rendered.stdout);
                rendered.stderr.push_str(stderr);
                let exit = output.get("exit_code").and_then(Value::as_i64).unwrap_or(-1);
                rendered
                    .stderr
                    .push_str(&Theme::dimmed(&format!("[exit {exit}]")));
            } else {
                rendered.stdout = serde_json::to_string_pretty(output)?;
            }
        },
        ToolOutcome::NeedConfirm {
            reason,
            matched_rule,
        } => {
            let rule = matched_rule.as_deref().unwrap_or("unnamed rule");
            rendered.stderr = format!(
                "{}\n{}",
                Theme::warning(&format!("Confirmation required ({rule}): {reason}")),
                Theme::info("Re-run with --confirm to proceed."),
            );
        },
        ToolOutcome::Error { kind, message } => {
            rendered.stderr = Theme::error(&format!("{kind}: {message}"));
        },
    }
    Ok(rendered)
}

/// Print an outcome.
pub(crate) fn print_outcome(outcome: &ToolOutcome, format: OutputFormat) -> Result<()> {
    let rendered = render(outcome, format)?;
    if !rendered.stdout.is_empty() {
        println!("{}", rendered.stdout.trim_end_matches('\n'));
    }
    if !rendered.stderr.is_empty() {
        eprintln!("{}", rendered.stderr.trim_end_matches('\n'));
    }
    Ok(())
}

/// Process exit code for an outcome: 0 ok, 2 confirmation required, 1 error.
pub(crate) fn exit_code(outcome: &ToolOutcome) -> ExitCode {
    u8::try_from(outcome.exit_code()).map_or(ExitCode::FAILURE, ExitCode::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bastion_core::ErrorKind;
    use serde_json::json;

    fn plain() {
        colored::control::set_override(false);
    }

    #[test]
    fn test_json_format_is_the_outcome() {
        let outcome = ToolOutcome::need_confirm("recursive delete", Some("recursive-delete".into()));
        let rendered = render(&outcome, OutputFormat::Json).unwrap();
        let parsed: Value = serde_json::from_str(&rendered.stdout).unwrap();
        assert_eq!(parsed["status"], "need_confirm");
        assert_eq!(parsed["matched_rule"], "recursive-delete");
    }

    #[test]
    fn test_pretty_exec_passes_output_through() {
        plain();
        let outcome = ToolOutcome::ok(json!({"stdout": "hi\n", "stderr": "", "exit_code": 0}));
        let rendered = render(&outcome, OutputFormat::Pretty).unwrap();
        assert_eq!(rendered.stdout, "hi\n");
        assert!(rendered.stderr.contains("[exit 0]"));
    }

    #[test]
    fn test_pretty_confirmation_and_error() {
        plain();
        let outcome = ToolOutcome::need_confirm("recursive delete", Some("recursive-delete".into()));
        let rendered = render(&outcome, OutputFormat::Pretty).unwrap();
        assert!(rendered.stdout.is_empty());
        assert!(rendered.stderr.contains("recursive-delete"));
        assert!(rendered.stderr.contains("--confirm"));

        let outcome = ToolOutcome::error(ErrorKind::PathDenied, "outside root");
        let rendered = render(&outcome, OutputFormat::Pretty).unwrap();
        assert!(rendered.stderr.contains("outside root"));
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(exit_code(&ToolOutcome::text("ok")), ExitCode::SUCCESS);
        assert_eq!(
            exit_code(&ToolOutcome::need_confirm("r", None)),
            ExitCode::from(2)
        );
        assert_eq!(
            exit_code(&ToolOutcome::error(ErrorKind::Io, "x")),
            ExitCode::FAILURE
        );
    }
}
