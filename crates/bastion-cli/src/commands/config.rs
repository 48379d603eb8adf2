//! CLI handlers for the `bastion config` subcommand.

use std::path::Path;
use std::process::ExitCode;

use anyhow::Result;
use bastion_config::{Config, ShowFormat};

use crate::formatter::OutputFormat;
use crate::theme::Theme;

/// Show the resolved configuration.
///
/// Pretty output is TOML with the loaded files as comments; JSON adds the
/// layer that set each field.
pub(crate) fn show_config(explicit: Option<&Path>, format: OutputFormat) -> Result<ExitCode> {
    let resolved = Config::load(explicit)?;
    let show_format = match format {
        OutputFormat::Json => ShowFormat::Json,
        OutputFormat::Pretty => ShowFormat::Toml,
    };
    let output = resolved
        .render(show_format)
        .map_err(|e| anyhow::anyhow!("failed to format config: {e}"))?;
    println!("{output}");
    Ok(ExitCode::SUCCESS)
}

/// Validate the configuration files.
#[allow(clippy::unnecessary_wraps)]
pub(crate) fn validate_config(explicit: Option<&Path>) -> Result<ExitCode> {
    match Config::load(explicit) {
        Ok(resolved) => {
            println!("{}", Theme::success("Configuration is valid."));
            if !resolved.loaded_files.is_empty() {
                println!("\nLoaded files:");
                for path in &resolved.loaded_files {
                    println!("  - {path}");
                }
            }
            Ok(ExitCode::SUCCESS)
        },
        Err(e) => {
            eprintln!("{}", Theme::error(&format!("Configuration error: {e}")));
            Ok(ExitCode::FAILURE)
        },
    }
}
