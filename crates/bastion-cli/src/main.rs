//! Bastion CLI - Drive the mediation layer from a shell.
//!
//! Every subcommand goes through the same path guard, classifier and
//! confirmation gate an agent would hit, and prints the resulting outcome.
//! Exit codes: 0 ok, 2 confirmation required, 1 error.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use bastion_config::Config;
use bastion_core::PlatformProfile;
use bastion_telemetry::{LogConfig, LogTarget};
use bastion_tools::ToolContext;
use clap::{Parser, Subcommand};
use tracing::debug;

mod commands;
mod formatter;
mod theme;

use commands::{config, inspect, tools};
use formatter::OutputFormat;

/// Bastion - local capability mediation
#[derive(Parser)]
#[command(name = "bastion")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Pretty)]
    format: OutputFormat,

    /// Path to an explicit configuration file
    #[arg(short, long, global = true, env = "BASTION_CONFIG")]
    config: Option<PathBuf>,

    /// Confinement root for this invocation (default: the caller's home)
    #[arg(long, global = true)]
    root: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a path through the path guard
    Resolve {
        /// Path to resolve
        path: String,
    },

    /// Classify a command without running it
    Classify {
        /// Command text
        command: String,
    },

    /// Run a command through the classifier and confirmation gate
    Exec {
        /// Command text
        command: String,
        /// Confirm a command that needs confirmation
        #[arg(long)]
        confirm: bool,
        /// Working directory
        #[arg(long)]
        cwd: Option<String>,
        /// Timeout in milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,
    },

    /// List a directory
    Ls {
        /// Directory (default: the root)
        path: Option<String>,
    },

    /// Inspect or change permissions
    Perms {
        #[command(subcommand)]
        command: PermsCommands,
    },

    /// Watch a directory for a bounded duration
    Watch {
        /// Directory (default: the root)
        path: Option<String>,
        /// How long to watch
        #[arg(long)]
        duration_ms: Option<u64>,
        /// Watch only the top directory
        #[arg(long)]
        no_recursive: bool,
        /// Deepest subdirectory armed
        #[arg(long)]
        max_depth: Option<usize>,
        /// Quiet period before an event is emitted
        #[arg(long)]
        debounce_ms: Option<u64>,
        /// Keep going when a subdirectory cannot be watched
        #[arg(long)]
        resilient: bool,
    },

    /// List the available tools and their input schemas
    Tools,

    /// View configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum PermsCommands {
    /// Show permissions of a path
    Get {
        /// Path to inspect
        path: String,
    },
    /// Change permissions of a path
    Set {
        /// Target path
        path: String,
        /// Octal mode (POSIX)
        #[arg(long)]
        mode: Option<String>,
        /// Set or clear the readonly attribute (Windows)
        #[arg(long)]
        readonly: Option<bool>,
        /// Set or clear the hidden attribute (Windows)
        #[arg(long)]
        hidden: Option<bool>,
        /// Set or clear the system attribute (Windows)
        #[arg(long)]
        system: Option<bool>,
        /// Apply to the whole subtree
        #[arg(short, long)]
        recursive: bool,
        /// Deepest level modified (the target is 0)
        #[arg(long)]
        max_depth: Option<usize>,
        /// Record failures and continue
        #[arg(long)]
        skip_errors: bool,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show the resolved configuration (TOML, or JSON with field sources)
    Show,
    /// Validate the configuration files
    Validate,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    if let Commands::Config { command } = &cli.command {
        return match command {
            ConfigCommands::Show => config::show_config(cli.config.as_deref(), cli.format),
            ConfigCommands::Validate => config::validate_config(cli.config.as_deref()),
        };
    }

    let resolved = Config::load(cli.config.as_deref()).context("failed to load configuration")?;
    init_logging(&resolved.config, cli.verbose);

    let home = bastion_core::caller_home().context("cannot determine the caller's home")?;
    let ctx = ToolContext::from_config(&resolved.config, home, PlatformProfile::detect())
        .context("failed to build tool context")?;
    let root = cli.root.as_deref();
    debug!(family = ?ctx.profile.family, root, "Tool context ready");

    let outcome = match cli.command {
        Commands::Resolve { path } => inspect::resolve(&ctx, &path, root),
        Commands::Classify { command } => inspect::classify(&ctx, &command),
        Commands::Exec {
            command,
            confirm,
            cwd,
            timeout_ms,
        } => tools::exec(&ctx, &command, confirm, cwd.as_deref(), timeout_ms, root).await,
        Commands::Ls { path } => tools::list(&ctx, path.as_deref(), root).await,
        Commands::Perms { command } => match command {
            PermsCommands::Get { path } => tools::get_permissions(&ctx, &path, root).await,
            PermsCommands::Set {
                path,
                mode,
                readonly,
                hidden,
                system,
                recursive,
                max_depth,
                skip_errors,
            } => {
                let change = tools::PermissionChange {
                    mode,
                    readonly,
                    hidden,
                    system,
                    recursive,
                    max_depth,
                    skip_errors,
                };
                tools::set_permissions(&ctx, &path, &change, root).await
            },
        },
        Commands::Watch {
            path,
            duration_ms,
            no_recursive,
            max_depth,
            debounce_ms,
            resilient,
        } => {
            let watch = tools::WatchArgs {
                duration_ms,
                recursive: !no_recursive,
                max_depth,
                debounce_ms,
                resilient,
            };
            tools::watch(&ctx, path.as_deref(), &watch, root).await
        },
        Commands::Tools => {
            tools::print_definitions(cli.format)?;
            return Ok(ExitCode::SUCCESS);
        },
        // Handled before the context is built.
        Commands::Config { .. } => return Ok(ExitCode::SUCCESS),
    };

    formatter::print_outcome(&outcome, cli.format)?;
    Ok(formatter::exit_code(&outcome))
}

/// Log to stderr so stdout carries only the outcome.
fn init_logging(config: &Config, verbose: bool) {
    let mut log_config = match LogConfig::from_section(&config.logging) {
        Ok(lc) => lc,
        Err(e) => {
            eprintln!("Invalid logging configuration: {e}");
            LogConfig::new("warn")
        },
    };
    if verbose {
        "debug".clone_into(&mut log_config.level);
    }
    let log_config = log_config.with_target(LogTarget::Stderr);
    if let Err(e) = bastion_telemetry::setup_logging(&log_config) {
        eprintln!("Failed to initialize logging: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_exec_with_confirm() {
        let cli = Cli::try_parse_from(["bastion", "--root", "/srv", "exec", "rm -r build", "--confirm"])
            .unwrap();
        assert_eq!(cli.root.as_deref(), Some("/srv"));
        match cli.command {
            Commands::Exec { command, confirm, .. } => {
                assert_eq!(command, "rm -r build");
                assert!(confirm);
            },
            _ => panic!("expected exec"),
        }
    }

    #[test]
    fn test_parse_perms_set() {
        let cli = Cli::try_parse_from([
            "bastion", "perms", "set", "data", "--mode", "0750", "-r", "--max-depth", "3",
        ])
        .unwrap();
        match cli.command {
            Commands::Perms {
                command:
                    PermsCommands::Set {
                        mode,
                        recursive,
                        max_depth,
                        ..
                    },
            } => {
                assert_eq!(mode.as_deref(), Some("0750"));
                assert!(recursive);
                assert_eq!(max_depth, Some(3));
            },
            _ => panic!("expected perms set"),
        }
    }
}
