//! Configuration struct definitions.
//!
//! Every section uses `#[serde(default)]` so a partial tree deserializes;
//! the defaults here mirror `defaults.toml`.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path guard settings.
    pub guard: GuardSection,
    /// Command execution and classification settings.
    pub commands: CommandsSection,
    /// Permission adapter settings.
    pub permissions: PermissionsSection,
    /// Change watcher settings.
    pub watcher: WatcherSection,
    /// Logging settings.
    pub logging: LoggingSection,
}

/// `[guard]`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardSection {
    /// Default working root. The caller's home is used when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub working_root: Option<PathBuf>,
    /// Check symlink locations instead of their targets.
    pub allow_symlink_escape: bool,
    /// Accept UNC and `\\?\` long-path forms on Windows.
    pub allow_long_path_forms: bool,
}

/// `[commands]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandsSection {
    /// Default execution timeout in milliseconds.
    pub exec_timeout_ms: u64,
    /// Upper bound for a caller-supplied timeout.
    pub max_timeout_ms: u64,
    /// Additional deny-tier rules.
    pub extra_deny: Vec<RuleSection>,
    /// Additional warn-tier rules.
    pub extra_warn: Vec<RuleSection>,
}

impl Default for CommandsSection {
    fn default() -> Self {
        Self {
            exec_timeout_ms: 30_000,
            max_timeout_ms: 600_000,
            extra_deny: Vec::new(),
            extra_warn: Vec::new(),
        }
    }
}

/// One configured classifier rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSection {
    /// Stable rule id.
    pub id: String,
    /// Regular expression matched against each command segment.
    pub pattern: String,
    /// Reason reported when the rule matches.
    #[serde(default)]
    pub reason: String,
}

/// `[permissions]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PermissionsSection {
    /// Depth cap for recursive mutations.
    pub default_max_depth: usize,
    /// Record per-item failures instead of aborting.
    pub skip_errors: bool,
}

impl Default for PermissionsSection {
    fn default() -> Self {
        Self {
            default_max_depth: 16,
            skip_errors: false,
        }
    }
}

/// `[watcher]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatcherSection {
    /// Debounce window in milliseconds.
    pub debounce_ms: u64,
    /// Depth for manual recursive emulation.
    pub max_depth: usize,
    /// Run duration when the caller gives none.
    pub default_duration_ms: u64,
    /// Longest run a caller may request.
    pub max_duration_ms: u64,
    /// Raw and change channel capacity.
    pub channel_capacity: usize,
    /// Keep starting when a directory cannot be watched.
    pub resilient: bool,
}

impl Default for WatcherSection {
    fn default() -> Self {
        Self {
            debounce_ms: 250,
            max_depth: 8,
            default_duration_ms: 5_000,
            max_duration_ms: 600_000,
            channel_capacity: 1024,
            resilient: false,
        }
    }
}

/// `[logging]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Default level (`trace` through `error`).
    pub level: String,
    /// Output format: `pretty`, `compact`, `json` or `full`.
    pub format: String,
    /// Extra `EnvFilter` directives, e.g. `bastion_watcher=debug`.
    pub directives: Vec<String>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: "compact".to_owned(),
            directives: Vec::new(),
        }
    }
}
