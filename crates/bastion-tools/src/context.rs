//! Shared state handed to every tool call.

use std::path::PathBuf;
use std::sync::Arc;

use bastion_approval::{CommandClassifier, ExtraRule};
use bastion_config::{Config, RuleSection};
use bastion_core::PlatformProfile;
use bastion_permissions::PermissionAdapter;
use bastion_watcher::{WatchOptions, WatchRegistry};
use bastion_workspace::{GuardConfig, PathGuard};

use crate::error::ToolResult;

/// Limits and defaults the tools apply to caller arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolDefaults {
    /// Command timeout when the caller gives none.
    pub exec_timeout_ms: u64,
    /// Largest command timeout a caller may request.
    pub max_timeout_ms: u64,
    /// Depth cap for recursive permission changes.
    pub permission_max_depth: usize,
    /// Record per-item permission failures instead of aborting.
    pub permission_skip_errors: bool,
    /// Baseline watch options.
    pub watch: WatchOptions,
    /// Watch duration when the caller gives none.
    pub watch_duration_ms: u64,
    /// Longest watch a caller may request.
    pub max_watch_duration_ms: u64,
}

impl Default for ToolDefaults {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl ToolDefaults {
    /// Derive defaults from a loaded configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let w = &config.watcher;
        Self {
            exec_timeout_ms: config.commands.exec_timeout_ms,
            max_timeout_ms: config.commands.max_timeout_ms,
            permission_max_depth: config.permissions.default_max_depth,
            permission_skip_errors: config.permissions.skip_errors,
            watch: WatchOptions {
                recursive: true,
                max_depth: w.max_depth,
                debounce_ms: w.debounce_ms,
                resilient: w.resilient,
                channel_capacity: w.channel_capacity,
            },
            watch_duration_ms: w.default_duration_ms,
            max_watch_duration_ms: w.max_duration_ms,
        }
    }
}

/// Everything a tool needs: the platform, the policy components and the
/// caller-owned watch registry.
#[derive(Debug, Clone)]
pub struct ToolContext {
    /// Platform facts.
    pub profile: PlatformProfile,
    /// Path confinement.
    pub guard: PathGuard,
    /// Command risk classification.
    pub classifier: CommandClassifier,
    /// Permission inspection and mutation.
    pub permissions: PermissionAdapter,
    /// Live watch sessions started through this context.
    pub watches: Arc<WatchRegistry>,
    /// Argument defaults and limits.
    pub defaults: ToolDefaults,
}

impl ToolContext {
    /// Context around a guard, using the guard's profile and built-in rules.
    #[must_use]
    pub fn new(guard: PathGuard) -> Self {
        let profile = guard.profile().clone();
        Self {
            classifier: CommandClassifier::for_profile(&profile),
            permissions: PermissionAdapter::new(profile.clone()),
            watches: Arc::new(WatchRegistry::new()),
            defaults: ToolDefaults::default(),
            profile,
            guard,
        }
    }

    /// Context built from configuration, confined to `home` unless the
    /// config names a working root.
    ///
    /// # Errors
    ///
    /// Returns a classifier error if a configured rule does not compile.
    pub fn from_config(
        config: &Config,
        home: impl Into<PathBuf>,
        profile: PlatformProfile,
    ) -> ToolResult<Self> {
        let mut guard_config = GuardConfig::new(home);
        if let Some(root) = &config.guard.working_root {
            guard_config = guard_config.with_working_root(root);
        }
        if config.guard.allow_symlink_escape {
            guard_config = guard_config.allow_symlink_escape();
        }
        if config.guard.allow_long_path_forms {
            guard_config = guard_config.allow_long_path_forms();
        }

        let classifier = CommandClassifier::with_extra_rules(
            &profile,
            &extra_rules(&config.commands.extra_deny),
            &extra_rules(&config.commands.extra_warn),
        )?;

        Ok(Self {
            guard: PathGuard::with_profile(guard_config, profile.clone()),
            classifier,
            permissions: PermissionAdapter::new(profile.clone()),
            watches: Arc::new(WatchRegistry::new()),
            defaults: ToolDefaults::from_config(config),
            profile,
        })
    }

    /// Replace the defaults.
    #[must_use]
    pub fn with_defaults(mut self, defaults: ToolDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    /// Replace the permission adapter.
    #[must_use]
    pub fn with_permission_adapter(mut self, adapter: PermissionAdapter) -> Self {
        self.permissions = adapter;
        self
    }
}

fn extra_rules(sections: &[RuleSection]) -> Vec<ExtraRule> {
    sections
        .iter()
        .map(|r| ExtraRule {
            id: r.id.clone(),
            pattern: r.pattern.clone(),
            reason: r.reason.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_follow_config() {
        let mut config = Config::default();
        config.commands.exec_timeout_ms = 1_000;
        config.watcher.debounce_ms = 40;
        let defaults = ToolDefaults::from_config(&config);
        assert_eq!(defaults.exec_timeout_ms, 1_000);
        assert_eq!(defaults.watch.debounce_ms, 40);
        assert_eq!(defaults.permission_max_depth, 16);
    }

    #[test]
    fn test_from_config_adds_extra_rules() {
        let mut config = Config::default();
        config.commands.extra_deny.push(RuleSection {
            id: "no-curl".to_string(),
            pattern: r"\bcurl\b".to_string(),
            reason: "network access".to_string(),
        });
        let dir = tempfile::tempdir().unwrap();
        let base = CommandClassifier::for_profile(&PlatformProfile::linux()).rule_counts();
        let ctx = ToolContext::from_config(&config, dir.path(), PlatformProfile::linux()).unwrap();
        let (deny, warn) = ctx.classifier.rule_counts();
        assert_eq!(deny, base.0.saturating_add(1));
        assert_eq!(warn, base.1);
        assert!(ctx.classifier.classify("curl http://x").is_deny());
    }

    #[test]
    fn test_from_config_rejects_bad_rule() {
        let mut config = Config::default();
        config.commands.extra_warn.push(RuleSection {
            id: "broken".to_string(),
            pattern: "(".to_string(),
            reason: String::new(),
        });
        let dir = tempfile::tempdir().unwrap();
        assert!(ToolContext::from_config(&config, dir.path(), PlatformProfile::linux()).is_err());
    }
}
