//! Post-merge configuration validation.

use std::collections::HashSet;

use crate::error::{ConfigError, ConfigResult};
use crate::types::{Config, RuleSection};

/// Longest accepted debounce window.
const MAX_DEBOUNCE_MS: u64 = 60_000;
/// Deepest accepted recursion for permissions and watching.
const MAX_DEPTH_UPPER_BOUND: usize = 64;
/// Known log formats.
const LOG_FORMATS: &[&str] = &["pretty", "compact", "json", "full"];
/// Known log levels.
const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a merged configuration.
///
/// # Errors
///
/// Returns the first [`ConfigError::ValidationError`] found.
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_commands(config)?;
    validate_permissions(config)?;
    validate_watcher(config)?;
    validate_logging(config)?;
    Ok(())
}

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.to_owned(),
        message: message.into(),
    }
}

fn validate_commands(config: &Config) -> ConfigResult<()> {
    let c = &config.commands;

    if c.exec_timeout_ms == 0 {
        return Err(invalid("commands.exec_timeout_ms", "must be positive"));
    }
    if c.exec_timeout_ms > c.max_timeout_ms {
        return Err(invalid(
            "commands.exec_timeout_ms",
            format!(
                "exec_timeout_ms ({}) must not exceed max_timeout_ms ({})",
                c.exec_timeout_ms, c.max_timeout_ms
            ),
        ));
    }

    let mut seen = HashSet::new();
    validate_rules("commands.extra_deny", &c.extra_deny, &mut seen)?;
    validate_rules("commands.extra_warn", &c.extra_warn, &mut seen)?;
    Ok(())
}

fn validate_rules<'a>(
    field: &str,
    rules: &'a [RuleSection],
    seen: &mut HashSet<&'a str>,
) -> ConfigResult<()> {
    for rule in rules {
        if rule.id.trim().is_empty() {
            return Err(invalid(field, "rule id must not be empty"));
        }
        if !seen.insert(rule.id.as_str()) {
            return Err(invalid(field, format!("duplicate rule id '{}'", rule.id)));
        }
        if let Err(e) = regex::Regex::new(&rule.pattern) {
            return Err(invalid(
                field,
                format!("rule '{}' has an invalid pattern: {e}", rule.id),
            ));
        }
    }
    Ok(())
}

fn validate_permissions(config: &Config) -> ConfigResult<()> {
    if config.permissions.default_max_depth > MAX_DEPTH_UPPER_BOUND {
        return Err(invalid(
            "permissions.default_max_depth",
            format!("must be at most {MAX_DEPTH_UPPER_BOUND}"),
        ));
    }
    Ok(())
}

fn validate_watcher(config: &Config) -> ConfigResult<()> {
    let w = &config.watcher;

    if w.debounce_ms == 0 || w.debounce_ms > MAX_DEBOUNCE_MS {
        return Err(invalid(
            "watcher.debounce_ms",
            format!("must be between 1 and {MAX_DEBOUNCE_MS}"),
        ));
    }
    if w.max_depth > MAX_DEPTH_UPPER_BOUND {
        return Err(invalid(
            "watcher.max_depth",
            format!("must be at most {MAX_DEPTH_UPPER_BOUND}"),
        ));
    }
    if w.channel_capacity == 0 {
        return Err(invalid("watcher.channel_capacity", "must be positive"));
    }
    if w.max_duration_ms == 0 {
        return Err(invalid("watcher.max_duration_ms", "must be positive"));
    }
    if w.default_duration_ms == 0 || w.default_duration_ms > w.max_duration_ms {
        return Err(invalid(
            "watcher.default_duration_ms",
            format!(
                "must be between 1 and max_duration_ms ({})",
                w.max_duration_ms
            ),
        ));
    }
    Ok(())
}

fn validate_logging(config: &Config) -> ConfigResult<()> {
    let l = &config.logging;

    if !LOG_FORMATS.contains(&l.format.as_str()) {
        return Err(invalid(
            "logging.format",
            format!(
                "unsupported format '{}'; expected one of: {}",
                l.format,
                LOG_FORMATS.join(", ")
            ),
        ));
    }
    if !LOG_LEVELS.contains(&l.level.to_lowercase().as_str()) {
        return Err(invalid(
            "logging.level",
            format!(
                "unsupported level '{}'; expected one of: {}",
                l.level,
                LOG_LEVELS.join(", ")
            ),
        ));
    }
    Ok(())
}
