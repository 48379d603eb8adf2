//! Config file discovery and layered loading.
//!
//! 1. Parse embedded `defaults.toml`
//! 2. Merge `/etc/bastion/config.toml` (system)
//! 3. Merge `$BASTION_HOME/config.toml` or `~/.bastion/config.toml` (user)
//! 4. Merge an explicit file, if given
//! 5. Deserialize the merged tree and validate

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::{ConfigError, ConfigResult};
use crate::merge::{ConfigLayer, FieldSources, deep_merge_tracking, record_leaves};
use crate::show::ResolvedConfig;
use crate::types::Config;
use crate::validate;

/// Embedded default configuration.
const DEFAULTS_TOML: &str = include_str!("defaults.toml");

/// Maximum accepted config file size (1 MB).
const MAX_CONFIG_FILE_SIZE: usize = 1_048_576;

/// Environment variable naming the Bastion home directory.
pub const HOME_ENV: &str = "BASTION_HOME";

/// Load configuration with full layering.
///
/// `home_override` is used as the Bastion home directory itself (the
/// directory holding `config.toml`), bypassing `$BASTION_HOME` and `~/.bastion`.
///
/// # Errors
///
/// Returns a [`ConfigError`] if a file is unreadable or malformed, or the
/// merged configuration fails validation.
pub fn load(explicit: Option<&Path>, home_override: Option<&Path>) -> ConfigResult<ResolvedConfig> {
    load_layers(Some(Path::new("/etc/bastion/config.toml")), explicit, home_override)
}

/// Layered load with an injectable system path (`None` skips it).
pub(crate) fn load_layers(
    system: Option<&Path>,
    explicit: Option<&Path>,
    home_override: Option<&Path>,
) -> ConfigResult<ResolvedConfig> {
    let mut merged: toml::Value =
        toml::from_str(DEFAULTS_TOML).map_err(|e| ConfigError::ParseError {
            path: "<embedded defaults>".to_owned(),
            source: e,
        })?;

    let mut field_sources = FieldSources::new();
    let mut loaded_files = Vec::new();
    record_leaves(&merged, "", &ConfigLayer::Defaults, &mut field_sources);

    if let Some(system) = system
        && let Some(overlay) = try_load_file(system)?
    {
        deep_merge_tracking(&mut merged, &overlay, "", &ConfigLayer::System, &mut field_sources);
        loaded_files.push(system.display().to_string());
        info!(path = %system.display(), "Loaded system config");
    }

    let user_path = match home_override {
        Some(home) => Some(home.join("config.toml")),
        None => user_home()?.map(|home| home.join("config.toml")),
    };
    if let Some(user_path) = user_path
        && let Some(overlay) = try_load_file(&user_path)?
    {
        deep_merge_tracking(&mut merged, &overlay, "", &ConfigLayer::User, &mut field_sources);
        loaded_files.push(user_path.display().to_string());
        info!(path = %user_path.display(), "Loaded user config");
    }

    if let Some(explicit) = explicit {
        // An explicitly named file must exist.
        let overlay = try_load_file(explicit)?.ok_or_else(|| ConfigError::ReadError {
            path: explicit.display().to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "file not found"),
        })?;
        deep_merge_tracking(&mut merged, &overlay, "", &ConfigLayer::Explicit, &mut field_sources);
        loaded_files.push(explicit.display().to_string());
        info!(path = %explicit.display(), "Loaded explicit config");
    }

    let config: Config = merged
        .try_into()
        .map_err(|e: toml::de::Error| ConfigError::ParseError {
            path: "<merged config>".to_owned(),
            source: e,
        })?;

    validate::validate(&config)?;

    Ok(ResolvedConfig {
        config,
        field_sources,
        loaded_files,
    })
}

/// Load a single file on top of the embedded defaults (no other layers).
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file cannot be read, parsed, or fails
/// validation.
pub fn load_file(path: &Path) -> ConfigResult<Config> {
    let overlay = try_load_file(path)?.ok_or_else(|| ConfigError::ReadError {
        path: path.display().to_string(),
        source: std::io::Error::new(std::io::ErrorKind::NotFound, "file not found"),
    })?;
    let mut merged: toml::Value =
        toml::from_str(DEFAULTS_TOML).map_err(|e| ConfigError::ParseError {
            path: "<embedded defaults>".to_owned(),
            source: e,
        })?;
    crate::merge::deep_merge(&mut merged, &overlay);
    let config: Config = merged
        .try_into()
        .map_err(|e: toml::de::Error| ConfigError::ParseError {
            path: path.display().to_string(),
            source: e,
        })?;
    validate::validate(&config)?;
    Ok(config)
}

/// Read and parse a file, `None` if it does not exist.
///
/// Reads once, then checks the size, so there is no stat/read race.
fn try_load_file(path: &Path) -> ConfigResult<Option<toml::Value>> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "Config file not found, skipping");
            return Ok(None);
        },
        Err(e) => {
            return Err(ConfigError::ReadError {
                path: path.display().to_string(),
                source: e,
            });
        },
    };

    if content.len() > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::ValidationError {
            field: path.display().to_string(),
            message: format!(
                "config file is {} bytes, exceeding the {MAX_CONFIG_FILE_SIZE} byte limit",
                content.len()
            ),
        });
    }

    let value: toml::Value = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
        path: path.display().to_string(),
        source: e,
    })?;
    Ok(Some(value))
}

/// `$BASTION_HOME` if it names a directory, else `~/.bastion`.
///
/// Returns `Ok(None)` when neither exists (no user layer).
fn user_home() -> ConfigResult<Option<PathBuf>> {
    if let Some(raw) = std::env::var_os(HOME_ENV) {
        let path = PathBuf::from(&raw);
        if path.is_dir() {
            return Ok(Some(path));
        }
        warn!(path = %path.display(), "BASTION_HOME is not a directory; ignoring");
    }
    let base = directories::BaseDirs::new().ok_or(ConfigError::NoHomeDir)?;
    let home = base.home_dir().join(".bastion");
    Ok(home.is_dir().then_some(home))
}
