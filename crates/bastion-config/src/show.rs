//! Resolved configuration display.

use serde::Serialize;

use crate::error::{ConfigError, ConfigResult};
use crate::merge::FieldSources;
use crate::types::Config;

/// Output format for [`ResolvedConfig::render`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShowFormat {
    /// TOML, as it would appear in a config file.
    Toml,
    /// JSON including field sources and loaded files.
    Json,
}

/// A loaded configuration together with where its values came from.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedConfig {
    /// The final configuration.
    pub config: Config,
    /// Which layer set each field.
    pub field_sources: FieldSources,
    /// Files merged on top of the defaults, in order.
    pub loaded_files: Vec<String>,
}

impl ResolvedConfig {
    /// Render for display.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::RenderError`] if serialization fails.
    pub fn render(&self, format: ShowFormat) -> ConfigResult<String> {
        match format {
            ShowFormat::Toml => {
                let mut out = String::new();
                if self.loaded_files.is_empty() {
                    out.push_str("# sources: defaults only\n");
                } else {
                    for file in &self.loaded_files {
                        out.push_str(&format!("# loaded: {file}\n"));
                    }
                }
                let body = toml::to_string_pretty(&self.config)
                    .map_err(|e| ConfigError::RenderError(e.to_string()))?;
                out.push_str(&body);
                Ok(out)
            },
            ShowFormat::Json => serde_json::to_string_pretty(self)
                .map_err(|e| ConfigError::RenderError(e.to_string())),
        }
    }
}
