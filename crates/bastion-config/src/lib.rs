//! Bastion Config - Layered configuration.
//!
//! # Usage
//!
//! ```rust,no_run
//! use bastion_config::Config;
//!
//! let resolved = Config::load(None).unwrap();
//! println!("debounce: {} ms", resolved.config.watcher.debounce_ms);
//! ```
//!
//! # Precedence
//!
//! From highest to lowest priority:
//!
//! 1. **Explicit** file passed by the caller
//! 2. **User** (`$BASTION_HOME/config.toml`, else `~/.bastion/config.toml`)
//! 3. **System** (`/etc/bastion/config.toml`)
//! 4. **Embedded defaults** (`defaults.toml` compiled into the binary)
//!
//! This crate depends on no other bastion crate. Conversion into guard,
//! classifier, permission and watcher settings happens where they are built.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

/// Configuration error types.
pub mod error;
/// Configuration file discovery and loading.
pub mod loader;
/// Layered merging with source tracking.
pub mod merge;
/// Resolved configuration display.
pub mod show;
/// Configuration struct definitions.
pub mod types;
/// Configuration validation rules.
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use merge::{ConfigLayer, FieldSources};
pub use show::{ResolvedConfig, ShowFormat};
pub use types::*;

impl Config {
    /// Load configuration with full layering; `explicit` is merged last.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if any file is malformed or the result
    /// fails validation.
    pub fn load(explicit: Option<&std::path::Path>) -> ConfigResult<ResolvedConfig> {
        loader::load(explicit, None)
    }

    /// Load with an explicit Bastion home directory.
    ///
    /// # Errors
    ///
    /// As [`load`](Self::load).
    pub fn load_with_home(
        explicit: Option<&std::path::Path>,
        home: &std::path::Path,
    ) -> ConfigResult<ResolvedConfig> {
        loader::load(explicit, Some(home))
    }

    /// Load one file over the embedded defaults.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file cannot be read, parsed, or fails
    /// validation.
    pub fn load_file(path: &std::path::Path) -> ConfigResult<Self> {
        loader::load_file(path)
    }
}
