//! Prelude module - commonly used types for convenient import.
//!
//! Use `use bastion_config::prelude::*;` to import all essential types.

// Configuration
pub use crate::{
    CommandsSection, Config, GuardSection, LoggingSection, PermissionsSection, RuleSection,
    WatcherSection,
};

// Loading
pub use crate::{ConfigLayer, ResolvedConfig, ShowFormat};

// Errors
pub use crate::{ConfigError, ConfigResult};
