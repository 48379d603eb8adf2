//! Prelude module - commonly used types for convenient import.
//!
//! Use `use bastion_core::prelude::*;` to import all essential types.

// Platform model
pub use crate::{OsFamily, PermissionModel, PlatformProfile, ShellConvention, ShellKind, profile};

// Errors and outcomes
pub use crate::{ErrorKind, HasErrorKind, ToolOutcome};

// Directories
pub use crate::{BastionHome, caller_home};
