//! Prelude module - commonly used types for convenient import.
//!
//! Use `use bastion_workspace::prelude::*;` to import all essential types.

// Resolution
pub use crate::{PathCheck, PathGuard, ResolveOptions, ResolvedPath};

// Configuration
pub use crate::GuardConfig;

// Errors
pub use crate::{GuardError, GuardResult};
