//! Prelude module - commonly used types for convenient import.
//!
//! Use `use bastion_watcher::prelude::*;` to import all essential types.

// Sessions
pub use crate::{WatchControl, WatchOptions, WatchReport, WatchSession, WatchState, WatchStats};

// Events
pub use crate::{ChangeEvent, ChangeKind};

// Registry
pub use crate::WatchRegistry;

// Errors
pub use crate::{WatchError, WatchResult};
