//! Prelude module - commonly used types for convenient import.
//!
//! Use `use bastion_permissions::prelude::*;` to import all essential types.

// Adapter
pub use crate::{MutationReport, PermissionAdapter, SetOptions, SubOperation};

// Requests
pub use crate::{PermissionOp, PermissionRequest, WindowsDelta};

// Snapshots
pub use crate::PermissionSnapshot;

// Errors
pub use crate::{PermissionError, PermissionResult};
