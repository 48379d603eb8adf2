//! Prelude module - commonly used types for convenient import.
//!
//! Use `use bastion_tools::prelude::*;` to import all essential types.

// Registry
pub use crate::{BuiltinTool, ToolDefinition, ToolRegistry};

// Context
pub use crate::{ToolContext, ToolDefaults};

// Tools
pub use crate::{
    ExecCommandTool, GetPermissionsTool, ListDirectoryTool, ReadFileTool, SetPermissionsTool,
    WatchDirectoryTool, WriteFileTool,
};

// Errors
pub use crate::{ToolError, ToolResult};
