//! Bastion Workspace - Path resolution and confinement for agent actions.
//!
//! Every caller-supplied path string goes through [`PathGuard::resolve`],
//! which turns it into a single canonical absolute path and proves that
//! path sits inside an approved confinement root. Nothing else in Bastion
//! builds absolute paths from caller input.
//!
//! # Key Concepts
//!
//! - **Confinement root**: the caller's home directory, or an explicit
//!   per-call working root. No other roots are inferred.
//! - **Fail closed**: a violation is a [`GuardError`], never a best guess.
//! - **Real paths**: symlinks are resolved before the confinement check
//!   unless the caller explicitly allows symlink escape.
//!
//! # Example
//!
//! ```rust,no_run
//! use bastion_workspace::{GuardConfig, PathGuard, ResolveOptions};
//!
//! let guard = PathGuard::new(GuardConfig::new("/home/alice"));
//!
//! let resolved = guard
//!     .resolve("notes/todo.txt", &ResolveOptions::default())
//!     .unwrap();
//! assert!(resolved.within_root());
//!
//! assert!(guard.resolve("../../etc/passwd", &ResolveOptions::default()).is_err());
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

pub mod boundaries;
pub mod config;
pub mod error;
mod normalize;

pub use boundaries::{PathCheck, PathGuard, ResolveOptions, ResolvedPath};
pub use config::GuardConfig;
pub use error::{GuardError, GuardResult};
pub use normalize::{is_within, normalize_lexically};
