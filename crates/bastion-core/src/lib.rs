//! Bastion Core - Foundation types for the Bastion mediation layer.
//!
//! This crate provides:
//! - The [`PlatformProfile`] every policy decision consults
//! - The machine-readable [`ErrorKind`] shared by all Bastion error types
//! - The caller-visible [`ToolOutcome`] (`ok` / `need_confirm` / `error`)
//! - Home directory discovery for the confinement root and Bastion state

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

pub mod dirs;
pub mod error;
pub mod outcome;
pub mod platform;

pub use dirs::{BastionHome, caller_home};
pub use error::{ErrorKind, HasErrorKind};
pub use outcome::ToolOutcome;
pub use platform::{OsFamily, PermissionModel, PlatformProfile, ShellConvention, ShellKind, profile};
