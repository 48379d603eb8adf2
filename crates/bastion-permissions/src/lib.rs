//! Bastion Permissions - One mutation interface over POSIX modes and
//! Windows attributes/ACLs.
//!
//! A [`PermissionRequest`] is first planned into [`PermissionOp`]s by the
//! pure [`plan`] function, then applied by a [`PermissionAdapter`] to a
//! [`ResolvedPath`](bastion_workspace::ResolvedPath) and optionally its
//! subtree.
//!
//! # Recursion
//!
//! The target is depth 0. With `skip_errors = false` the whole tree is
//! scanned first and the call fails with `LimitReached` before touching
//! anything if an entry lies deeper than `max_depth`. With
//! `skip_errors = true` entries up to `max_depth` are modified, each
//! directory whose children were not visited is recorded as a failed
//! item, and the report is flagged `truncated`.
//!
//! Symlinks inside the tree are never followed or modified.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

pub mod adapter;
pub mod apply;
pub mod error;
pub mod request;
pub mod snapshot;

pub use adapter::{MutationReport, PermissionAdapter, SetOptions, SubOperation};
pub use apply::{OpApplier, SystemApplier};
pub use error::{PermissionError, PermissionResult};
pub use request::{AclEntry, AclRights, FileAttribute, PermissionOp, PermissionRequest, WindowsDelta, plan};
pub use snapshot::{AccessBits, EntryKind, PermissionSnapshot, PosixDetails, WindowsDetails};
