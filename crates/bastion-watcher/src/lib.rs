//! Bastion Watcher - Cross-platform change watching for one caller invocation.
//!
//! A [`WatchSession`] watches a confined directory and emits debounced
//! [`ChangeEvent`]s until it is stopped or its run duration elapses.
//!
//! # Architecture
//!
//! ```text
//! OS notifications (notify) / test backend
//!   → RawSender::send (bounded channel, never blocks the callback)
//!   → consumer task: coalesce per (kind, path), reset deadline on repeats
//!   → flush: rename → create/delete by existence, re-arm / release handles
//!   → ChangeEvent channel → caller
//! ```
//!
//! # Lifecycle
//!
//! `idle → starting → active → stopping → stopped`. Platforms with native
//! recursive watching get one recursive handle; elsewhere every directory
//! down to `max_depth` gets its own non-recursive handle, and directories
//! created later are armed as they appear.
//!
//! Sessions are never tracked globally. Callers that need to stop sessions
//! from elsewhere keep them in a [`WatchRegistry`] they own.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

pub mod backend;
mod debounce;
pub mod error;
pub mod event;
pub mod registry;
pub mod session;

pub use backend::{MemoryBackend, NotifyBackend, RawEvent, RawKind, RawReceiver, RawSender, WatchBackend, WatchMode, raw_channel};
pub use error::{WatchError, WatchResult};
pub use event::{ChangeEvent, ChangeKind};
pub use registry::{Tracked, WatchRegistry};
pub use session::{
    FailedRegistration, HandleStrategy, WatchControl, WatchOptions, WatchReport, WatchSession,
    WatchState, WatchStats,
};
