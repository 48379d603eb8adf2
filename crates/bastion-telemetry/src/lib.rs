//! Bastion Telemetry - Logging setup and call correlation.
//!
//! # Example
//!
//! ```rust,no_run
//! use bastion_telemetry::{CallContext, LogConfig, LogFormat, setup_logging};
//!
//! # fn main() -> Result<(), bastion_telemetry::TelemetryError> {
//! let config = LogConfig::new("debug")
//!     .with_format(LogFormat::Json)
//!     .with_directive("bastion_watcher=trace");
//! setup_logging(&config)?;
//!
//! let call = CallContext::new("exec_command");
//! let _guard = call.span().entered();
//! tracing::info!("running");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod call;
mod error;
mod logging;

pub use call::CallContext;
pub use error::{TelemetryError, TelemetryResult};
pub use logging::{
    FileRotation, LogConfig, LogFormat, LogTarget, setup_default_logging, setup_logging,
};
