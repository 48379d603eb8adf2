//! Bastion Approval - Command risk classification and confirmation.
//!
//! Shell commands supplied by the caller are scored against ordered rule
//! tables into one of three tiers:
//!
//! - **deny**: never executed, with or without confirmation
//! - **warn**: executed only when the call carries an explicit confirmation
//! - **allow**: executed freely
//!
//! The [`CommandClassifier`] is a heuristic safety net over the raw command
//! text, not a shell parser. The [`ConfirmationGate`] turns a verdict plus the
//! caller's confirmation flag into a [`GateDecision`].
//!
//! # Example
//!
//! ```
//! use bastion_approval::{CommandClassifier, ConfirmationGate, GateDecision, VerdictLevel};
//! use bastion_core::PlatformProfile;
//!
//! let classifier = CommandClassifier::for_profile(&PlatformProfile::linux());
//!
//! let verdict = classifier.classify("rm -rf /tmp/build");
//! assert_eq!(verdict.level, VerdictLevel::Warn);
//! assert_eq!(verdict.matched_rule.as_deref(), Some("recursive-delete"));
//!
//! assert!(matches!(
//!     ConfirmationGate::evaluate(&verdict, false),
//!     GateDecision::NeedConfirm { .. }
//! ));
//! assert!(ConfirmationGate::evaluate(&verdict, true).is_proceed());
//!
//! let verdict = classifier.classify("rm -rf /");
//! assert_eq!(verdict.level, VerdictLevel::Deny);
//! assert!(matches!(
//!     ConfirmationGate::evaluate(&verdict, true),
//!     GateDecision::Reject { .. }
//! ));
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

pub mod classifier;
pub mod error;
pub mod gate;
pub mod rules;
mod segments;

pub use classifier::{CommandClassifier, CommandVerdict, VerdictLevel};
pub use error::{ClassifierError, ClassifierResult};
pub use gate::{Authorization, ConfirmationGate, GateDecision};
pub use rules::{CommandRule, ExtraRule, RuleTier};
