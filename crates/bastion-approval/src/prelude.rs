//! Prelude module - commonly used types for convenient import.
//!
//! Use `use bastion_approval::prelude::*;` to import all essential types.

// Classification
pub use crate::{CommandClassifier, CommandVerdict, VerdictLevel};

// Confirmation
pub use crate::{Authorization, ConfirmationGate, GateDecision};

// Rules
pub use crate::{CommandRule, ExtraRule, RuleTier};

// Errors
pub use crate::{ClassifierError, ClassifierResult};
