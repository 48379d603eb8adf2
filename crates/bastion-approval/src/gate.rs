//! Confirmation gate.
//!
//! | Verdict | `confirmed = false` | `confirmed = true` |
//! |---------|---------------------|--------------------|
//! | allow   | Proceed             | Proceed            |
//! | warn    | NeedConfirm         | Proceed (this call only) |
//! | deny    | Reject              | Reject             |
//!
//! The gate holds no state: a confirmation authorizes the single call that
//! carried it and nothing after.

use serde::Serialize;
use tracing::{info, warn};

use crate::classifier::{CommandVerdict, VerdictLevel};
use crate::error::ClassifierError;

/// The verdict that authorized an execution, kept for logging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Authorization {
    /// Verdict the classifier returned.
    pub verdict: CommandVerdict,
    /// Whether the call carried an explicit confirmation.
    pub confirmed: bool,
}

/// What the caller may do with a classified command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum GateDecision {
    /// Execute once.
    Proceed {
        /// The authorizing verdict.
        authorized_by: Authorization,
    },
    /// Do not execute; ask the caller to resubmit with confirmation.
    NeedConfirm {
        /// Why confirmation is needed.
        reason: String,
        /// Rule that triggered the warning.
        matched_rule: Option<String>,
    },
    /// Never execute.
    Reject {
        /// Why the command is denied.
        reason: String,
        /// Rule that denied the command.
        matched_rule: Option<String>,
    },
}

impl GateDecision {
    /// Check if execution may proceed.
    #[must_use]
    pub fn is_proceed(&self) -> bool {
        matches!(self, Self::Proceed { .. })
    }

    /// Convert into the authorization, or the error a caller should surface.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifierError::ConfirmationRequired`] for `NeedConfirm` and
    /// [`ClassifierError::Denied`] for `Reject`.
    pub fn into_result(self) -> Result<Authorization, ClassifierError> {
        match self {
            Self::Proceed { authorized_by } => Ok(authorized_by),
            Self::NeedConfirm {
                reason,
                matched_rule,
            } => Err(ClassifierError::ConfirmationRequired {
                rule: matched_rule.unwrap_or_default(),
                reason,
            }),
            Self::Reject {
                reason,
                matched_rule,
            } => Err(ClassifierError::Denied {
                rule: matched_rule.unwrap_or_default(),
                reason,
            }),
        }
    }
}

/// Applies the confirmation protocol to a verdict.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfirmationGate;

impl ConfirmationGate {
    /// Decide whether a classified command may run on this call.
    #[must_use]
    pub fn evaluate(verdict: &CommandVerdict, confirmed: bool) -> GateDecision {
        match verdict.level {
            VerdictLevel::Allow => GateDecision::Proceed {
                authorized_by: Authorization {
                    verdict: verdict.clone(),
                    confirmed,
                },
            },
            VerdictLevel::Warn if confirmed => {
                info!(
                    rule = verdict.matched_rule.as_deref().unwrap_or("-"),
                    "Warn-tier command confirmed for this call"
                );
                GateDecision::Proceed {
                    authorized_by: Authorization {
                        verdict: verdict.clone(),
                        confirmed: true,
                    },
                }
            },
            VerdictLevel::Warn => GateDecision::NeedConfirm {
                reason: verdict.reason.clone(),
                matched_rule: verdict.matched_rule.clone(),
            },
            VerdictLevel::Deny => {
                warn!(
                    rule = verdict.matched_rule.as_deref().unwrap_or("-"),
                    confirmed,
                    "Denied command rejected"
                );
                GateDecision::Reject {
                    reason: verdict.reason.clone(),
                    matched_rule: verdict.matched_rule.clone(),
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CommandClassifier;
    use bastion_core::{ErrorKind, HasErrorKind, PlatformProfile};

    fn verdict(level: VerdictLevel, rule: Option<&str>) -> CommandVerdict {
        CommandVerdict {
            level,
            reason: "because".to_string(),
            matched_rule: rule.map(str::to_string),
        }
    }

    #[test]
    fn test_allow_always_proceeds() {
        let v = verdict(VerdictLevel::Allow, None);
        assert!(ConfirmationGate::evaluate(&v, false).is_proceed());
        assert!(ConfirmationGate::evaluate(&v, true).is_proceed());
    }

    #[test]
    fn test_warn_needs_confirmation() {
        let v = verdict(VerdictLevel::Warn, Some("recursive-delete"));
        let decision = ConfirmationGate::evaluate(&v, false);
        assert_eq!(
            decision,
            GateDecision::NeedConfirm {
                reason: "because".to_string(),
                matched_rule: Some("recursive-delete".to_string()),
            }
        );
    }

    #[test]
    fn test_warn_confirmed_proceeds_with_authorization() {
        let v = verdict(VerdictLevel::Warn, Some("recursive-delete"));
        let GateDecision::Proceed { authorized_by } = ConfirmationGate::evaluate(&v, true) else {
            panic!("expected proceed");
        };
        assert!(authorized_by.confirmed);
        assert_eq!(authorized_by.verdict, v);
    }

    #[test]
    fn test_deny_never_overridable() {
        let v = verdict(VerdictLevel::Deny, Some("root-wipe"));
        for confirmed in [false, true] {
            assert!(matches!(
                ConfirmationGate::evaluate(&v, confirmed),
                GateDecision::Reject { .. }
            ));
        }
    }

    #[test]
    fn test_confirmation_does_not_carry_over() {
        let classifier = CommandClassifier::for_profile(&PlatformProfile::linux());
        let v = classifier.classify("rm -rf /tmp/build");
        assert!(ConfirmationGate::evaluate(&v, true).is_proceed());
        // The next call without confirmation is gated again.
        let v = classifier.classify("rm -rf /tmp/build");
        assert!(!ConfirmationGate::evaluate(&v, false).is_proceed());
    }

    #[test]
    fn test_into_result_kinds() {
        let need = ConfirmationGate::evaluate(&verdict(VerdictLevel::Warn, Some("x")), false);
        assert_eq!(
            need.into_result().unwrap_err().kind(),
            ErrorKind::NeedsConfirmation
        );
        let reject = ConfirmationGate::evaluate(&verdict(VerdictLevel::Deny, Some("y")), false);
        assert_eq!(
            reject.into_result().unwrap_err().kind(),
            ErrorKind::DangerousCommand
        );
    }

    #[test]
    fn test_decision_serializes_tagged() {
        let d = ConfirmationGate::evaluate(&verdict(VerdictLevel::Warn, Some("x")), false);
        let json = serde_json::to_value(&d).unwrap();
        assert_eq!(json["decision"], "need_confirm");
        assert_eq!(json["matched_rule"], "x");
    }
}
