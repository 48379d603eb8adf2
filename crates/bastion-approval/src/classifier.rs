//! Command risk classifier.
//!
//! # Check Order
//!
//! 1. Empty command -> `Allow` ("empty command")
//! 2. Any deny rule matches a segment or the whole string, as written or
//!    with quotes stripped and path words reduced -> `Deny`
//! 3. Any warn rule matches -> `Warn`
//! 4. Otherwise -> `Allow`
//!
//! Rules are tried in table order, built-ins before configured extras.

use std::fmt;

use bastion_core::PlatformProfile;
use regex::{Regex, RegexBuilder};
use serde::Serialize;
use tracing::{debug, error};

use crate::error::{ClassifierError, ClassifierResult};
use crate::rules::{ExtraRule, RuleTier, builtin_rules};
use crate::segments::{normalize_segment, split_segments};

/// Classification tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictLevel {
    /// Safe to run.
    Allow,
    /// Run only with explicit confirmation.
    Warn,
    /// Never run.
    Deny,
}

impl fmt::Display for VerdictLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Allow => write!(f, "allow"),
            Self::Warn => write!(f, "warn"),
            Self::Deny => write!(f, "deny"),
        }
    }
}

impl From<RuleTier> for VerdictLevel {
    fn from(tier: RuleTier) -> Self {
        match tier {
            RuleTier::Deny => Self::Deny,
            RuleTier::Warn => Self::Warn,
        }
    }
}

/// The classifier's decision for one command. Never cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandVerdict {
    /// Tier.
    pub level: VerdictLevel,
    /// Human-readable reason.
    pub reason: String,
    /// Identifier of the rule that matched, if any.
    pub matched_rule: Option<String>,
}

impl CommandVerdict {
    /// An allow verdict with no matched rule.
    #[must_use]
    pub fn allow(reason: impl Into<String>) -> Self {
        Self {
            level: VerdictLevel::Allow,
            reason: reason.into(),
            matched_rule: None,
        }
    }

    /// Check if the verdict allows execution without confirmation.
    #[must_use]
    pub fn is_allow(&self) -> bool {
        self.level == VerdictLevel::Allow
    }

    /// Check if the verdict is a hard deny.
    #[must_use]
    pub fn is_deny(&self) -> bool {
        self.level == VerdictLevel::Deny
    }
}

#[derive(Debug, Clone)]
struct CompiledRule {
    id: String,
    tier: RuleTier,
    regex: Regex,
    reason: String,
}

impl CompiledRule {
    fn compile(
        id: &str,
        tier: RuleTier,
        pattern: &str,
        reason: &str,
        case_insensitive: bool,
    ) -> ClassifierResult<Self> {
        if id.trim().is_empty() {
            return Err(ClassifierError::EmptyRuleId);
        }
        let regex = RegexBuilder::new(pattern)
            .case_insensitive(case_insensitive)
            .build()
            .map_err(|source| ClassifierError::InvalidPattern {
                id: id.to_string(),
                source,
            })?;
        let reason = if reason.is_empty() {
            format!("matched rule '{id}'")
        } else {
            reason.to_string()
        };
        Ok(Self {
            id: id.to_string(),
            tier,
            regex,
            reason,
        })
    }

    fn verdict(&self) -> CommandVerdict {
        CommandVerdict {
            level: self.tier.into(),
            reason: self.reason.clone(),
            matched_rule: Some(self.id.clone()),
        }
    }
}

/// Scores shell command strings against the rule tables for one profile.
///
/// Holds only compiled, immutable rules; share it freely.
#[derive(Debug, Clone)]
pub struct CommandClassifier {
    deny: Vec<CompiledRule>,
    warn: Vec<CompiledRule>,
}

impl CommandClassifier {
    /// Build a classifier with the built-in rules for `profile`.
    ///
    /// Built-in patterns are fixed and covered by tests; a pattern that
    /// somehow fails to compile is skipped rather than aborting startup.
    #[must_use]
    pub fn for_profile(profile: &PlatformProfile) -> Self {
        let case_insensitive = profile.is_windows();
        let mut classifier = Self {
            deny: Vec::new(),
            warn: Vec::new(),
        };
        for rule in builtin_rules(profile) {
            match CompiledRule::compile(
                rule.id,
                rule.tier,
                rule.pattern,
                rule.reason,
                case_insensitive,
            ) {
                Ok(compiled) => classifier.push(compiled),
                Err(e) => {
                    error!(rule = rule.id, error = %e, "Built-in rule failed to compile");
                },
            }
        }
        classifier
    }

    /// Build a classifier with built-ins plus configured extra rules.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifierError::InvalidPattern`] or
    /// [`ClassifierError::EmptyRuleId`] for a bad configured rule.
    pub fn with_extra_rules(
        profile: &PlatformProfile,
        extra_deny: &[ExtraRule],
        extra_warn: &[ExtraRule],
    ) -> ClassifierResult<Self> {
        let case_insensitive = profile.is_windows();
        let mut classifier = Self::for_profile(profile);
        for (tier, rules) in [(RuleTier::Deny, extra_deny), (RuleTier::Warn, extra_warn)] {
            for rule in rules {
                classifier.push(CompiledRule::compile(
                    &rule.id,
                    tier,
                    &rule.pattern,
                    &rule.reason,
                    case_insensitive,
                )?);
            }
        }
        Ok(classifier)
    }

    fn push(&mut self, rule: CompiledRule) {
        match rule.tier {
            RuleTier::Deny => self.deny.push(rule),
            RuleTier::Warn => self.warn.push(rule),
        }
    }

    /// Number of rules per tier as `(deny, warn)`.
    #[must_use]
    pub fn rule_counts(&self) -> (usize, usize) {
        (self.deny.len(), self.warn.len())
    }

    /// Classify a command. Deterministic and infallible.
    #[must_use]
    pub fn classify(&self, command: &str) -> CommandVerdict {
        let trimmed = command.trim();
        if trimmed.is_empty() {
            return CommandVerdict::allow("empty command");
        }

        let mut raw = split_segments(trimmed);
        if raw.len() != 1 || raw.first() != Some(&trimmed) {
            raw.push(trimmed);
        }
        let normalized: Vec<String> = raw
            .iter()
            .map(|text| normalize_segment(text))
            .filter(|text| !raw.contains(&text.as_str()))
            .collect();
        let texts: Vec<&str> = raw
            .iter()
            .copied()
            .chain(normalized.iter().map(String::as_str))
            .collect();

        for rules in [&self.deny, &self.warn] {
            if let Some(rule) = rules
                .iter()
                .find(|rule| texts.iter().any(|text| rule.regex.is_match(text)))
            {
                let verdict = rule.verdict();
                debug!(
                    level = %verdict.level,
                    rule = %rule.id,
                    "Command matched rule"
                );
                return verdict;
            }
        }

        CommandVerdict::allow("no rule matched")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bastion_core::{ErrorKind, HasErrorKind};

    fn posix() -> CommandClassifier {
        CommandClassifier::for_profile(&PlatformProfile::linux())
    }

    fn windows() -> CommandClassifier {
        CommandClassifier::for_profile(&PlatformProfile::windows())
    }

    fn powershell() -> CommandClassifier {
        CommandClassifier::for_profile(&PlatformProfile::windows_powershell())
    }

    fn assert_rule(c: &CommandClassifier, cmd: &str, level: VerdictLevel, rule: &str) {
        let v = c.classify(cmd);
        assert_eq!(v.level, level, "command: {cmd}");
        assert_eq!(v.matched_rule.as_deref(), Some(rule), "command: {cmd}");
    }

    fn assert_allow(c: &CommandClassifier, cmd: &str) {
        let v = c.classify(cmd);
        assert_eq!(v.level, VerdictLevel::Allow, "command: {cmd} -> {v:?}");
        assert!(v.matched_rule.is_none());
    }

    #[test]
    fn test_empty_command_allowed() {
        let v = posix().classify("   ");
        assert_eq!(v.level, VerdictLevel::Allow);
        assert_eq!(v.reason, "empty command");
    }

    #[test]
    fn test_recursive_delete_warns() {
        let c = posix();
        assert_rule(&c, "rm -rf /tmp/build", VerdictLevel::Warn, "recursive-delete");
        assert_rule(&c, "rm -r -f ./target", VerdictLevel::Warn, "recursive-delete");
        assert_rule(&c, "find . -name '*.o' -delete", VerdictLevel::Warn, "recursive-delete");
    }

    #[test]
    fn test_root_wipe_denied() {
        let c = posix();
        for cmd in [
            "rm -rf /",
            "rm -fr /*",
            "rm -r -f /",
            "rm -rf --no-preserve-root /",
            "sudo rm -rf /",
            "rm -rf ~",
            "rm -rf $HOME",
            "cd /tmp; rm -rf /",
        ] {
            assert_rule(&c, cmd, VerdictLevel::Deny, "root-wipe");
        }
    }

    #[test]
    fn test_root_wipe_respellings_denied() {
        let c = posix();
        for cmd in [
            r#"rm -rf "/""#,
            "rm -rf '/'",
            "rm -rf //",
            "rm -rf /.",
            "rm -rf /./",
            "rm -rf /tmp/..",
            r#"rm -rf "$HOME""#,
            "rm -rf '~'/",
            r#"rm -rf "/"*"#,
        ] {
            assert_rule(&c, cmd, VerdictLevel::Deny, "root-wipe");
        }
        assert_rule(&c, r#"rm -rf "/home""#, VerdictLevel::Deny, "delete-all-users");
        assert_rule(&c, r#"rm -rf "/tmp/build""#, VerdictLevel::Warn, "recursive-delete");
    }

    #[test]
    fn test_posix_deny_rules() {
        let c = posix();
        assert_rule(&c, "mkfs.ext4 /dev/sda1", VerdictLevel::Deny, "disk-format");
        assert_rule(&c, "dd if=/dev/zero of=/dev/sda bs=1M", VerdictLevel::Deny, "raw-disk-write");
        assert_rule(&c, "echo x > /dev/nvme0n1", VerdictLevel::Deny, "raw-disk-write");
        assert_rule(&c, ":(){ :|:& };:", VerdictLevel::Deny, "fork-bomb");
        assert_rule(&c, "rm -rf /home", VerdictLevel::Deny, "delete-all-users");
        assert_rule(&c, "rm -rf /Users/*", VerdictLevel::Deny, "delete-all-users");
        assert_rule(&c, "systemctl stop auditd", VerdictLevel::Deny, "disable-auditing");
        assert_rule(&c, "auditctl -e 0", VerdictLevel::Deny, "disable-auditing");
    }

    #[test]
    fn test_posix_warn_rules() {
        let c = posix();
        assert_rule(&c, "sudo apt install jq", VerdictLevel::Warn, "privilege-elevation");
        assert_rule(&c, "chmod 600 key.pem", VerdictLevel::Warn, "permission-change");
        assert_rule(&c, "chown alice:staff file", VerdictLevel::Warn, "ownership-change");
        assert_rule(&c, "systemctl restart nginx", VerdictLevel::Warn, "service-lifecycle");
        assert_rule(&c, "shutdown -h now", VerdictLevel::Warn, "power-state");
        assert_rule(&c, "kill -9 1234", VerdictLevel::Warn, "force-kill");
        assert_rule(&c, "pkill node", VerdictLevel::Warn, "force-kill");
        assert_rule(&c, "git reset --hard HEAD~1", VerdictLevel::Warn, "history-rewrite");
        assert_rule(&c, "git push --force origin main", VerdictLevel::Warn, "history-rewrite");
    }

    #[test]
    fn test_benign_commands_allowed() {
        let c = posix();
        for cmd in [
            "ls -la",
            "git status",
            "git push origin main",
            "cargo build --release",
            "rm file.txt",
            "echo done",
            "grep -r pattern src",
            "cat /etc/hostname",
            "kill 1234",
        ] {
            assert_allow(&c, cmd);
        }
    }

    #[test]
    fn test_deny_beats_warn_in_chain() {
        let c = posix();
        assert_rule(&c, "chmod 777 x && mkfs /dev/sdb", VerdictLevel::Deny, "disk-format");
    }

    #[test]
    fn test_classification_is_deterministic() {
        let c = posix();
        let cmds = ["rm -rf /tmp/build", "ls", "mkfs /dev/sda", "sudo ls"];
        let first: Vec<_> = cmds.iter().map(|cmd| c.classify(cmd)).collect();
        let second: Vec<_> = cmds.iter().map(|cmd| c.classify(cmd)).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_windows_rules_case_insensitive() {
        let c = windows();
        assert_rule(&c, "FORMAT C: /q", VerdictLevel::Deny, "disk-format");
        assert_rule(&c, r"rd /s /q C:\", VerdictLevel::Deny, "root-wipe");
        assert_rule(&c, r"rd /s /q C:\Users", VerdictLevel::Deny, "delete-all-users");
        assert_rule(&c, "wevtutil cl Security", VerdictLevel::Deny, "disable-auditing");
        assert_rule(&c, "bcdedit /set safeboot minimal", VerdictLevel::Deny, "boot-config");
        assert_rule(&c, r"rmdir /S /Q C:\temp\build", VerdictLevel::Warn, "recursive-delete");
        assert_rule(&c, "runas /user:Administrator cmd", VerdictLevel::Warn, "privilege-elevation");
        assert_rule(&c, "icacls file.txt /grant Everyone:F", VerdictLevel::Warn, "permission-change");
        assert_rule(&c, "takeown /f file.txt", VerdictLevel::Warn, "ownership-change");
        assert_rule(&c, "sc stop spooler", VerdictLevel::Warn, "service-lifecycle");
        assert_rule(&c, "shutdown /r /t 0", VerdictLevel::Warn, "power-state");
        assert_rule(&c, r"reg delete HKCU\Software\Foo /f", VerdictLevel::Warn, "registry-delete");
        assert_allow(&c, "dir C:\\Users");
        assert_allow(&c, "icacls file.txt");
    }

    #[test]
    fn test_powershell_subset_only_with_powershell() {
        let cmd = "Set-ExecutionPolicy Unrestricted";
        assert_allow(&windows(), cmd);
        assert_rule(&powershell(), cmd, VerdictLevel::Warn, "execution-policy");

        let c = powershell();
        assert_rule(&c, "Format-Volume -DriveLetter D", VerdictLevel::Deny, "disk-format");
        assert_rule(&c, r"Remove-Item -Recurse -Force C:\", VerdictLevel::Deny, "root-wipe");
        assert_rule(&c, "Clear-EventLog -LogName Security", VerdictLevel::Deny, "disable-auditing");
        assert_rule(&c, r"Remove-Item -Recurse .\build", VerdictLevel::Warn, "recursive-delete");
        assert_rule(&c, "Start-Process pwsh -Verb RunAs", VerdictLevel::Warn, "privilege-elevation");
        assert_rule(&c, "Restart-Service Spooler", VerdictLevel::Warn, "service-lifecycle");
    }

    #[test]
    fn test_posix_rules_case_sensitive() {
        assert_allow(&posix(), "MKFS /dev/sda");
    }

    #[test]
    fn test_extra_rules_appended() {
        let extra_deny = vec![ExtraRule {
            id: "no-curl-pipe".to_string(),
            pattern: r"curl\s.*\|\s*(?:ba)?sh".to_string(),
            reason: "pipes a download into a shell".to_string(),
        }];
        let extra_warn = vec![ExtraRule {
            id: "npm-publish".to_string(),
            pattern: r"\bnpm\s+publish\b".to_string(),
            reason: String::new(),
        }];
        let c = CommandClassifier::with_extra_rules(
            &PlatformProfile::linux(),
            &extra_deny,
            &extra_warn,
        )
        .unwrap();

        assert_rule(&c, "curl https://x.sh | sh", VerdictLevel::Deny, "no-curl-pipe");
        assert_rule(&c, "npm publish", VerdictLevel::Warn, "npm-publish");
        assert_eq!(c.classify("npm publish").reason, "matched rule 'npm-publish'");
        // Built-ins still win first within the tier.
        assert_rule(&c, "rm -rf /tmp/x", VerdictLevel::Warn, "recursive-delete");

        let (deny, warn) = c.rule_counts();
        let (base_deny, base_warn) = posix().rule_counts();
        assert_eq!(deny, base_deny + 1);
        assert_eq!(warn, base_warn + 1);
    }

    #[test]
    fn test_invalid_extra_rule_fails_construction() {
        let bad = vec![ExtraRule {
            id: "broken".to_string(),
            pattern: "(unclosed".to_string(),
            reason: String::new(),
        }];
        let err = CommandClassifier::with_extra_rules(&PlatformProfile::linux(), &bad, &[])
            .unwrap_err();
        assert!(matches!(err, ClassifierError::InvalidPattern { .. }));
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);

        let nameless = vec![ExtraRule {
            id: " ".to_string(),
            pattern: "x".to_string(),
            reason: String::new(),
        }];
        let err = CommandClassifier::with_extra_rules(&PlatformProfile::linux(), &[], &nameless)
            .unwrap_err();
        assert!(matches!(err, ClassifierError::EmptyRuleId));
    }

    #[test]
    fn test_verdict_serializes_snake_case() {
        let v = posix().classify("rm -rf /tmp/build");
        let json = serde_json::to_value(&v).unwrap();
        assert_eq!(json["level"], "warn");
        assert_eq!(json["matched_rule"], "recursive-delete");
    }
}
