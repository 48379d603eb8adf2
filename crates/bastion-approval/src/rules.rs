//! Built-in command rule tables.
//!
//! Each table is an ordered list of `(id, tier, pattern, reason)`. Patterns
//! are regular expressions matched against every command segment and the
//! whole command string. Order matters: within a tier, the first rule that
//! matches wins.
//!
//! | Table | Used when |
//! |-------|-----------|
//! | [`POSIX_RULES`] | posix-like profiles |
//! | [`WINDOWS_RULES`] | windows-like profiles |
//! | [`POWERSHELL_RULES`] | appended when the shell is PowerShell |

use bastion_core::{PlatformProfile, ShellKind};
use serde::{Deserialize, Serialize};

/// Rule tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleTier {
    /// Never run.
    Deny,
    /// Run only with explicit confirmation.
    Warn,
}

/// A built-in classification rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandRule {
    /// Stable identifier reported in verdicts.
    pub id: &'static str,
    /// Tier the rule assigns.
    pub tier: RuleTier,
    /// Regular expression over the command text.
    pub pattern: &'static str,
    /// Human-readable reason.
    pub reason: &'static str,
}

/// A rule supplied by configuration, appended after built-ins of its tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtraRule {
    /// Stable identifier reported in verdicts.
    pub id: String,
    /// Regular expression over the command text.
    pub pattern: String,
    /// Human-readable reason.
    #[serde(default)]
    pub reason: String,
}

const fn deny(id: &'static str, pattern: &'static str, reason: &'static str) -> CommandRule {
    CommandRule {
        id,
        tier: RuleTier::Deny,
        pattern,
        reason,
    }
}

const fn warn(id: &'static str, pattern: &'static str, reason: &'static str) -> CommandRule {
    CommandRule {
        id,
        tier: RuleTier::Warn,
        pattern,
        reason,
    }
}

/// Rules for `sh`-style shells.
pub const POSIX_RULES: &[CommandRule] = &[
    deny(
        "root-wipe",
        r"\brm\s+(?:-\S+\s+)*?(?:-[a-zA-Z]*[rR][a-zA-Z]*|--recursive)\s+(?:-\S+\s+)*(?:/\*?|~/?\*?|\$HOME/?\*?|\$\{HOME\}/?\*?)(?:\s|$)",
        "recursive deletion of the filesystem root or home directory",
    ),
    deny(
        "disk-format",
        r"\b(?:mkfs(?:\.\w+)?|mke2fs|mkswap|wipefs|newfs(?:_\w+)?)\b|\bdiskutil\s+(?:erase\w*|zeroDisk|partitionDisk)\b",
        "formats or wipes a filesystem",
    ),
    deny(
        "raw-disk-write",
        r"(?:\bdd\b.*\bof=|>\s*|\bshred\b.*\s)/dev/(?:sd[a-z]|hd[a-z]|vd[a-z]|xvd[a-z]|nvme\d|mmcblk\d|r?disk\d)",
        "writes directly to a block device",
    ),
    deny(
        "fork-bomb",
        r":\s*\(\s*\)\s*\{\s*:\s*\|\s*:\s*&\s*\}",
        "fork bomb",
    ),
    deny(
        "delete-all-users",
        r"\brm\s+(?:-\S+\s+)*?(?:-[a-zA-Z]*[rR][a-zA-Z]*|--recursive)\s+(?:-\S+\s+)*(?:/home|/Users)/?\*?(?:\s|$)",
        "recursive deletion of every user's home directory",
    ),
    deny(
        "disable-auditing",
        r"\bauditctl\s+(?:-e\s*0|-D)\b|\b(?:systemctl\s+(?:stop|disable|mask)\s+auditd|service\s+auditd\s+stop)\b|\bsetenforce\s+0\b|\bunset\s+HISTFILE\b|\bhistory\s+-c\b",
        "disables auditing or erases the audit trail",
    ),
    warn(
        "recursive-delete",
        r"\brm\s+(?:-\S+\s+)*?(?:-[a-zA-Z]*[rR][a-zA-Z]*|--recursive)\b|\bfind\b.*\s-delete\b",
        "recursive deletion",
    ),
    warn(
        "privilege-elevation",
        r"\b(?:sudo|doas|pkexec)\b|(?:^|\s)su(?:\s|$)",
        "runs with elevated privileges",
    ),
    warn(
        "permission-change",
        r"\b(?:chmod|setfacl|chattr)\b",
        "changes file permissions",
    ),
    warn(
        "ownership-change",
        r"\bch(?:own|grp)\b",
        "changes file ownership",
    ),
    warn(
        "service-lifecycle",
        r"\bsystemctl\s+(?:start|stop|restart|reload|enable|disable|mask|unmask|kill)\b|\bservice\s+\S+\s+(?:start|stop|restart|reload)\b|\blaunchctl\s+(?:load|unload|bootout|bootstrap|kickstart|start|stop|remove)\b",
        "starts, stops or reconfigures a system service",
    ),
    warn(
        "power-state",
        r"\b(?:shutdown|reboot|poweroff|halt)\b|\binit\s+[06]\b|\bsystemctl\s+(?:poweroff|reboot|halt|suspend|hibernate)\b",
        "changes the machine power state",
    ),
    warn(
        "force-kill",
        r"\bkill\s+(?:-\S+\s+)*?(?:-9|-KILL|-SIGKILL|-s\s+(?:9|KILL|SIGKILL))\b|\b(?:killall|pkill)\b",
        "forcibly terminates processes",
    ),
    warn(
        "history-rewrite",
        r"\bgit\s+(?:reset\s+--hard|clean\s+-\S*[fdx]|push\s+(?:.*\s)?(?:--force(?:-with-lease)?|-f)\b|rebase\b|filter-branch\b|filter-repo\b|reflog\s+expire\b|branch\s+-D\b)",
        "rewrites or discards version control history",
    ),
];

/// Rules for `cmd.exe`. Matched case-insensitively.
pub const WINDOWS_RULES: &[CommandRule] = &[
    deny(
        "disk-format",
        r"\bformat(?:\.com)?\s+[a-z]:|\bdiskpart\b",
        "formats a volume or edits partitions",
    ),
    deny(
        "root-wipe",
        r"\b(?:rd|rmdir|del|erase)\s+(?:/\w\s+)*/s\s+(?:/\w\s+)*[a-z]:\\?(?:\*(?:\.\*)?)?(?:\s|$)|\b(?:rd|rmdir|del|erase)\s+[a-z]:\\?(?:\*(?:\.\*)?)?\s+(?:/\w\s*)*/s\b",
        "recursive deletion of a drive root",
    ),
    deny(
        "delete-all-users",
        r"\b(?:rd|rmdir|del|erase)\s+(?:/\w\s+)*/s\s+(?:/\w\s+)*[a-z]:\\users\\?(?:\*(?:\.\*)?)?(?:\s|$)|\b(?:rd|rmdir|del|erase)\s+[a-z]:\\users\\?(?:\*(?:\.\*)?)?\s+(?:/\w\s*)*/s\b",
        "recursive deletion of every user profile",
    ),
    deny(
        "disable-auditing",
        r"\bauditpol\b.*\s/(?:clear|remove)\b|\bauditpol\b.*\s/set\b.*disable|\bwevtutil(?:\.exe)?\s+(?:cl|clear-log)\b|\b(?:sc(?:\.exe)?\s+(?:stop|config)|net\s+stop)\s+eventlog\b",
        "disables auditing or clears event logs",
    ),
    deny(
        "boot-config",
        r"\b(?:bcdedit|bootrec|bcdboot)(?:\.exe)?\b",
        "modifies boot configuration",
    ),
    warn(
        "recursive-delete",
        r"\b(?:rd|rmdir|del|erase)\b.*\s/s\b",
        "recursive deletion",
    ),
    warn(
        "privilege-elevation",
        r"\b(?:runas|gsudo|sudo)(?:\.exe)?\b",
        "runs with elevated privileges",
    ),
    warn(
        "permission-change",
        r"\b(?:icacls|cacls|xcacls)(?:\.exe)?\b.*\s/(?:grant|deny|remove|reset|setintegritylevel)\b|\battrib(?:\.exe)?\b.*\s[+-][rahsi]\b",
        "changes file permissions or attributes",
    ),
    warn(
        "ownership-change",
        r"\btakeown(?:\.exe)?\b|\bicacls(?:\.exe)?\b.*\s/setowner\b",
        "changes file ownership",
    ),
    warn(
        "service-lifecycle",
        r"\bsc(?:\.exe)?\s+(?:start|stop|config|delete|create|pause)\b|\bnet\s+(?:start|stop|pause)\b",
        "starts, stops or reconfigures a system service",
    ),
    warn(
        "power-state",
        r"\bshutdown(?:\.exe)?\b",
        "changes the machine power state",
    ),
    warn(
        "registry-delete",
        r"\breg(?:\.exe)?\s+delete\b",
        "deletes registry keys or values",
    ),
];

/// Rules for PowerShell, appended after [`WINDOWS_RULES`]. Matched
/// case-insensitively.
pub const POWERSHELL_RULES: &[CommandRule] = &[
    deny(
        "disk-format",
        r"\b(?:Format-Volume|Clear-Disk|Initialize-Disk)\b",
        "formats or wipes a disk",
    ),
    deny(
        "root-wipe",
        r"\b(?:Remove-Item|ri|rm|del|rd|rmdir)\b.*\s-r(?:ecurse)?\b.*\s[a-z]:\\?\*?(?:\s|$)|\b(?:Remove-Item|ri|rm|del|rd|rmdir)\s+(?:-\w+\s+)*[a-z]:\\?\*?\s+.*-r(?:ecurse)?\b",
        "recursive deletion of a drive root",
    ),
    deny(
        "disable-auditing",
        r"\b(?:Clear-EventLog|Remove-EventLog)\b|\bSet-MpPreference\b.*-Disable\w+\s+\$?true\b|\b(?:Stop|Set)-Service\b.*\bEventLog\b",
        "disables auditing, logging or endpoint protection",
    ),
    warn(
        "recursive-delete",
        r"\b(?:Remove-Item|ri|rm|del|rd|rmdir)\b.*\s-r(?:ecurse)?\b",
        "recursive deletion",
    ),
    warn(
        "privilege-elevation",
        r#"\bStart-Process\b.*-Verb\s+['"]?RunAs\b"#,
        "runs with elevated privileges",
    ),
    warn(
        "execution-policy",
        r"\bSet-ExecutionPolicy\b|-ExecutionPolicy\s+(?:Bypass|Unrestricted)\b",
        "weakens the script execution policy",
    ),
    warn(
        "service-lifecycle",
        r"\b(?:Start|Stop|Restart|Suspend|Resume|Set|New|Remove)-Service\b",
        "starts, stops or reconfigures a system service",
    ),
];

/// Built-in rules for a profile, in evaluation order.
#[must_use]
pub fn builtin_rules(profile: &PlatformProfile) -> Vec<&'static CommandRule> {
    if !profile.is_windows() {
        return POSIX_RULES.iter().collect();
    }
    let mut rules: Vec<&'static CommandRule> = WINDOWS_RULES.iter().collect();
    if profile.shell.kind == ShellKind::PowerShell {
        rules.extend(POWERSHELL_RULES.iter());
    }
    rules
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::RegexBuilder;
    use std::collections::HashSet;

    fn ids(table: &[CommandRule], tier: RuleTier) -> Vec<&'static str> {
        table
            .iter()
            .filter(|r| r.tier == tier)
            .map(|r| r.id)
            .collect()
    }

    #[test]
    fn test_all_patterns_compile() {
        for rule in POSIX_RULES
            .iter()
            .chain(WINDOWS_RULES)
            .chain(POWERSHELL_RULES)
        {
            assert!(
                RegexBuilder::new(rule.pattern).build().is_ok(),
                "rule {} does not compile",
                rule.id
            );
            assert!(!rule.reason.is_empty());
        }
    }

    #[test]
    fn test_ids_unique_per_table() {
        for table in [POSIX_RULES, WINDOWS_RULES, POWERSHELL_RULES] {
            let unique: HashSet<_> = table.iter().map(|r| r.id).collect();
            assert_eq!(unique.len(), table.len());
        }
    }

    #[test]
    fn test_posix_rule_ids() {
        assert_eq!(
            ids(POSIX_RULES, RuleTier::Deny),
            [
                "root-wipe",
                "disk-format",
                "raw-disk-write",
                "fork-bomb",
                "delete-all-users",
                "disable-auditing"
            ]
        );
        assert_eq!(
            ids(POSIX_RULES, RuleTier::Warn),
            [
                "recursive-delete",
                "privilege-elevation",
                "permission-change",
                "ownership-change",
                "service-lifecycle",
                "power-state",
                "force-kill",
                "history-rewrite"
            ]
        );
    }

    #[test]
    fn test_windows_rule_ids() {
        assert_eq!(
            ids(WINDOWS_RULES, RuleTier::Deny),
            [
                "disk-format",
                "root-wipe",
                "delete-all-users",
                "disable-auditing",
                "boot-config"
            ]
        );
        assert_eq!(
            ids(WINDOWS_RULES, RuleTier::Warn),
            [
                "recursive-delete",
                "privilege-elevation",
                "permission-change",
                "ownership-change",
                "service-lifecycle",
                "power-state",
                "registry-delete"
            ]
        );
    }

    #[test]
    fn test_powershell_rule_ids() {
        assert_eq!(
            ids(POWERSHELL_RULES, RuleTier::Deny),
            ["disk-format", "root-wipe", "disable-auditing"]
        );
        assert_eq!(
            ids(POWERSHELL_RULES, RuleTier::Warn),
            [
                "recursive-delete",
                "privilege-elevation",
                "execution-policy",
                "service-lifecycle"
            ]
        );
    }

    #[test]
    fn test_builtin_rules_per_profile() {
        assert_eq!(
            builtin_rules(&PlatformProfile::linux()).len(),
            POSIX_RULES.len()
        );
        assert_eq!(
            builtin_rules(&PlatformProfile::windows()).len(),
            WINDOWS_RULES.len()
        );
        assert_eq!(
            builtin_rules(&PlatformProfile::windows_powershell()).len(),
            WINDOWS_RULES.len() + POWERSHELL_RULES.len()
        );
    }
}
