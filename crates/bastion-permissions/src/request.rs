//! Permission requests and the pure planner that maps them onto
//! platform sub-operations.

use std::fmt;

use bastion_core::{PermissionModel, PlatformProfile};
use serde::{Deserialize, Serialize};

use crate::error::{PermissionError, PermissionResult};

/// Highest valid POSIX mode (permission bits plus setuid/setgid/sticky).
pub const MAX_MODE: u32 = 0o7777;

/// A permission change, in the vocabulary of one platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PermissionRequest {
    /// POSIX numeric mode.
    Mode {
        /// Mode bits, `0..=0o7777`.
        mode: u32,
    },
    /// Windows attribute toggles and ACL entries.
    Windows(WindowsDelta),
}

impl PermissionRequest {
    /// Parse an octal mode string (`755`, `0755`, `0o755`).
    ///
    /// # Errors
    ///
    /// Returns [`PermissionError::UnparsableMode`] for non-octal input and
    /// [`PermissionError::InvalidMode`] above `0o7777`.
    pub fn parse_mode(input: &str) -> PermissionResult<Self> {
        let trimmed = input.trim();
        let digits = trimmed
            .strip_prefix("0o")
            .or_else(|| trimmed.strip_prefix("0O"))
            .unwrap_or(trimmed);
        let mode = u32::from_str_radix(digits, 8)
            .map_err(|_| PermissionError::UnparsableMode(input.to_string()))?;
        if mode > MAX_MODE {
            return Err(PermissionError::InvalidMode(mode));
        }
        Ok(Self::Mode { mode })
    }

    fn shape(&self) -> &'static str {
        match self {
            Self::Mode { .. } => "mode",
            Self::Windows(_) => "windows attribute/ACL",
        }
    }
}

/// Windows attribute toggles plus optional ACL grants and denies.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowsDelta {
    /// Set or clear the readonly attribute.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub readonly: Option<bool>,
    /// Set or clear the hidden attribute.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hidden: Option<bool>,
    /// Set or clear the system attribute.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<bool>,
    /// ACL entries to grant.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub grant: Vec<AclEntry>,
    /// ACL entries to deny.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deny: Vec<AclEntry>,
}

impl WindowsDelta {
    /// Check if the delta changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.readonly.is_none()
            && self.hidden.is_none()
            && self.system.is_none()
            && self.grant.is_empty()
            && self.deny.is_empty()
    }
}

/// One ACL entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AclEntry {
    /// User, group or SID (`*S-1-5-32-545`).
    pub principal: String,
    /// Rights granted or denied.
    pub rights: AclRights,
}

/// Simple ACL rights, as accepted by `icacls`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AclRights {
    /// `R`
    Read,
    /// `W`
    Write,
    /// `RX`
    ReadExecute,
    /// `M`
    Modify,
    /// `F`
    FullControl,
}

impl AclRights {
    /// `icacls` short code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Read => "R",
            Self::Write => "W",
            Self::ReadExecute => "RX",
            Self::Modify => "M",
            Self::FullControl => "F",
        }
    }
}

/// File attribute toggled by a Windows delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileAttribute {
    /// `R`
    Readonly,
    /// `H`
    Hidden,
    /// `S`
    System,
}

impl FileAttribute {
    /// `attrib` flag letter.
    #[must_use]
    pub fn flag(&self) -> char {
        match self {
            Self::Readonly => 'R',
            Self::Hidden => 'H',
            Self::System => 'S',
        }
    }
}

/// One platform sub-operation, reported individually.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum PermissionOp {
    /// Set POSIX mode bits.
    SetMode {
        /// Mode bits.
        mode: u32,
    },
    /// Set or clear a file attribute.
    SetAttribute {
        /// Attribute.
        attribute: FileAttribute,
        /// Target state.
        enabled: bool,
    },
    /// Grant an ACL entry.
    Grant(AclEntry),
    /// Deny an ACL entry.
    Deny(AclEntry),
}

impl fmt::Display for PermissionOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SetMode { mode } => write!(f, "chmod {mode:04o}"),
            Self::SetAttribute { attribute, enabled } => {
                let sign = if *enabled { '+' } else { '-' };
                write!(f, "attrib {sign}{}", attribute.flag())
            },
            Self::Grant(entry) => write!(f, "grant {}:({})", entry.principal, entry.rights.code()),
            Self::Deny(entry) => write!(f, "deny {}:({})", entry.principal, entry.rights.code()),
        }
    }
}

/// Plan a request into sub-operations for a profile.
///
/// Pure: no filesystem access, so Windows plans are testable anywhere.
///
/// # Errors
///
/// - [`PermissionError::Unsupported`] when the request shape does not match
///   the profile's permission model
/// - [`PermissionError::InvalidMode`], [`PermissionError::EmptyDelta`] or
///   [`PermissionError::InvalidPrincipal`] for malformed requests
pub fn plan(
    request: &PermissionRequest,
    profile: &PlatformProfile,
) -> PermissionResult<Vec<PermissionOp>> {
    match (request, profile.permission_model) {
        (PermissionRequest::Mode { mode }, PermissionModel::ModeBits) => {
            if *mode > MAX_MODE {
                return Err(PermissionError::InvalidMode(*mode));
            }
            Ok(vec![PermissionOp::SetMode { mode: *mode }])
        },
        (PermissionRequest::Windows(delta), PermissionModel::AclAttributes) => plan_windows(delta),
        (request, model) => Err(PermissionError::Unsupported {
            request: request.shape(),
            model,
        }),
    }
}

fn plan_windows(delta: &WindowsDelta) -> PermissionResult<Vec<PermissionOp>> {
    if delta.is_empty() {
        return Err(PermissionError::EmptyDelta);
    }

    let mut ops = Vec::new();
    for (attribute, value) in [
        (FileAttribute::Readonly, delta.readonly),
        (FileAttribute::Hidden, delta.hidden),
        (FileAttribute::System, delta.system),
    ] {
        if let Some(enabled) = value {
            ops.push(PermissionOp::SetAttribute { attribute, enabled });
        }
    }
    for entry in &delta.grant {
        validate_principal(&entry.principal)?;
        ops.push(PermissionOp::Grant(entry.clone()));
    }
    for entry in &delta.deny {
        validate_principal(&entry.principal)?;
        ops.push(PermissionOp::Deny(entry.clone()));
    }
    Ok(ops)
}

fn validate_principal(principal: &str) -> PermissionResult<()> {
    let bad = principal.trim().is_empty()
        || principal
            .chars()
            .any(|c| c.is_control() || matches!(c, ':' | '"' | '(' | ')' | '/'));
    if bad {
        return Err(PermissionError::InvalidPrincipal(principal.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bastion_core::{ErrorKind, HasErrorKind};

    fn entry(principal: &str, rights: AclRights) -> AclEntry {
        AclEntry {
            principal: principal.to_string(),
            rights,
        }
    }

    #[test]
    fn test_mode_plan_on_posix() {
        let ops = plan(&PermissionRequest::Mode { mode: 0o755 }, &PlatformProfile::linux()).unwrap();
        assert_eq!(ops, vec![PermissionOp::SetMode { mode: 0o755 }]);
        assert_eq!(ops[0].to_string(), "chmod 0755");
    }

    #[test]
    fn test_mode_out_of_range() {
        let err = plan(&PermissionRequest::Mode { mode: 0o10000 }, &PlatformProfile::linux())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_windows_plan_order() {
        let delta = WindowsDelta {
            readonly: Some(true),
            hidden: Some(false),
            system: None,
            grant: vec![entry("Users", AclRights::ReadExecute)],
            deny: vec![entry("Guest", AclRights::Write)],
        };
        let ops = plan(&PermissionRequest::Windows(delta), &PlatformProfile::windows()).unwrap();
        let rendered: Vec<String> = ops.iter().map(ToString::to_string).collect();
        assert_eq!(
            rendered,
            ["attrib +R", "attrib -H", "grant Users:(RX)", "deny Guest:(W)"]
        );
    }

    #[test]
    fn test_model_mismatch_is_unsupported() {
        let err = plan(&PermissionRequest::Mode { mode: 0o644 }, &PlatformProfile::windows())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PlatformUnsupported);

        let delta = WindowsDelta {
            readonly: Some(true),
            ..WindowsDelta::default()
        };
        let err = plan(&PermissionRequest::Windows(delta), &PlatformProfile::linux()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PlatformUnsupported);
    }

    #[test]
    fn test_empty_delta_rejected() {
        let err = plan(
            &PermissionRequest::Windows(WindowsDelta::default()),
            &PlatformProfile::windows(),
        )
        .unwrap_err();
        assert!(matches!(err, PermissionError::EmptyDelta));
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_bad_principal_rejected() {
        for principal in ["", "a:b", "x\"y", "evil /t"] {
            let delta = WindowsDelta {
                grant: vec![entry(principal, AclRights::Read)],
                ..WindowsDelta::default()
            };
            let err = plan(&PermissionRequest::Windows(delta), &PlatformProfile::windows())
                .unwrap_err();
            assert!(matches!(err, PermissionError::InvalidPrincipal(_)), "{principal}");
        }
        let delta = WindowsDelta {
            grant: vec![entry(r"DOMAIN\alice", AclRights::Modify)],
            ..WindowsDelta::default()
        };
        assert!(plan(&PermissionRequest::Windows(delta), &PlatformProfile::windows()).is_ok());
    }

    #[test]
    fn test_parse_mode() {
        assert_eq!(
            PermissionRequest::parse_mode("755").unwrap(),
            PermissionRequest::Mode { mode: 0o755 }
        );
        assert_eq!(
            PermissionRequest::parse_mode("0o4755").unwrap(),
            PermissionRequest::Mode { mode: 0o4755 }
        );
        assert!(matches!(
            PermissionRequest::parse_mode("rwx"),
            Err(PermissionError::UnparsableMode(_))
        ));
        assert!(matches!(
            PermissionRequest::parse_mode("17777"),
            Err(PermissionError::InvalidMode(_))
        ));
    }

    #[test]
    fn test_request_json_shape() {
        let req: PermissionRequest =
            serde_json::from_str(r#"{"type":"mode","mode":420}"#).unwrap();
        assert_eq!(req, PermissionRequest::Mode { mode: 0o644 });

        let req: PermissionRequest = serde_json::from_str(
            r#"{"type":"windows","readonly":true,"grant":[{"principal":"Users","rights":"read"}]}"#,
        )
        .unwrap();
        let PermissionRequest::Windows(delta) = req else {
            panic!("expected windows delta");
        };
        assert_eq!(delta.readonly, Some(true));
        assert_eq!(delta.grant[0].rights, AclRights::Read);
    }
}
