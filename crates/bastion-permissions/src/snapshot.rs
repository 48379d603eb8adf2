//! Normalized permission snapshots.

use std::fs::Metadata;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

/// What kind of filesystem entry a snapshot describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    /// Regular file.
    File,
    /// Directory.
    Directory,
    /// Symbolic link (not followed).
    Symlink,
    /// Device, socket, FIFO.
    Other,
}

impl EntryKind {
    fn from_metadata(meta: &Metadata) -> Self {
        let ft = meta.file_type();
        if ft.is_symlink() {
            Self::Symlink
        } else if ft.is_dir() {
            Self::Directory
        } else if ft.is_file() {
            Self::File
        } else {
            Self::Other
        }
    }

    fn type_char(self) -> char {
        match self {
            Self::File => '-',
            Self::Directory => 'd',
            Self::Symlink => 'l',
            Self::Other => '?',
        }
    }
}

/// Owner access in the normalized view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct AccessBits {
    /// Owner may read.
    pub read: bool,
    /// Owner may write.
    pub write: bool,
    /// Owner may execute (or traverse a directory).
    pub execute: bool,
}

/// POSIX raw fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PosixDetails {
    /// Mode bits (`0o7777` mask).
    pub mode: u32,
    /// Mode as a four-digit octal string.
    pub octal: String,
    /// `ls -l` style symbolic mode.
    pub symbolic: String,
    /// Owning user id.
    pub uid: u32,
    /// Owning group id.
    pub gid: u32,
    /// Owning user name, when resolvable.
    pub owner: Option<String>,
    /// Owning group name, when resolvable.
    pub group: Option<String>,
}

/// Windows raw fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WindowsDetails {
    /// Raw `FILE_ATTRIBUTE_*` bits.
    pub attributes: u32,
    /// `FILE_ATTRIBUTE_READONLY`.
    pub readonly: bool,
    /// `FILE_ATTRIBUTE_HIDDEN`.
    pub hidden: bool,
    /// `FILE_ATTRIBUTE_SYSTEM`.
    pub system: bool,
    /// `FILE_ATTRIBUTE_ARCHIVE`.
    pub archive: bool,
}

impl WindowsDetails {
    const READONLY: u32 = 0x1;
    const HIDDEN: u32 = 0x2;
    const SYSTEM: u32 = 0x4;
    const ARCHIVE: u32 = 0x20;

    /// Decode raw attribute bits.
    #[must_use]
    pub fn from_attributes(attributes: u32) -> Self {
        Self {
            attributes,
            readonly: attributes & Self::READONLY != 0,
            hidden: attributes & Self::HIDDEN != 0,
            system: attributes & Self::SYSTEM != 0,
            archive: attributes & Self::ARCHIVE != 0,
        }
    }
}

/// Permission state of one path: normalized fields plus platform raw fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PermissionSnapshot {
    /// Inspected path.
    pub path: PathBuf,
    /// Entry kind.
    pub kind: EntryKind,
    /// Size in bytes.
    pub size: u64,
    /// Whether the entry is read-only for its owner.
    pub readonly: bool,
    /// Owner access.
    pub owner_access: AccessBits,
    /// Last modification time.
    pub modified: Option<DateTime<Utc>>,
    /// POSIX raw fields.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub posix: Option<PosixDetails>,
    /// Windows raw fields.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub windows: Option<WindowsDetails>,
}

impl PermissionSnapshot {
    /// Build a snapshot from metadata read without following symlinks.
    #[must_use]
    pub fn from_metadata(path: &Path, meta: &Metadata) -> Self {
        let kind = EntryKind::from_metadata(meta);
        let modified = meta.modified().ok().map(DateTime::<Utc>::from);
        let readonly = meta.permissions().readonly();

        let mut snapshot = Self {
            path: path.to_path_buf(),
            kind,
            size: meta.len(),
            readonly,
            owner_access: AccessBits {
                read: true,
                write: !readonly,
                execute: kind == EntryKind::Directory,
            },
            modified,
            posix: None,
            windows: None,
        };
        fill_platform_fields(&mut snapshot, meta);
        snapshot
    }
}

#[cfg(unix)]
fn fill_platform_fields(snapshot: &mut PermissionSnapshot, meta: &Metadata) {
    use nix::unistd::{Gid, Group, Uid, User};
    use std::os::unix::fs::MetadataExt;

    let mode = meta.mode() & 0o7777;
    let uid = meta.uid();
    let gid = meta.gid();

    snapshot.owner_access = AccessBits {
        read: mode & 0o400 != 0,
        write: mode & 0o200 != 0,
        execute: mode & 0o100 != 0,
    };
    snapshot.readonly = mode & 0o200 == 0;
    snapshot.posix = Some(PosixDetails {
        mode,
        octal: format!("{mode:04o}"),
        symbolic: symbolic_mode(mode, snapshot.kind),
        uid,
        gid,
        owner: User::from_uid(Uid::from_raw(uid))
            .ok()
            .flatten()
            .map(|u| u.name),
        group: Group::from_gid(Gid::from_raw(gid))
            .ok()
            .flatten()
            .map(|g| g.name),
    });
}

#[cfg(windows)]
fn fill_platform_fields(snapshot: &mut PermissionSnapshot, meta: &Metadata) {
    use std::os::windows::fs::MetadataExt;

    let details = WindowsDetails::from_attributes(meta.file_attributes());
    snapshot.readonly = details.readonly;
    snapshot.owner_access.write = !details.readonly;
    snapshot.owner_access.execute = snapshot.kind == EntryKind::Directory
        || snapshot
            .path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| {
                matches!(
                    e.to_ascii_lowercase().as_str(),
                    "exe" | "bat" | "cmd" | "com" | "ps1"
                )
            });
    snapshot.windows = Some(details);
}

#[cfg(not(any(unix, windows)))]
fn fill_platform_fields(_snapshot: &mut PermissionSnapshot, _meta: &Metadata) {}

/// Render mode bits the way `ls -l` does (`drwxr-xr-x`, `-rwsr-xr-T`).
#[must_use]
pub fn symbolic_mode(mode: u32, kind: EntryKind) -> String {
    let mut out = String::with_capacity(10);
    out.push(kind.type_char());

    // (read, write, execute, special bit, special char when exec set / unset)
    let triads = [
        (0o400, 0o200, 0o100, 0o4000, 's', 'S'),
        (0o040, 0o020, 0o010, 0o2000, 's', 'S'),
        (0o004, 0o002, 0o001, 0o1000, 't', 'T'),
    ];
    for (r, w, x, special, set, unset) in triads {
        out.push(if mode & r != 0 { 'r' } else { '-' });
        out.push(if mode & w != 0 { 'w' } else { '-' });
        let exec = mode & x != 0;
        out.push(match (mode & special != 0, exec) {
            (true, true) => set,
            (true, false) => unset,
            (false, true) => 'x',
            (false, false) => '-',
        });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbolic_mode() {
        assert_eq!(symbolic_mode(0o755, EntryKind::Directory), "drwxr-xr-x");
        assert_eq!(symbolic_mode(0o644, EntryKind::File), "-rw-r--r--");
        assert_eq!(symbolic_mode(0o4755, EntryKind::File), "-rwsr-xr-x");
        assert_eq!(symbolic_mode(0o2750, EntryKind::Directory), "drwxr-s---");
        assert_eq!(symbolic_mode(0o1776, EntryKind::Directory), "drwxrwxrwT");
        assert_eq!(symbolic_mode(0o000, EntryKind::File), "----------");
    }

    #[test]
    fn test_windows_attribute_decoding() {
        let d = WindowsDetails::from_attributes(0x1 | 0x20);
        assert!(d.readonly);
        assert!(!d.hidden);
        assert!(!d.system);
        assert!(d.archive);
    }

    #[cfg(unix)]
    #[test]
    fn test_snapshot_of_file() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("notes.txt");
        std::fs::write(&file, "hello").unwrap();
        std::fs::set_permissions(&file, std::fs::Permissions::from_mode(0o640)).unwrap();

        let meta = std::fs::symlink_metadata(&file).unwrap();
        let snap = PermissionSnapshot::from_metadata(&file, &meta);
        assert_eq!(snap.kind, EntryKind::File);
        assert_eq!(snap.size, 5);
        assert!(!snap.readonly);
        assert!(snap.owner_access.read && snap.owner_access.write);
        assert!(!snap.owner_access.execute);
        assert!(snap.modified.is_some());

        let posix = snap.posix.as_ref().unwrap();
        assert_eq!(posix.octal, "0640");
        assert_eq!(posix.symbolic, "-rw-r-----");
        assert!(snap.windows.is_none());

        let json = serde_json::to_value(&snap).unwrap();
        assert_eq!(json["kind"], "file");
        assert!(json.get("windows").is_none());
    }
}
