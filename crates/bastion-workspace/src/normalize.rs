//! Lexical normalization, path-form detection and real-path resolution.

use std::io;
use std::path::{Component, Path, PathBuf};

/// Symlink hops followed before giving up (matches Linux `MAXSYMLINKS`).
const MAX_SYMLINK_HOPS: usize = 40;

/// Collapse `.` and `..` segments without touching the filesystem.
///
/// A `..` above the root clamps at the root, so `/a/../../b` becomes `/b`.
#[must_use]
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir | Component::Normal(_) => {
                out.push(component.as_os_str());
            },
            Component::CurDir => {},
            Component::ParentDir => {
                if matches!(out.components().next_back(), Some(Component::Normal(_))) {
                    out.pop();
                } else if !out.has_root() {
                    out.push("..");
                }
            },
        }
    }
    out
}

/// Whether `path` equals `root` or descends from it, compared per component.
///
/// `/home/alice2` is not within `/home/alice`.
#[must_use]
pub fn is_within(path: &Path, root: &Path, case_insensitive: bool) -> bool {
    let mut path_components = path.components();
    for root_component in root.components() {
        let Some(path_component) = path_components.next() else {
            return false;
        };
        if !component_eq(root_component, path_component, case_insensitive) {
            return false;
        }
    }
    true
}

fn component_eq(a: Component<'_>, b: Component<'_>, case_insensitive: bool) -> bool {
    if case_insensitive {
        a.as_os_str().to_string_lossy().to_lowercase()
            == b.as_os_str().to_string_lossy().to_lowercase()
    } else {
        a == b
    }
}

/// Detect UNC, device and explicit long-path forms in raw input.
pub(crate) fn detect_special_form(input: &str) -> Option<&'static str> {
    let unified = input.replace('/', "\\");
    if unified.starts_with("\\\\?\\") {
        Some("long-path")
    } else if unified.starts_with("\\\\.\\") {
        Some("device")
    } else if unified.starts_with("\\\\") {
        Some("unc")
    } else {
        None
    }
}

/// Strip a verbatim prefix when it wraps an ordinary drive or UNC path.
///
/// `\\?\C:\x` becomes `C:\x`, `\\?\UNC\srv\share` becomes `\\srv\share`.
/// Anything else is returned unchanged.
pub(crate) fn strip_verbatim(input: &str) -> String {
    if let Some(rest) = input.strip_prefix("\\\\?\\") {
        if let Some(unc) = rest.strip_prefix("UNC\\") {
            return format!("\\\\{unc}");
        }
        let bytes = rest.as_bytes();
        if bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' {
            return rest.to_string();
        }
    }
    input.to_string()
}

/// Resolve symlinks along `path`, tolerating a non-existent tail.
///
/// The deepest existing ancestor is canonicalized and the missing remainder
/// re-appended. A dangling symlink is followed through its target so it
/// cannot be used to create a file outside the root.
///
/// `path` must be absolute and lexically normalized.
pub(crate) fn real_path(path: &Path) -> io::Result<PathBuf> {
    real_path_inner(path, 0)
}

fn real_path_inner(path: &Path, hops: usize) -> io::Result<PathBuf> {
    if hops > MAX_SYMLINK_HOPS {
        return Err(io::Error::other(format!(
            "too many levels of symbolic links: {}",
            path.display()
        )));
    }

    match std::fs::canonicalize(path) {
        Ok(canonical) => return Ok(simplify_verbatim(canonical)),
        Err(e) if e.kind() != io::ErrorKind::NotFound => return Err(e),
        Err(_) => {},
    }

    // Dangling symlink: follow the link text.
    if let Ok(meta) = std::fs::symlink_metadata(path)
        && meta.file_type().is_symlink()
    {
        let target = std::fs::read_link(path)?;
        let joined = match path.parent() {
            Some(parent) if target.is_relative() => parent.join(target),
            _ => target,
        };
        return real_path_inner(&normalize_lexically(&joined), hops.saturating_add(1));
    }

    let (Some(parent), Some(name)) = (path.parent(), path.file_name()) else {
        return Ok(path.to_path_buf());
    };
    Ok(real_path_inner(parent, hops)?.join(name))
}

/// `std::fs::canonicalize` returns verbatim paths on Windows; undo that for
/// ordinary drive paths so confinement roots and results compare cleanly.
fn simplify_verbatim(path: PathBuf) -> PathBuf {
    let text = path.to_string_lossy();
    if text.starts_with("\\\\?\\") {
        PathBuf::from(strip_verbatim(&text))
    } else {
        path
    }
}
