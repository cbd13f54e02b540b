//! Path composition for SFTP operations
//!
//! Remote paths always use `/` (per the SFTP protocol), regardless of the
//! local or remote OS; local paths use the platform-native separator.

use std::path::{Path, PathBuf};

/// Join remote SFTP path components using the `/` separator.
pub fn join_remote_path(base: &str, component: &str) -> String {
    if base.ends_with('/') {
        format!("{}{}", base, component)
    } else {
        format!("{}/{}", base, component)
    }
}

/// Join local path components using the platform-native separator.
pub fn join_local_path(base: &Path, component: &str) -> PathBuf {
    let mut path = base.to_path_buf();
    path.push(component);
    path
}

/// Whether a listing entry is one of the `.` / `..` pseudo entries.
///
/// Both the bare name and the trailing component of the full path are
/// checked, since some servers report pseudo entries with full paths only.
/// Pseudo entries are excluded from every recursive traversal.
pub fn is_pseudo_entry(name: &str, path: &str) -> bool {
    if name == "." || name == ".." {
        return true;
    }
    path == "." || path == ".." || path.ends_with("/.") || path.ends_with("/..")
}

/// Whether a path argument is missing for all practical purposes.
pub fn is_blank(path: &str) -> bool {
    path.trim().is_empty()
}
