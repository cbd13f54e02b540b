//! Listing data types

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Kind of entry reported by a directory listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryKind {
    File,
    Directory,
    Symlink,
    Unknown,
}

/// One file or directory reported by a remote directory listing.
///
/// Produced transiently per listing; each recursive call holds its own
/// snapshot and nothing is cached across calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteEntry {
    /// Entry name (not full path)
    pub name: String,
    /// Full remote path
    pub path: String,
    /// Entry kind
    pub kind: EntryKind,
    /// Size in bytes, as reported by the listing
    pub size: u64,
    /// Last modified time (Unix timestamp), when reported
    pub modified: Option<i64>,
}

impl RemoteEntry {
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    pub(crate) fn is_pseudo(&self) -> bool {
        crate::path::is_pseudo_entry(&self.name, &self.path)
    }
}

/// Local-side counterpart of [`RemoteEntry`], handed to upload observers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalEntry {
    /// Entry name (not full path)
    pub name: String,
    /// Full local path
    pub path: PathBuf,
    /// Entry kind
    pub kind: EntryKind,
    /// Size in bytes
    pub size: u64,
}

impl LocalEntry {
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }
}

/// Result of a single directory listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirListing {
    /// Materialized entries, in the order the transport yielded them
    pub entries: Vec<RemoteEntry>,
    /// Entry count reported by the transport alongside the listing.
    ///
    /// Reported out-of-band and passed through as-is: it can disagree with
    /// `entries.len()` (pseudo entries, or the remote side changing under a
    /// listing in flight) and is deliberately not reconciled.
    pub total: usize,
}
