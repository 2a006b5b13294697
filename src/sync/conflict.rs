//! Conflict resolution for bidirectional sync.
//!
//! A conflict is a key present on both sides with different content. The side
//! with the strictly newer mtime wins; a tie goes to the remote copy. Mtimes
//! are truncated to whole seconds, so a local edit made within the same second
//! as the remote write loses.

use chrono::DateTime;

/// Which way a conflicting file travels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictResolution {
    /// Local copy overwrites the remote one.
    Upload,
    /// Remote copy overwrites the local one.
    Download,
}

/// A key whose two sides disagree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    pub relative_key: String,
    pub local_mtime: i64,
    pub remote_mtime: i64,
}

impl Conflict {
    pub fn new(relative_key: impl Into<String>, local_mtime: i64, remote_mtime: i64) -> Self {
        Self {
            relative_key: relative_key.into(),
            local_mtime,
            remote_mtime,
        }
    }

    /// Local strictly newer uploads; anything else downloads.
    pub fn resolve(&self) -> ConflictResolution {
        if self.local_mtime > self.remote_mtime {
            ConflictResolution::Upload
        } else {
            ConflictResolution::Download
        }
    }

    /// Both sides claim the same second.
    pub fn is_tie(&self) -> bool {
        self.local_mtime == self.remote_mtime
    }

    /// One-line description for logs.
    pub fn describe(&self) -> String {
        format!(
            "{} (local {}, remote {}) -> {:?}",
            self.relative_key,
            format_mtime(self.local_mtime),
            format_mtime(self.remote_mtime),
            self.resolve()
        )
    }
}

fn format_mtime(secs: i64) -> String {
    DateTime::from_timestamp(secs, 0)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| secs.to_string())
}
