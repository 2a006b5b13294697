//! Action sets produced by reconciliation.

use std::fmt;
use std::path::PathBuf;

use tracing::info;

use crate::fs::types::format_size;
use crate::sync::conflict::Conflict;
use crate::sync::namespace::PathRole;

/// Send a local file to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub local_path: PathBuf,
    pub remote_key: String,
    pub size: u64,
    pub role: PathRole,
}

/// Fetch an object into a local file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub local_path: PathBuf,
    pub remote_key: String,
    pub size: u64,
    pub relative_key: String,
}

/// Nothing to do for this entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skip {
    pub identifier: String,
    pub size: u64,
}

/// Which side a deletion applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeletionTarget {
    Remote { key: String },
    Local { path: PathBuf },
}

/// Remove an entry with no counterpart on the source side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deletion {
    pub target: DeletionTarget,
    /// Relative key of the entry.
    pub identifier: String,
    pub size: u64,
}

/// Everything one run decided to do.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionSet {
    pub uploads: Vec<Upload>,
    pub downloads: Vec<Download>,
    pub skips: Vec<Skip>,
    pub deletions: Vec<Deletion>,
    /// Keys that differed on both sides and were resolved by mtime.
    pub conflicts: Vec<Conflict>,
}

impl ActionSet {
    /// Nothing to transfer or delete.
    pub fn is_noop(&self) -> bool {
        self.uploads.is_empty() && self.downloads.is_empty() && self.deletions.is_empty()
    }

    pub fn summary(&self) -> ActionSummary {
        ActionSummary {
            uploads: Tally::of(self.uploads.iter().map(|u| u.size)),
            downloads: Tally::of(self.downloads.iter().map(|d| d.size)),
            skips: Tally::of(self.skips.iter().map(|s| s.size)),
            deletions: Tally::of(self.deletions.iter().map(|d| d.size)),
        }
    }

    /// Log the per-kind counts and sizes.
    pub fn log_analysis(&self) {
        let summary = self.summary();
        info!("Sync analysis:");
        info!("  Upload: {}", summary.uploads);
        info!("  Download: {}", summary.downloads);
        info!("  Skip: {}", summary.skips);
        if summary.deletions.count > 0 {
            info!("  Delete: {}", summary.deletions);
        }
        for conflict in &self.conflicts {
            info!("  Conflict: {}", conflict.describe());
        }
    }
}

/// Count and total size of one kind of action.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub count: usize,
    pub bytes: u64,
}

impl Tally {
    fn of(sizes: impl Iterator<Item = u64>) -> Self {
        sizes.fold(Tally::default(), |acc, size| Tally {
            count: acc.count + 1,
            bytes: acc.bytes + size,
        })
    }
}

impl fmt::Display for Tally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} files ({})", self.count, format_size(self.bytes))
    }
}

/// Action counts and byte totals for reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActionSummary {
    pub uploads: Tally,
    pub downloads: Tally,
    pub skips: Tally,
    pub deletions: Tally,
}

impl fmt::Display for ActionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "upload {}, download {}, skip {}, delete {}",
            self.uploads, self.downloads, self.skips, self.deletions
        )
    }
}
