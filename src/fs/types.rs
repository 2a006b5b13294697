use std::cell::OnceCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::sync::hash::{content_hash, HashType};
use crate::sync::namespace::PathRole;

/// Metadata key holding the uploader's mtime in integer seconds.
pub const META_ORIGINAL_MTIME: &str = "original-mtime";
/// Metadata key holding the content hash.
pub const META_FILE_HASH: &str = "file-hash";
/// Metadata key holding the path role.
pub const META_PATH_TYPE: &str = "path-type";

/// One row of a remote listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectEntry {
    pub key: String,
    pub size: u64,
    /// Store-reported modification time, integer seconds.
    pub mtime: i64,
    pub etag: String,
}

/// A local file found by a scan, before it is stat'ed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedFile {
    pub path: PathBuf,
    pub root: PathBuf,
    pub role: PathRole,
}

/// Snapshot of a local file used for comparison.
///
/// The content hash is only computed the first time it is asked for.
#[derive(Debug, Clone)]
pub struct LocalFileRecord {
    pub path: PathBuf,
    pub role: PathRole,
    pub size: u64,
    /// Modification time, truncated to whole seconds.
    pub mtime: i64,
    pub exists: bool,
    algorithm: HashType,
    hash: OnceCell<String>,
}

impl LocalFileRecord {
    /// Stat `path`; a missing or unreadable file yields a non-existent record.
    pub fn stat(path: &Path, role: PathRole, algorithm: HashType) -> Self {
        match std::fs::metadata(path) {
            Ok(meta) if meta.is_file() => Self {
                path: path.to_path_buf(),
                role,
                size: meta.len(),
                mtime: meta
                    .modified()
                    .ok()
                    .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
                    .map(|d| d.as_secs() as i64)
                    .unwrap_or(0),
                exists: true,
                algorithm,
                hash: OnceCell::new(),
            },
            _ => Self::missing(path, role),
        }
    }

    /// Record for a file that is not there.
    pub fn missing(path: &Path, role: PathRole) -> Self {
        Self {
            path: path.to_path_buf(),
            role,
            size: 0,
            mtime: 0,
            exists: false,
            algorithm: HashType::default(),
            hash: OnceCell::from(String::new()),
        }
    }

    /// Record with known attributes, for callers that already have them.
    pub fn with_attributes(
        path: impl Into<PathBuf>,
        role: PathRole,
        size: u64,
        mtime: i64,
        hash: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            role,
            size,
            mtime,
            exists: true,
            algorithm: HashType::default(),
            hash: OnceCell::from(hash.into()),
        }
    }

    /// Content hash, empty when the file could not be read.
    pub fn hash(&self) -> &str {
        self.hash
            .get_or_init(|| content_hash(&self.path, self.algorithm))
    }
}

/// A remote object as seen by one listing pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteObjectRecord {
    pub key: String,
    pub relative_key: String,
    pub size: u64,
    pub mtime: i64,
    pub etag: String,
    /// Recovered from object metadata; `None` when metadata is off or absent.
    pub hash: Option<String>,
    pub exists: bool,
}

impl RemoteObjectRecord {
    pub fn from_entry(entry: ObjectEntry, relative_key: impl Into<String>) -> Self {
        Self {
            key: entry.key,
            relative_key: relative_key.into(),
            size: entry.size,
            mtime: entry.mtime,
            etag: entry.etag,
            hash: None,
            exists: true,
        }
    }

    /// Attach the content hash stored in object metadata, if any.
    pub fn with_metadata(mut self, metadata: &HashMap<String, String>) -> Self {
        self.hash = metadata
            .get(META_FILE_HASH)
            .or_else(|| metadata.get("file_hash"))
            .filter(|h| !h.is_empty())
            .cloned();
        self
    }
}

/// Original mtime stored in object metadata.
pub fn original_mtime(metadata: &HashMap<String, String>) -> Option<i64> {
    metadata
        .get(META_ORIGINAL_MTIME)
        .or_else(|| metadata.get("original_mtime"))
        .and_then(|v| v.trim().parse().ok())
}

/// Human readable byte count.
pub fn format_size(size: u64) -> String {
    humansize::format_size(size, humansize::BINARY)
}
