//! Error types for zensync

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for sync operations
pub type Result<T> = std::result::Result<T, SyncError>;

/// Main error type for sync operations
#[derive(Error, Debug)]
pub enum SyncError {
    /// Missing bucket, credentials or roots. Fatal before any transfer.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Store unreachable or bucket missing. Fatal at startup.
    #[error("Cannot reach object store: {0}")]
    Connectivity(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    /// The store refused custom metadata headers (or their signature).
    #[error("Store does not accept object metadata: {0}")]
    MetadataUnsupported(String),

    #[error("Object store error: {0}")]
    Store(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SyncError {
    /// Wrap an I/O error with the path it happened on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SyncError::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether a metadata-less retry might succeed where this upload failed.
    pub fn allows_metadata_fallback(&self) -> bool {
        matches!(
            self,
            SyncError::AccessDenied(_) | SyncError::MetadataUnsupported(_)
        )
    }
}

impl From<opendal::Error> for SyncError {
    fn from(err: opendal::Error) -> Self {
        use opendal::ErrorKind;

        let message = err.to_string();
        let lowered = message.to_lowercase();
        match err.kind() {
            ErrorKind::NotFound => SyncError::NotFound(message),
            ErrorKind::PermissionDenied
                if lowered.contains("signature")
                    || lowered.contains("header")
                    || lowered.contains("not signed") =>
            {
                SyncError::MetadataUnsupported(message)
            }
            ErrorKind::PermissionDenied => SyncError::AccessDenied(message),
            _ if lowered.contains("signaturedoesnotmatch") => {
                SyncError::MetadataUnsupported(message)
            }
            _ => SyncError::Store(message),
        }
    }
}
