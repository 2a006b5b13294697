use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::Result;
use crate::fs::types::ObjectEntry;

/// Backend type information for display and identification
#[derive(Debug, Clone, PartialEq)]
pub enum BackendType {
    S3 { bucket: String, region: String, endpoint: Option<String> },
    Memory,
}

impl BackendType {
    /// Get a short display name for the backend
    pub fn short_name(&self) -> &'static str {
        match self {
            BackendType::S3 { .. } => "S3",
            BackendType::Memory => "Memory",
        }
    }
}

/// Flat-namespace object store the executor transfers to and from.
///
/// Errors must keep "not found", "access denied" and "metadata unsupported"
/// apart: the executor retries without metadata on the latter two.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Verify the bucket is reachable.
    async fn check(&self) -> Result<()>;

    /// List every object under `prefix`, recursively.
    async fn list_objects(&self, prefix: &str) -> Result<Vec<ObjectEntry>>;

    /// User metadata of one object, `None` if the object does not exist.
    async fn head_metadata(&self, key: &str) -> Result<Option<HashMap<String, String>>>;

    /// Store `data` under `key`, optionally with user metadata.
    async fn put_object(
        &self,
        key: &str,
        data: Vec<u8>,
        metadata: Option<&HashMap<String, String>>,
    ) -> Result<()>;

    /// Fetch the full content of an object.
    async fn get_object(&self, key: &str) -> Result<Vec<u8>>;

    /// Remove an object.
    async fn delete_object(&self, key: &str) -> Result<()>;

    /// Get the backend type
    fn backend_type(&self) -> BackendType;

    /// Get display path for a key
    fn display_key(&self, key: &str) -> String {
        key.to_string()
    }
}
