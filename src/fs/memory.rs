//! In-process object store.
//!
//! Behaves like the S3 backend (prefix listing, user metadata, not-found
//! errors) and can be told to reject metadata the way some S3-compatible
//! services do. Used for offline runs and tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{Result, SyncError};
use crate::fs::backend::{BackendType, ObjectStore};
use crate::fs::types::ObjectEntry;

#[derive(Debug, Clone)]
struct StoredObject {
    data: Vec<u8>,
    metadata: HashMap<String, String>,
    mtime: i64,
}

/// Map-backed [`ObjectStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: Mutex<BTreeMap<String, StoredObject>>,
    reject_metadata: bool,
    clock: AtomicI64,
    writes: AtomicUsize,
    deletes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that refuses uploads carrying user metadata.
    pub fn rejecting_metadata() -> Self {
        Self {
            reject_metadata: true,
            ..Self::default()
        }
    }

    /// Set the timestamp reported for subsequent writes.
    pub fn set_clock(&self, mtime: i64) {
        self.clock.store(mtime, Ordering::SeqCst);
    }

    /// Insert an object directly, bypassing write counters.
    pub fn insert(&self, key: &str, data: &[u8], mtime: i64, metadata: HashMap<String, String>) {
        self.lock().insert(
            key.to_string(),
            StoredObject {
                data: data.to_vec(),
                metadata,
                mtime,
            },
        );
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lock().contains_key(key)
    }

    pub fn data(&self, key: &str) -> Option<Vec<u8>> {
        self.lock().get(key).map(|o| o.data.clone())
    }

    pub fn metadata(&self, key: &str) -> Option<HashMap<String, String>> {
        self.lock().get(key).map(|o| o.metadata.clone())
    }

    pub fn keys(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    /// Number of successful writes through [`ObjectStore::put_object`].
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Number of successful deletes through [`ObjectStore::delete_object`].
    pub fn delete_count(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, StoredObject>> {
        self.objects.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn check(&self) -> Result<()> {
        Ok(())
    }

    async fn list_objects(&self, prefix: &str) -> Result<Vec<ObjectEntry>> {
        Ok(self
            .lock()
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, object)| ObjectEntry {
                key: key.clone(),
                size: object.data.len() as u64,
                mtime: object.mtime,
                etag: crate::sync::hash::hash_bytes(&object.data, Default::default()),
            })
            .collect())
    }

    async fn head_metadata(&self, key: &str) -> Result<Option<HashMap<String, String>>> {
        Ok(self.lock().get(key).map(|o| o.metadata.clone()))
    }

    async fn put_object(
        &self,
        key: &str,
        data: Vec<u8>,
        metadata: Option<&HashMap<String, String>>,
    ) -> Result<()> {
        if self.reject_metadata && metadata.is_some_and(|m| !m.is_empty()) {
            return Err(SyncError::MetadataUnsupported(format!(
                "{}: headers not signed",
                key
            )));
        }
        let object = StoredObject {
            data,
            metadata: metadata.cloned().unwrap_or_default(),
            mtime: self.clock.load(Ordering::SeqCst),
        };
        self.lock().insert(key.to_string(), object);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn get_object(&self, key: &str) -> Result<Vec<u8>> {
        self.lock()
            .get(key)
            .map(|o| o.data.clone())
            .ok_or_else(|| SyncError::NotFound(key.to_string()))
    }

    async fn delete_object(&self, key: &str) -> Result<()> {
        self.lock().remove(key);
        self.deletes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn backend_type(&self) -> BackendType {
        BackendType::Memory
    }

    fn display_key(&self, key: &str) -> String {
        format!("memory://{}", key)
    }
}
