// Integration tests for push, pull and bidirectional runs against the
// in-memory store. Shared fixtures live here; scenarios are split by mode.

mod bidirectional_tests;
mod property_tests;
mod pull_tests;
mod push_tests;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;
use zensync::config::Settings;
use zensync::fs::{LocalFs, MemoryStore};
use zensync::sync::{RunOptions, SyncContext, SyncEngine};

pub const PREFIX: &str = "zen-profiles/";

/// Scratch roaming/local roots, a config file location and a store.
pub struct Fixture {
    pub roaming: TempDir,
    pub local: TempDir,
    pub config_dir: TempDir,
    pub store: Arc<MemoryStore>,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_store(MemoryStore::new())
    }

    pub fn with_store(store: MemoryStore) -> Self {
        Self {
            roaming: TempDir::new().unwrap(),
            local: TempDir::new().unwrap(),
            config_dir: TempDir::new().unwrap(),
            store: Arc::new(store),
        }
    }

    pub fn config_path(&self) -> PathBuf {
        self.config_dir.path().join("zen_sync_config.json")
    }

    pub fn settings(&self) -> Settings {
        let mut settings = Settings::default();
        settings.aws.bucket = "test-bucket".to_string();
        settings.sync.zen_roaming_path = self.roaming.path().display().to_string();
        settings.sync.zen_local_path = self.local.path().display().to_string();
        settings.path = self.config_path();
        settings
    }

    pub fn engine(&self) -> SyncEngine {
        self.engine_with(|_| {})
    }

    pub fn engine_with(&self, adjust: impl FnOnce(&mut Settings)) -> SyncEngine {
        let mut settings = self.settings();
        adjust(&mut settings);
        SyncEngine::new(SyncContext::new(settings, self.store.clone()).unwrap())
    }

    /// Write a file under the roaming root with a fixed mtime.
    pub fn write_roaming(&self, relative: &str, data: &[u8], mtime: i64) -> PathBuf {
        write_at(self.roaming.path(), relative, data, mtime)
    }

    pub fn write_local(&self, relative: &str, data: &[u8], mtime: i64) -> PathBuf {
        write_at(self.local.path(), relative, data, mtime)
    }
}

fn write_at(root: &Path, relative: &str, data: &[u8], mtime: i64) -> PathBuf {
    let path = root.join(relative);
    LocalFs::write_file(&path, data).unwrap();
    LocalFs::set_mtime(&path, mtime).unwrap();
    path
}

pub fn options(dry_run: bool, incremental: bool, cleanup: bool) -> RunOptions {
    RunOptions {
        dry_run,
        incremental,
        cleanup,
    }
}

pub fn key(relative: &str) -> String {
    format!("{}{}", PREFIX, relative)
}
