//! On-disk JSON settings.
//!
//! Missing keys are filled from defaults, so an old or hand-trimmed file keeps
//! working. The one setting the engine itself writes back is
//! `aws.disable_metadata`, after a store rejects custom metadata.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Result, SyncError};
use crate::sync::hash::HashType;

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "zen_sync_config.json";

/// Files and directories that are never worth syncing (locks, caches, crash dumps).
pub const DEFAULT_EXCLUDES: &[&str] = &[
    "*.lock",
    "*.lck",
    "*-wal",
    "*-shm",
    "*-journal",
    "parent.lock",
    "cookies.sqlite*",
    "webappsstore.sqlite*",
    "storage/temporary/*",
    "storage/default/*/ls/*",
    "storage/permanent/*/ls/*",
    "cache2/*",
    "jumpListCache/*",
    "offlineCache/*",
    "thumbnails/*",
    "crashes/*",
    "minidumps/*",
    "shader-cache/*",
    "startupCache/*",
    "safebrowsing/*",
    "logs/*",
    "sessionstore-backups/previous.jsonlz4",
    "sessionstore-backups/upgrade.jsonlz4-*",
    "Profile Groups/*.sqlite-shm",
    "Profile Groups/*.sqlite-wal",
];

/// Profile data that matters most to users.
pub const DEFAULT_INCLUDES: &[&str] = &[
    "*.ini",
    "prefs.js",
    "user.js",
    "userChrome.css",
    "userContent.css",
    "bookmarks.html",
    "places.sqlite",
    "favicons.sqlite",
    "key4.db",
    "cert9.db",
    "extensions.json",
    "extension-settings.json",
    "extension-preferences.json",
    "search.json.mozlz4",
    "handlers.json",
    "containers.json",
    "zen-*.json",
    "zen-*.css",
    "chrome/**/*",
    "profiles.ini",
    "installs.ini",
    "Profile Groups/*.sqlite",
    "zen-keyboard-shortcuts.json",
    "zen-themes.json",
    "sessionstore.jsonlz4",
    "sessionCheckpoints.json",
    "logins.json",
    "compatibility.ini",
];

/// Remote store settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AwsSettings {
    pub region: String,
    pub bucket: String,
    pub prefix: String,
    pub endpoint_url: String,
    pub disable_metadata: bool,
    pub signature_version: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    /// Named profile in the shared AWS credentials file; wins over static keys.
    pub profile: String,
}

impl Default for AwsSettings {
    fn default() -> Self {
        Self {
            region: "us-east-1".to_string(),
            bucket: String::new(),
            prefix: "zen-profiles/".to_string(),
            endpoint_url: String::new(),
            disable_metadata: false,
            signature_version: "s3v4".to_string(),
            access_key_id: String::new(),
            secret_access_key: String::new(),
            profile: String::new(),
        }
    }
}

/// Local roots and pattern rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    pub zen_roaming_path: String,
    pub zen_local_path: String,
    pub sync_cache_data: bool,
    pub exclude_patterns: Vec<String>,
    pub include_important: Vec<String>,
    pub hash_algorithm: HashType,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            zen_roaming_path: String::new(),
            zen_local_path: String::new(),
            sync_cache_data: false,
            exclude_patterns: DEFAULT_EXCLUDES.iter().map(|s| s.to_string()).collect(),
            include_important: DEFAULT_INCLUDES.iter().map(|s| s.to_string()).collect(),
            hash_algorithm: HashType::default(),
        }
    }
}

/// Complete settings document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub aws: AwsSettings,
    pub sync: SyncSettings,
    /// Where these settings were loaded from and are saved back to.
    #[serde(skip)]
    pub path: PathBuf,
}

impl Settings {
    /// Load settings from `path`, falling back to defaults when the file is
    /// absent or unreadable.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let mut settings = match std::fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str::<Settings>(&content) {
                Ok(settings) => settings,
                Err(e) => {
                    warn!("Error loading config file {}: {}. Using defaults.", path.display(), e);
                    Settings::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Settings::default(),
            Err(e) => {
                warn!("Error reading config file {}: {}. Using defaults.", path.display(), e);
                Settings::default()
            }
        };
        settings.path = path.to_path_buf();
        settings
    }

    /// Write the settings back to the file they were loaded from.
    pub fn save(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&self.path, json).map_err(|e| SyncError::io(&self.path, e))?;
        info!("Configuration saved to {}", self.path.display());
        Ok(())
    }

    /// JSON rendering with secrets hidden, for display.
    pub fn redacted_json(&self) -> Result<String> {
        let mut shown = self.clone();
        if !shown.aws.secret_access_key.is_empty() {
            shown.aws.secret_access_key = "***HIDDEN***".to_string();
        }
        Ok(serde_json::to_string_pretty(&shown)?)
    }

    /// Roaming root, falling back to the auto-detected location.
    pub fn roaming_root(&self) -> Option<PathBuf> {
        non_empty(&self.sync.zen_roaming_path).or_else(|| detect_zen_paths().roaming)
    }

    /// Local (cache) root, falling back to the auto-detected location.
    pub fn local_root(&self) -> Option<PathBuf> {
        non_empty(&self.sync.zen_local_path).or_else(|| detect_zen_paths().local)
    }
}

fn non_empty(s: &str) -> Option<PathBuf> {
    if s.is_empty() {
        None
    } else {
        Some(PathBuf::from(s))
    }
}

/// Browser data locations found on this machine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetectedPaths {
    pub roaming: Option<PathBuf>,
    pub local: Option<PathBuf>,
}

/// Platform default locations, kept only if they exist.
pub fn detect_zen_paths() -> DetectedPaths {
    let (roaming, local) = platform_zen_paths();
    DetectedPaths {
        roaming: roaming.filter(|p| p.exists()),
        local: local.filter(|p| p.exists()),
    }
}

fn platform_zen_paths() -> (Option<PathBuf>, Option<PathBuf>) {
    if cfg!(target_os = "windows") {
        (
            dirs::config_dir().map(|d| d.join("zen")),
            dirs::data_local_dir().map(|d| d.join("zen")),
        )
    } else if cfg!(target_os = "macos") {
        (
            dirs::config_dir().map(|d| d.join("zen")),
            dirs::cache_dir().map(|d| d.join("zen")),
        )
    } else {
        let home = dirs::home_dir();
        (
            home.as_ref().map(|h| h.join(".zen")),
            home.as_ref().map(|h| h.join(".cache").join("zen")),
        )
    }
}
