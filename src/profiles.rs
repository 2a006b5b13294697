//! Browser profile registry (`profiles.ini`) and profile-system overview.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{error, warn};

use crate::error::{Result, SyncError};
use crate::fs::local::LocalFs;

pub const PROFILES_INI: &str = "profiles.ini";
pub const PROFILE_GROUPS_DIR: &str = "Profile Groups";

/// One `[Profile*]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileEntry {
    /// Section name, e.g. `Profile0`.
    pub id: String,
    pub name: String,
    /// `Path` as written in the file.
    pub path: String,
    pub is_default: bool,
    pub store_id: String,
    pub full_path: Option<PathBuf>,
}

/// `Profile Groups` directory and the databases in it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileGroups {
    pub path: PathBuf,
    pub databases: Vec<String>,
}

/// Overview printed by `profile-info`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileInfo {
    pub roaming: Option<PathBuf>,
    pub local: Option<PathBuf>,
    pub roaming_exists: bool,
    pub local_exists: bool,
    pub profiles: Vec<ProfileEntry>,
    /// `None` when the roaming root is unknown; `Some(None)` when the
    /// directory does not exist.
    pub profile_groups: Option<Option<ProfileGroups>>,
}

pub(crate) type Section = (String, HashMap<String, String>);

/// Minimal INI reader: `[section]` headers, `key=value` lines, `;`/`#`
/// comments. Keys are case-insensitive.
pub(crate) fn parse_ini(content: &str) -> Result<Vec<Section>> {
    let mut sections: Vec<Section> = Vec::new();

    for (number, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
            continue;
        }

        if let Some(header) = line.strip_prefix('[') {
            let name = header.strip_suffix(']').ok_or_else(|| {
                SyncError::Config(format!("Malformed section header at line {}", number + 1))
            })?;
            sections.push((name.trim().to_string(), HashMap::new()));
            continue;
        }

        let Some((key, value)) = line.split_once('=') else {
            return Err(SyncError::Config(format!(
                "Expected key=value at line {}",
                number + 1
            )));
        };
        let Some((_, entries)) = sections.last_mut() else {
            return Err(SyncError::Config(format!(
                "Entry outside of a section at line {}",
                number + 1
            )));
        };
        entries.insert(key.trim().to_ascii_lowercase(), value.trim().to_string());
    }

    Ok(sections)
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Profiles declared in `content`, with full paths resolved against `base`.
pub fn parse_profiles(content: &str, base: &Path) -> Result<Vec<ProfileEntry>> {
    let profiles = parse_ini(content)?
        .into_iter()
        .filter(|(section, _)| section.starts_with("Profile"))
        .map(|(section, entries)| {
            let get = |key: &str| entries.get(key).cloned().unwrap_or_default();
            let path = get("path");
            let full_path = (!path.is_empty()).then(|| base.join("Profiles").join(&path));
            ProfileEntry {
                id: section,
                name: entries
                    .get("name")
                    .cloned()
                    .unwrap_or_else(|| "Unknown".to_string()),
                is_default: entries.get("default").is_some_and(|v| parse_bool(v)),
                store_id: get("storeid"),
                path,
                full_path,
            }
        })
        .collect();
    Ok(profiles)
}

/// Profiles registered under the roaming root.
///
/// A missing or unreadable `profiles.ini` is logged and yields no profiles.
pub fn list_profiles(roaming: &Path) -> Vec<ProfileEntry> {
    let ini = roaming.join(PROFILES_INI);
    if !ini.exists() {
        warn!("{} not found in {}", PROFILES_INI, roaming.display());
        return Vec::new();
    }

    let parsed = std::fs::read_to_string(&ini)
        .map_err(|e| SyncError::io(&ini, e))
        .and_then(|content| parse_profiles(&content, roaming));
    match parsed {
        Ok(profiles) => profiles,
        Err(e) => {
            error!("Error reading {}: {}", ini.display(), e);
            Vec::new()
        }
    }
}

/// Collect paths, profiles and profile-group databases.
pub fn profile_info(roaming: Option<&Path>, local: Option<&Path>) -> ProfileInfo {
    let profiles = match roaming {
        Some(root) => list_profiles(root),
        None => {
            error!("Roaming path not configured");
            Vec::new()
        }
    };

    let profile_groups = roaming.map(|root| {
        let dir = root.join(PROFILE_GROUPS_DIR);
        dir.is_dir().then(|| ProfileGroups {
            databases: LocalFs::list_matching(&dir, "sqlite")
                .iter()
                .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
                .collect(),
            path: dir,
        })
    });

    ProfileInfo {
        roaming: roaming.map(Path::to_path_buf),
        local: local.map(Path::to_path_buf),
        roaming_exists: roaming.is_some_and(Path::exists),
        local_exists: local.is_some_and(Path::exists),
        profiles,
        profile_groups,
    }
}
