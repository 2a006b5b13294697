//! Mapping between the two local roots and the flat remote key namespace.
//!
//! Every remote key is `prefix + relative key`. The relative key starts with a
//! role segment (`roaming/` or `local/`) so both roots share one namespace
//! without collisions.

use std::fmt;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

const ROAMING_SEGMENT: &str = "roaming/";
const LOCAL_SEGMENT: &str = "local/";

/// Which local root a file belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathRole {
    /// Profile data, always synchronized.
    Roaming,
    /// Cache data, synchronized only with cache sync enabled.
    Local,
    /// Plain relative-path mirroring with no role segment.
    Mirror,
}

impl PathRole {
    /// Leading key segment for this role, if any.
    pub fn segment(&self) -> Option<&'static str> {
        match self {
            PathRole::Roaming => Some("roaming"),
            PathRole::Local => Some("local"),
            PathRole::Mirror => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PathRole::Roaming => "roaming",
            PathRole::Local => "local",
            PathRole::Mirror => "mirror",
        }
    }
}

impl fmt::Display for PathRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a relative key lands on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalTarget {
    pub role: PathRole,
    pub root: PathBuf,
    pub path: PathBuf,
}

/// The remote namespace and the local roots it mirrors.
#[derive(Debug, Clone)]
pub struct Namespace {
    prefix: String,
    roaming_root: PathBuf,
    local_root: Option<PathBuf>,
    sync_cache_data: bool,
}

impl Namespace {
    pub fn new(
        prefix: impl Into<String>,
        roaming_root: impl Into<PathBuf>,
        local_root: Option<PathBuf>,
        sync_cache_data: bool,
    ) -> Self {
        Self {
            prefix: prefix.into(),
            roaming_root: roaming_root.into(),
            local_root,
            sync_cache_data,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn roaming_root(&self) -> &Path {
        &self.roaming_root
    }

    pub fn local_root(&self) -> Option<&Path> {
        self.local_root.as_deref()
    }

    /// Whether the local (cache) root takes part in this run.
    pub fn syncs_local_root(&self) -> bool {
        self.sync_cache_data && self.local_root.is_some()
    }

    /// Key relative to the prefix: `role/path/under/root`.
    ///
    /// Returns `None` when `path` is not under `root`.
    pub fn relative_key(&self, path: &Path, root: &Path, role: PathRole) -> Option<String> {
        let relative = path.strip_prefix(root).ok()?;
        let relative = to_slash(relative);
        Some(match role.segment() {
            Some(segment) => format!("{}/{}", segment, relative),
            None => relative,
        })
    }

    /// Full remote key: prefix plus relative key.
    pub fn remote_key(&self, path: &Path, root: &Path, role: PathRole) -> Option<String> {
        self.relative_key(path, root, role)
            .map(|relative| self.full_key(&relative))
    }

    /// Prepend the namespace prefix to a relative key.
    pub fn full_key(&self, relative_key: &str) -> String {
        format!("{}{}", self.prefix, relative_key)
    }

    /// Strip the namespace prefix from a full key.
    pub fn strip_prefix<'a>(&self, key: &'a str) -> Option<&'a str> {
        key.strip_prefix(self.prefix.as_str())
    }

    /// Local destination for a relative key.
    ///
    /// `local/` keys only map while cache sync is enabled; keys without a role
    /// segment land directly under the roaming root. Keys with a segment that
    /// could leave the root (`..`, `.`, separators, drive or root prefixes)
    /// have no destination.
    pub fn local_target(&self, relative_key: &str) -> Option<LocalTarget> {
        if let Some(rest) = relative_key.strip_prefix(ROAMING_SEGMENT) {
            return self.target(PathRole::Roaming, self.roaming_root.clone(), relative_key, rest);
        }
        if let Some(rest) = relative_key.strip_prefix(LOCAL_SEGMENT) {
            if !self.sync_cache_data {
                return None;
            }
            let root = self.local_root.clone()?;
            return self.target(PathRole::Local, root, relative_key, rest);
        }
        self.target(PathRole::Mirror, self.roaming_root.clone(), relative_key, relative_key)
    }

    fn target(
        &self,
        role: PathRole,
        root: PathBuf,
        relative_key: &str,
        rest: &str,
    ) -> Option<LocalTarget> {
        let mut path = root.clone();
        for segment in rest.split('/').filter(|s| !s.is_empty()) {
            if !is_plain_segment(segment) {
                warn!("Ignoring remote key {}: unsafe segment '{}'", relative_key, segment);
                return None;
            }
            path.push(segment);
        }
        Some(LocalTarget { role, root, path })
    }
}

/// A single ordinary file or directory name.
fn is_plain_segment(segment: &str) -> bool {
    if segment.contains('\\') {
        return false;
    }
    let mut components = Path::new(segment).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(name)), None) if name == segment
    )
}

/// Render a relative path with forward slashes regardless of platform.
pub fn to_slash(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
