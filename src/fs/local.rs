use std::fs;
use std::path::{Path, PathBuf};

use filetime::FileTime;
use tracing::{debug, warn};

use crate::error::{Result, SyncError};
use crate::fs::types::ScannedFile;
use crate::sync::namespace::{to_slash, PathRole};
use crate::sync::patterns::PatternSet;

pub struct LocalFs;

impl LocalFs {
    /// Walk `root` depth-first, returning every file the patterns include.
    ///
    /// Subtrees the patterns prove fully excluded are not descended into.
    /// Unreadable directories are logged and skipped.
    pub fn scan(root: &Path, role: PathRole, patterns: &PatternSet) -> Vec<ScannedFile> {
        let mut files = Vec::new();
        let mut to_scan = vec![root.to_path_buf()];

        while let Some(current) = to_scan.pop() {
            let read_dir = match fs::read_dir(&current) {
                Ok(read_dir) => read_dir,
                Err(e) => {
                    warn!("Cannot read directory {}: {}", current.display(), e);
                    continue;
                }
            };

            let mut children: Vec<_> = read_dir.filter_map(|entry| entry.ok()).collect();
            children.sort_by_key(|entry| entry.file_name());

            for entry in children {
                let path = entry.path();
                let Ok(file_type) = entry.file_type() else {
                    continue;
                };
                let relative = match path.strip_prefix(root) {
                    Ok(relative) => to_slash(relative),
                    Err(_) => continue,
                };

                // Symlinked files count; symlinked directories are not followed.
                if file_type.is_dir() {
                    if patterns.prune_directory(&relative) {
                        debug!("Pruning excluded directory {}", relative);
                    } else {
                        to_scan.push(path);
                    }
                } else if path.is_file() && patterns.include_file(&relative) {
                    files.push(ScannedFile {
                        path,
                        root: root.to_path_buf(),
                        role,
                    });
                }
            }
        }

        files.sort_by(|a, b| a.path.cmp(&b.path));
        files
    }

    /// Write `data` to `path`, creating parent directories.
    pub fn write_file(path: &Path, data: &[u8]) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| SyncError::io(parent, e))?;
        }
        fs::write(path, data).map_err(|e| SyncError::io(path, e))
    }

    pub fn read_file(path: &Path) -> Result<Vec<u8>> {
        fs::read(path).map_err(|e| SyncError::io(path, e))
    }

    /// Set both access and modification time to `mtime` seconds.
    pub fn set_mtime(path: &Path, mtime: i64) -> Result<()> {
        let time = FileTime::from_unix_time(mtime, 0);
        filetime::set_file_times(path, time, time).map_err(|e| SyncError::io(path, e))
    }

    /// Remove a file, then its parent directory if that is now empty.
    pub fn delete_file(path: &Path) -> Result<()> {
        fs::remove_file(path).map_err(|e| SyncError::io(path, e))?;
        if let Some(parent) = path.parent() {
            // Fails harmlessly when the directory still has entries.
            let _ = fs::remove_dir(parent);
        }
        Ok(())
    }

    /// File modification time in whole seconds.
    pub fn mtime(path: &Path) -> Result<i64> {
        let meta = fs::metadata(path).map_err(|e| SyncError::io(path, e))?;
        Ok(FileTime::from_last_modification_time(&meta).unix_seconds())
    }

    /// Files directly below `path` with the given extension, sorted.
    pub fn list_matching(path: &Path, extension: &str) -> Vec<PathBuf> {
        let Ok(read_dir) = fs::read_dir(path) else {
            return Vec::new();
        };
        let mut matches: Vec<PathBuf> = read_dir
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == extension))
            .collect();
        matches.sort();
        matches
    }
}
