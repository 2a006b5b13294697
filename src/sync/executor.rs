//! Applies an [`ActionSet`] against the store and the local filesystem.
//!
//! Actions run one at a time. A failing action is logged and counted; the
//! rest of the set still runs.

use std::collections::HashMap;
use std::fmt;
use std::io::IsTerminal;
use std::path::Path;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, error, info, warn};

use crate::config::Settings;
use crate::error::Result;
use crate::fs::local::LocalFs;
use crate::fs::types::{original_mtime, META_FILE_HASH, META_ORIGINAL_MTIME, META_PATH_TYPE};
use crate::sync::engine::SyncContext;
use crate::sync::hash::hash_bytes;
use crate::sync::plan::{ActionSet, Deletion, DeletionTarget, Download, Upload};

/// Outcome counts for one executed action set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutionStats {
    pub succeeded: usize,
    pub failed: usize,
}

impl fmt::Display for ExecutionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} succeeded, {} failed", self.succeeded, self.failed)
    }
}

pub struct Executor<'a> {
    ctx: &'a mut SyncContext,
    metadata_disabled_this_run: bool,
}

impl<'a> Executor<'a> {
    pub fn new(ctx: &'a mut SyncContext) -> Self {
        Self {
            ctx,
            metadata_disabled_this_run: false,
        }
    }

    /// Uploads, then downloads, then deletions.
    pub async fn apply(mut self, plan: &ActionSet) -> ExecutionStats {
        let total = plan.uploads.len() + plan.downloads.len() + plan.deletions.len();
        let pb = progress_bar(total as u64);
        let mut stats = ExecutionStats::default();

        for upload in &plan.uploads {
            pb.set_message(format!("{} OK, {} failed", stats.succeeded, stats.failed));
            let result = self.upload(upload).await;
            record(&mut stats, result, || format!("upload {}", upload.local_path.display()));
            pb.inc(1);
        }

        for download in &plan.downloads {
            pb.set_message(format!("{} OK, {} failed", stats.succeeded, stats.failed));
            let result = self.download(download).await;
            record(&mut stats, result, || format!("download {}", download.remote_key));
            pb.inc(1);
        }

        for deletion in &plan.deletions {
            pb.set_message(format!("{} OK, {} failed", stats.succeeded, stats.failed));
            let result = self.delete(deletion).await;
            record(&mut stats, result, || format!("delete {}", deletion.identifier));
            pb.inc(1);
        }

        pb.finish_and_clear();
        stats
    }

    async fn upload(&mut self, upload: &Upload) -> Result<()> {
        let data = LocalFs::read_file(&upload.local_path)?;

        if self.ctx.metadata_enabled() {
            let metadata = self.metadata_for(upload, &data)?;
            match self
                .ctx
                .store
                .put_object(&upload.remote_key, data.clone(), Some(&metadata))
                .await
            {
                Ok(()) => {
                    debug!("Uploaded {} with metadata", self.ctx.store.display_key(&upload.remote_key));
                    return Ok(());
                }
                Err(e) if e.allows_metadata_fallback() => {
                    warn!(
                        "Metadata rejected for {} ({}), retrying without metadata",
                        upload.remote_key, e
                    );
                    self.ctx.store.put_object(&upload.remote_key, data, None).await?;
                    self.disable_metadata();
                    return Ok(());
                }
                Err(e) => return Err(e),
            }
        }

        self.ctx.store.put_object(&upload.remote_key, data, None).await?;
        debug!("Uploaded {}", self.ctx.store.display_key(&upload.remote_key));
        Ok(())
    }

    fn metadata_for(&self, upload: &Upload, data: &[u8]) -> Result<HashMap<String, String>> {
        let mtime = LocalFs::mtime(&upload.local_path)?;
        let mut metadata = HashMap::new();
        metadata.insert(META_PATH_TYPE.to_string(), upload.role.to_string());
        metadata.insert(META_ORIGINAL_MTIME.to_string(), mtime.to_string());
        metadata.insert(
            META_FILE_HASH.to_string(),
            hash_bytes(data, self.ctx.hash_algorithm()),
        );
        Ok(metadata)
    }

    /// Persist `disable_metadata` so later runs skip the failing attempt.
    ///
    /// Only that flag is written back; per-run overrides (bucket, prefix,
    /// paths) stay out of the file.
    fn disable_metadata(&mut self) {
        if self.metadata_disabled_this_run {
            return;
        }
        self.metadata_disabled_this_run = true;
        self.ctx.settings.aws.disable_metadata = true;
        info!("Store does not accept custom metadata; disabling it for future runs");

        let mut on_disk = Settings::load(&self.ctx.settings.path);
        on_disk.aws.disable_metadata = true;
        if let Err(e) = on_disk.save() {
            warn!("Could not save configuration: {}", e);
        }
    }

    async fn download(&mut self, download: &Download) -> Result<()> {
        let data = self.ctx.store.get_object(&download.remote_key).await?;
        LocalFs::write_file(&download.local_path, &data)?;

        if self.ctx.metadata_enabled() {
            match self.ctx.store.head_metadata(&download.remote_key).await {
                Ok(Some(metadata)) => {
                    if let Some(mtime) = original_mtime(&metadata) {
                        restore_mtime(&download.local_path, mtime);
                    }
                }
                Ok(None) => {}
                Err(e) => debug!("No metadata for {}: {}", download.remote_key, e),
            }
        }

        debug!(
            "Downloaded {} -> {}",
            self.ctx.store.display_key(&download.remote_key),
            download.local_path.display()
        );
        Ok(())
    }

    async fn delete(&mut self, deletion: &Deletion) -> Result<()> {
        match &deletion.target {
            DeletionTarget::Remote { key } => {
                self.ctx.store.delete_object(key).await?;
                debug!("Deleted {}", self.ctx.store.display_key(key));
            }
            DeletionTarget::Local { path } => {
                LocalFs::delete_file(path)?;
                debug!("Deleted local {}", path.display());
            }
        }
        Ok(())
    }
}

fn record(stats: &mut ExecutionStats, result: Result<()>, what: impl FnOnce() -> String) {
    match result {
        Ok(()) => stats.succeeded += 1,
        Err(e) => {
            stats.failed += 1;
            error!("Failed to {}: {}", what(), e);
        }
    }
}

fn progress_bar(len: u64) -> ProgressBar {
    if !std::io::stderr().is_terminal() {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(len);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) | {msg}")
    {
        pb.set_style(style.progress_chars("=>-"));
    }
    pb
}

/// Best effort: the bytes are already on disk, so a failure only warns.
fn restore_mtime(path: &Path, mtime: i64) {
    if let Err(e) = LocalFs::set_mtime(path, mtime) {
        warn!("Could not restore mtime of {}: {}", path.display(), e);
    }
}
