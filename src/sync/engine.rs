//! Reconciliation engine.
//!
//! Builds the local and remote listings, decides per file what push, pull or
//! bidirectional sync should do, and hands the resulting [`ActionSet`] to the
//! executor (or only reports it on a dry run).

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::error::{Result, SyncError};
use crate::fs::backend::ObjectStore;
use crate::fs::local::LocalFs;
use crate::fs::types::{LocalFileRecord, RemoteObjectRecord, ScannedFile};
use crate::sync::conflict::{Conflict, ConflictResolution};
use crate::sync::executor::{ExecutionStats, Executor};
use crate::sync::hash::HashType;
use crate::sync::identity::are_different;
use crate::sync::namespace::{to_slash, Namespace, PathRole};
use crate::sync::patterns::PatternSet;
use crate::sync::plan::{ActionSet, ActionSummary, Deletion, DeletionTarget, Download, Skip, Upload};

/// Remote objects keyed by relative key.
pub type RemoteListing = BTreeMap<String, RemoteObjectRecord>;

/// Sync direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// Local -> remote.
    Push,
    /// Remote -> local.
    Pull,
    /// Both ways, newer mtime wins.
    Bidirectional,
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SyncMode::Push => "upload",
            SyncMode::Pull => "download",
            SyncMode::Bidirectional => "sync",
        })
    }
}

/// Per-run switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    /// Report the plan without applying it.
    pub dry_run: bool,
    /// Compare before transferring. Bidirectional runs are always incremental.
    pub incremental: bool,
    /// Delete destination entries with no source counterpart.
    pub cleanup: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            incremental: true,
            cleanup: false,
        }
    }
}

/// What a run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub mode: SyncMode,
    pub summary: ActionSummary,
    pub dry_run: bool,
    pub stats: ExecutionStats,
}

impl SyncReport {
    fn new(mode: SyncMode, plan: &ActionSet, dry_run: bool) -> Self {
        Self {
            mode,
            summary: plan.summary(),
            dry_run,
            stats: ExecutionStats::default(),
        }
    }

    /// No individual operation failed.
    pub fn success(&self) -> bool {
        self.stats.failed == 0
    }
}

/// Everything a run needs: settings, key mapping, patterns and the store.
pub struct SyncContext {
    pub settings: Settings,
    pub namespace: Namespace,
    pub patterns: PatternSet,
    pub store: Arc<dyn ObjectStore>,
}

impl SyncContext {
    pub fn new(settings: Settings, store: Arc<dyn ObjectStore>) -> Result<Self> {
        let roaming = settings
            .roaming_root()
            .ok_or_else(|| SyncError::Config("Roaming path is not configured".to_string()))?;
        let local = settings.local_root();

        info!("Object store: {}", store.backend_type().short_name());
        info!("Zen Browser paths:");
        info!("  Roaming: {}", roaming.display());
        match &local {
            Some(local) => info!("  Local: {}", local.display()),
            None => info!("  Local: not configured"),
        }
        if !roaming.exists() {
            warn!("Roaming path does not exist: {}", roaming.display());
        }
        if let Some(local) = local.as_ref().filter(|p| !p.exists()) {
            warn!("Local path does not exist: {}", local.display());
        }

        let namespace = Namespace::new(
            settings.aws.prefix.clone(),
            roaming,
            local,
            settings.sync.sync_cache_data,
        );
        let patterns = PatternSet::new(
            settings.sync.exclude_patterns.as_slice(),
            settings.sync.include_important.as_slice(),
        )?;

        debug!(
            "Patterns: {} exclude, {} include",
            patterns.exclude_patterns().count(),
            patterns.include_patterns().count()
        );

        Ok(Self {
            settings,
            namespace,
            patterns,
            store,
        })
    }

    pub fn metadata_enabled(&self) -> bool {
        !self.settings.aws.disable_metadata
    }

    pub fn hash_algorithm(&self) -> HashType {
        self.settings.sync.hash_algorithm
    }

    /// Scan both roots. The local root only counts with cache sync enabled.
    ///
    /// A missing roaming root yields an empty listing.
    pub fn local_files(&self) -> Vec<ScannedFile> {
        let roaming = self.namespace.roaming_root();
        if !roaming.exists() {
            warn!("Roaming directory not found: {}", roaming.display());
            return Vec::new();
        }

        let mut files = LocalFs::scan(roaming, PathRole::Roaming, &self.patterns);
        info!("Found {} files in roaming directory", files.len());

        if self.namespace.syncs_local_root() {
            if let Some(local) = self.namespace.local_root().filter(|p| p.exists()) {
                let local_files = LocalFs::scan(local, PathRole::Local, &self.patterns);
                info!("Found {} files in local directory", local_files.len());
                files.extend(local_files);
            }
        }

        info!("Total files to sync: {}", files.len());
        files
    }

    /// One listing pass over the prefix, annotated with metadata hashes.
    pub async fn list_remote(&self) -> Result<RemoteListing> {
        let prefix = self.namespace.prefix();
        let entries = self.store.list_objects(prefix).await?;

        let mut listing = RemoteListing::new();
        for entry in entries {
            let Some(relative) = self.namespace.strip_prefix(&entry.key) else {
                continue;
            };
            if relative.is_empty() {
                continue;
            }
            let relative = relative.to_string();
            let mut record = RemoteObjectRecord::from_entry(entry, relative.clone());

            if self.metadata_enabled() {
                match self.store.head_metadata(&record.key).await {
                    Ok(Some(metadata)) => record = record.with_metadata(&metadata),
                    Ok(None) => {}
                    Err(e) => debug!("No metadata for {}: {}", record.key, e),
                }
            }

            listing.insert(relative, record);
        }

        debug!("Listed {} remote objects under {}", listing.len(), prefix);
        Ok(listing)
    }

    fn relative_key(&self, file: &ScannedFile) -> Option<String> {
        self.namespace.relative_key(&file.path, &file.root, file.role)
    }

    fn stat(&self, file: &ScannedFile) -> LocalFileRecord {
        LocalFileRecord::stat(&file.path, file.role, self.hash_algorithm())
    }

    /// Whether a remote object is something the local scan could have seen.
    ///
    /// Objects whose local counterpart is unmapped (cache data with cache
    /// sync off), filtered by the patterns, or below a pruned directory are
    /// never cleanup candidates.
    fn scan_could_surface(&self, relative_key: &str) -> bool {
        let Some(target) = self.namespace.local_target(relative_key) else {
            return false;
        };
        match target.path.strip_prefix(&target.root) {
            Ok(under_root) => self.patterns.scan_reaches(&to_slash(under_root)),
            Err(_) => false,
        }
    }

    /// Decide what a push does.
    pub fn plan_push(
        &self,
        files: &[ScannedFile],
        remote: &RemoteListing,
        incremental: bool,
        cleanup: bool,
    ) -> ActionSet {
        let mut plan = ActionSet::default();
        let mut local_keys = BTreeSet::new();

        info!("Analyzing {} local files...", files.len());
        for file in files {
            let Some(relative_key) = self.relative_key(file) else {
                warn!("{} is outside its root, skipping", file.path.display());
                continue;
            };
            let record = self.stat(file);

            if incremental {
                if let Some(object) = remote.get(&relative_key) {
                    if !are_different(&record, object) {
                        plan.skips.push(Skip {
                            identifier: relative_key.clone(),
                            size: record.size,
                        });
                        local_keys.insert(relative_key);
                        continue;
                    }
                }
            }

            plan.uploads.push(Upload {
                local_path: file.path.clone(),
                remote_key: self.namespace.full_key(&relative_key),
                size: record.size,
                role: file.role,
            });
            local_keys.insert(relative_key);
        }

        if cleanup {
            for (relative_key, object) in remote {
                if local_keys.contains(relative_key) {
                    continue;
                }
                if !self.scan_could_surface(relative_key) {
                    debug!("Keeping {}: not covered by the local scan", relative_key);
                    continue;
                }
                plan.deletions.push(Deletion {
                    target: DeletionTarget::Remote {
                        key: object.key.clone(),
                    },
                    identifier: relative_key.clone(),
                    size: object.size,
                });
            }
        }

        plan
    }

    /// Decide what a pull does. `local_files` is the fresh scan used for
    /// cleanup; pass `None` when cleanup is off.
    pub fn plan_pull(
        &self,
        remote: &RemoteListing,
        local_files: Option<&[ScannedFile]>,
        incremental: bool,
    ) -> ActionSet {
        let mut plan = ActionSet::default();

        info!("Analyzing {} remote objects...", remote.len());
        for (relative_key, object) in remote {
            let Some(target) = self.namespace.local_target(relative_key) else {
                debug!("No local mapping for {}, ignoring", relative_key);
                continue;
            };
            let record = LocalFileRecord::stat(&target.path, target.role, self.hash_algorithm());

            if incremental && record.exists && !are_different(&record, object) {
                plan.skips.push(Skip {
                    identifier: relative_key.clone(),
                    size: object.size,
                });
                continue;
            }

            plan.downloads.push(Download {
                local_path: target.path,
                remote_key: object.key.clone(),
                size: object.size,
                relative_key: relative_key.clone(),
            });
        }

        if let Some(files) = local_files {
            for file in files {
                let Some(relative_key) = self.relative_key(file) else {
                    continue;
                };
                if remote.contains_key(&relative_key) {
                    continue;
                }
                let record = self.stat(file);
                if record.exists {
                    plan.deletions.push(Deletion {
                        target: DeletionTarget::Local {
                            path: file.path.clone(),
                        },
                        identifier: relative_key,
                        size: record.size,
                    });
                }
            }
        }

        plan
    }

    /// Decide what a bidirectional sync does.
    pub fn plan_bidirectional(&self, files: &[ScannedFile], remote: &RemoteListing) -> ActionSet {
        let mut plan = ActionSet::default();

        let local: BTreeMap<String, (&ScannedFile, LocalFileRecord)> = files
            .iter()
            .filter_map(|file| {
                self.relative_key(file)
                    .map(|key| (key, (file, self.stat(file))))
            })
            .collect();

        for (relative_key, (file, record)) in &local {
            match remote.get(relative_key) {
                Some(object) => {
                    if !are_different(record, object) {
                        plan.skips.push(Skip {
                            identifier: relative_key.clone(),
                            size: record.size,
                        });
                        continue;
                    }

                    let conflict = Conflict::new(relative_key.clone(), record.mtime, object.mtime);
                    if conflict.is_tie() {
                        debug!("Equal mtimes for {}, remote copy wins", relative_key);
                    }
                    match conflict.resolve() {
                        ConflictResolution::Upload => plan.uploads.push(Upload {
                            local_path: file.path.clone(),
                            remote_key: object.key.clone(),
                            size: record.size,
                            role: file.role,
                        }),
                        ConflictResolution::Download => plan.downloads.push(Download {
                            local_path: file.path.clone(),
                            remote_key: object.key.clone(),
                            size: object.size,
                            relative_key: relative_key.clone(),
                        }),
                    }
                    plan.conflicts.push(conflict);
                }
                None => plan.uploads.push(Upload {
                    local_path: file.path.clone(),
                    remote_key: self.namespace.full_key(relative_key),
                    size: record.size,
                    role: file.role,
                }),
            }
        }

        for (relative_key, object) in remote {
            if local.contains_key(relative_key) {
                continue;
            }
            if let Some(target) = self.namespace.local_target(relative_key) {
                plan.downloads.push(Download {
                    local_path: target.path,
                    remote_key: object.key.clone(),
                    size: object.size,
                    relative_key: relative_key.clone(),
                });
            }
        }

        plan
    }
}

/// Runs the three sync modes against a context.
pub struct SyncEngine {
    ctx: SyncContext,
}

impl SyncEngine {
    pub fn new(ctx: SyncContext) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &SyncContext {
        &self.ctx
    }

    /// Upload local data.
    pub async fn push(&mut self, options: RunOptions) -> Result<SyncReport> {
        let files = self.ctx.local_files();
        if files.is_empty() {
            warn!("No files found to upload");
            return Ok(SyncReport::new(SyncMode::Push, &ActionSet::default(), options.dry_run));
        }

        let remote = if options.incremental || options.cleanup {
            info!("Analyzing existing remote objects...");
            self.ctx.list_remote().await?
        } else {
            RemoteListing::new()
        };

        let plan = self
            .ctx
            .plan_push(&files, &remote, options.incremental, options.cleanup);
        self.finish(SyncMode::Push, plan, options.dry_run).await
    }

    /// Download remote data.
    pub async fn pull(&mut self, options: RunOptions) -> Result<SyncReport> {
        info!("Analyzing remote objects...");
        let remote = self.ctx.list_remote().await?;
        if remote.is_empty() {
            warn!(
                "No objects found in store with prefix: {}",
                self.ctx.namespace.prefix()
            );
            return Ok(SyncReport::new(SyncMode::Pull, &ActionSet::default(), options.dry_run));
        }

        let local_files = options.cleanup.then(|| self.ctx.local_files());
        let plan = self
            .ctx
            .plan_pull(&remote, local_files.as_deref(), options.incremental);
        self.finish(SyncMode::Pull, plan, options.dry_run).await
    }

    /// Sync both ways. `options.cleanup` is accepted but deletes nothing.
    pub async fn sync(&mut self, options: RunOptions) -> Result<SyncReport> {
        info!("Starting bidirectional sync...");
        if options.cleanup {
            warn!("Cleanup has no effect in bidirectional mode");
        }

        let files = self.ctx.local_files();
        let remote = self.ctx.list_remote().await?;
        let plan = self.ctx.plan_bidirectional(&files, &remote);
        self.finish(SyncMode::Bidirectional, plan, options.dry_run).await
    }

    async fn finish(&mut self, mode: SyncMode, plan: ActionSet, dry_run: bool) -> Result<SyncReport> {
        plan.log_analysis();
        let mut report = SyncReport::new(mode, &plan, dry_run);

        if plan.is_noop() {
            info!("Everything is up to date!");
            return Ok(report);
        }

        if dry_run {
            log_dry_run(&plan);
            return Ok(report);
        }

        report.stats = Executor::new(&mut self.ctx).apply(&plan).await;
        info!("{} completed: {}", mode, report.stats);
        Ok(report)
    }
}

fn log_dry_run(plan: &ActionSet) {
    for upload in &plan.uploads {
        info!("[DRY RUN] upload {} -> {}", upload.local_path.display(), upload.remote_key);
    }
    for download in &plan.downloads {
        info!("[DRY RUN] download {} -> {}", download.remote_key, download.local_path.display());
    }
    for deletion in &plan.deletions {
        match &deletion.target {
            DeletionTarget::Remote { key } => info!("[DRY RUN] delete remote {}", key),
            DeletionTarget::Local { path } => info!("[DRY RUN] delete local {}", path.display()),
        }
    }
}
