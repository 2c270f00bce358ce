use std::fmt;
use std::path::Path;
use std::sync::Arc;

use catstore_types::{ContentId, Record, TransactionId};
use dashmap::DashSet;
use parking_lot::Mutex;
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

use crate::commit::{CommitEngine, CommitOutcome};
use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::item::{ContentItem, DeletionDescriptor, ResolvedContentItem};
use crate::layout::StoreLayout;
use crate::mime::{DefaultMimeResolver, MimeResolver};
use crate::reader::{self, ContentStream};
use crate::registry::DeletionRegistry;
use crate::shard::ShardedPath;
use crate::staging::StagingArea;
use crate::traits::StorageProvider;

/// Content store backed by a sharded directory tree.
///
/// Staging is lock-free across distinct transactions. Commit, rollback,
/// delete staging and staging recovery share one coarse lock, since they
/// touch the shared shard directories and the deletion registry.
pub struct FileSystemContentStore {
    layout: StoreLayout,
    staging: StagingArea,
    registry: DeletionRegistry,
    /// Transactions this instance has staged writes for and not yet finished.
    live: DashSet<TransactionId>,
    engine: CommitEngine,
    resolver: Box<dyn MimeResolver>,
    lock: Mutex<()>,
}

impl FileSystemContentStore {
    /// Open (creating if needed) the store described by `config`.
    pub fn open(config: &StoreConfig) -> StoreResult<Self> {
        Self::open_at(&config.resolve_base_directory())
    }

    /// Open (creating if needed) the store under `base`.
    pub fn open_at(base: &Path) -> StoreResult<Self> {
        let layout = StoreLayout::open(base)?;
        info!(store = %layout.store_root().display(), "content store opened");
        Ok(Self {
            staging: StagingArea::new(layout.clone()),
            engine: CommitEngine::new(layout.clone()),
            registry: DeletionRegistry::new(),
            live: DashSet::new(),
            resolver: Box::new(DefaultMimeResolver),
            lock: Mutex::new(()),
            layout,
        })
    }

    /// Replace the content type resolver.
    pub fn with_mime_resolver(mut self, resolver: impl MimeResolver + 'static) -> Self {
        self.resolver = Box::new(resolver);
        self
    }

    pub fn layout(&self) -> &StoreLayout {
        &self.layout
    }

    /// Whether a committed payload exists for `id`.
    pub fn contains(&self, id: &ContentId) -> bool {
        self.layout.permanent_leaf(&ShardedPath::of(id)).is_dir()
    }

    /// Deletions currently staged under `txn`.
    pub fn staged_deletions(&self, txn: &TransactionId) -> Option<Vec<DeletionDescriptor>> {
        self.registry.get(txn)
    }

    /// Ids currently staged for writing under `txn`.
    pub fn staged_writes(&self, txn: &TransactionId) -> StoreResult<Vec<ContentId>> {
        self.staging.staged_ids(txn)
    }

    /// Every committed id, sorted.
    ///
    /// Only leaf directories sitting at their own sharded location count, so
    /// staging entries are never reported.
    pub fn list_ids(&self) -> StoreResult<Vec<ContentId>> {
        let root = self.layout.store_root();
        let mut ids = Vec::new();
        for entry in WalkDir::new(root).min_depth(3).max_depth(3) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if e.io_error().map(std::io::Error::kind) == Some(std::io::ErrorKind::NotFound) => {
                    continue
                }
                Err(e) => {
                    let path = e.path().unwrap_or(root).to_path_buf();
                    return Err(StoreError::io(path, e.into()));
                }
            };
            if !entry.file_type().is_dir() {
                continue;
            }
            if let Some(id) = sharded_id_at(root, entry.path()) {
                ids.push(id);
            }
        }
        ids.sort();
        Ok(ids)
    }

    /// Transactions with staged writes on disk.
    pub fn pending_transactions(&self) -> StoreResult<Vec<TransactionId>> {
        self.staging.pending()
    }

    /// Roll back every transaction left on disk, e.g. by a process that died
    /// between staging and commit. Returns the transactions purged.
    ///
    /// Transactions still open on this instance are left alone.
    pub fn recover_staging(&self) -> StoreResult<Vec<TransactionId>> {
        let _guard = self.lock.lock();
        let mut purged = Vec::new();
        for txn in self.staging.pending()? {
            if self.live.contains(&txn) {
                debug!(transaction = %txn, "skipping live transaction during recovery");
                continue;
            }
            self.rollback_locked(&txn)?;
            purged.push(txn);
        }
        if !purged.is_empty() {
            warn!(count = purged.len(), "purged abandoned staging transactions");
        }
        Ok(purged)
    }

    fn stage(
        &self,
        op: &'static str,
        txn: &TransactionId,
        items: Vec<ContentItem>,
    ) -> StoreResult<Vec<ResolvedContentItem>> {
        if self.registry.contains(txn) {
            warn!(transaction = %txn, "transaction already holds staged deletions; commit will apply writes only");
        }
        debug!(transaction = %txn, op, count = items.len(), "staging content");
        // Must precede the first write; recovery only skips registered transactions.
        self.live.insert(txn.clone());
        self.staging.stage(txn, items)
    }

    fn rollback_locked(&self, txn: &TransactionId) -> StoreResult<()> {
        self.live.remove(txn);
        let had_deletes = self.registry.remove(txn);
        let had_writes = self.staging.purge(txn)?;
        if had_deletes || had_writes {
            debug!(transaction = %txn, had_deletes, had_writes, "rolled back");
        } else {
            info!(transaction = %txn, "nothing staged; rollback is a no-op");
        }
        Ok(())
    }

    /// Apply `txn` and then run `cleanup`, whatever the outcome.
    ///
    /// A cleanup failure after a successful commit is returned. When both
    /// fail the commit error wins and the cleanup error is logged.
    fn commit_locked<C>(&self, txn: &TransactionId, cleanup: C) -> StoreResult<CommitOutcome>
    where
        C: FnOnce(&TransactionId) -> StoreResult<()>,
    {
        let result = if self.staging.has_transaction(txn) {
            self.engine.commit_writes(txn).map(CommitOutcome::Written)
        } else if let Some(descriptors) = self.registry.get(txn) {
            self.engine.commit_deletes(&descriptors).map(CommitOutcome::Deleted)
        } else {
            self.live.remove(txn);
            info!(transaction = %txn, "nothing staged; commit is a no-op");
            return Ok(CommitOutcome::NoOp);
        };

        match (result, cleanup(txn)) {
            (Ok(outcome), Ok(())) => Ok(outcome),
            (Ok(_), Err(e)) | (Err(e), Ok(())) => Err(e),
            (Err(e), Err(cleanup_err)) => {
                error!(
                    transaction = %txn,
                    error = %cleanup_err,
                    "cleanup after failed commit also failed"
                );
                Err(e)
            }
        }
    }
}

/// The id whose sharded location is `root/shard1/shard2/leaf`, if `path` is one.
fn sharded_id_at(root: &Path, path: &Path) -> Option<ContentId> {
    let rel = path.strip_prefix(root).ok()?;
    let mut parts = rel.iter().map(|p| p.to_str());
    let (shard1, shard2, leaf) = (parts.next()??, parts.next()??, parts.next()??);
    let id = ContentId::new(leaf).ok()?;
    let sharded = ShardedPath::of(&id);
    (sharded.shard1 == shard1 && sharded.shard2 == shard2).then_some(id)
}

impl StorageProvider for FileSystemContentStore {
    fn create(
        &self,
        txn: &TransactionId,
        items: Vec<ContentItem>,
    ) -> StoreResult<Vec<ResolvedContentItem>> {
        self.stage("create", txn, items)
    }

    fn update(
        &self,
        txn: &TransactionId,
        items: Vec<ContentItem>,
    ) -> StoreResult<Vec<ResolvedContentItem>> {
        self.stage("update", txn, items)
    }

    fn delete(
        &self,
        txn: &TransactionId,
        records: &[Arc<dyn Record>],
    ) -> StoreResult<Vec<DeletionDescriptor>> {
        let _guard = self.lock.lock();
        if self.staging.has_transaction(txn) {
            warn!(transaction = %txn, "transaction already holds staged writes; commit will apply writes only");
        }
        self.registry.stage(&self.layout, txn, records)
    }

    fn commit(&self, txn: &TransactionId) -> StoreResult<CommitOutcome> {
        let _guard = self.lock.lock();
        self.commit_locked(txn, |txn| self.rollback_locked(txn))
    }

    fn rollback(&self, txn: &TransactionId) -> StoreResult<()> {
        let _guard = self.lock.lock();
        self.rollback_locked(txn)
    }

    fn read(&self, id: &ContentId) -> StoreResult<ContentStream> {
        reader::open(&self.layout, self.resolver.as_ref(), id)
    }
}

impl fmt::Debug for FileSystemContentStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileSystemContentStore")
            .field("store_root", &self.layout.store_root())
            .field("staged_delete_transactions", &self.registry.len())
            .finish()
    }
}
