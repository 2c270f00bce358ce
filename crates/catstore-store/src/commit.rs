//! Applies a transaction's staged writes or deletes to the permanent store.
//!
//! The engine is the only component that mutates the permanent tree. It does
//! not clean up staging state itself; the store always rolls the transaction
//! back after calling into it, whatever the outcome.
//!
//! A commit is not atomic across items. If the third of five staged items
//! fails to install, the first two stay committed and the error is returned.

use std::fs;
use std::io;
use std::path::Path;

use catstore_types::{ContentId, TransactionId};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{IoContext, StoreError, StoreResult};
use crate::fsutil;
use crate::item::DeletionDescriptor;
use crate::layout::StoreLayout;
use crate::shard::ShardedPath;

/// What a commit did.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "ids", rename_all = "snake_case")]
pub enum CommitOutcome {
    /// Staged payloads were installed.
    Written(Vec<ContentId>),
    /// Permanent objects were removed.
    Deleted(Vec<ContentId>),
    /// Nothing was staged for the transaction.
    NoOp,
}

/// Moves staged leaves into the permanent store and removes deleted ones.
#[derive(Clone, Debug)]
pub struct CommitEngine {
    layout: StoreLayout,
}

impl CommitEngine {
    pub fn new(layout: StoreLayout) -> Self {
        Self { layout }
    }

    /// Install every staged leaf of `txn`, replacing existing objects.
    pub fn commit_writes(&self, txn: &TransactionId) -> StoreResult<Vec<ContentId>> {
        let txn_dir = self.layout.transaction_dir(txn);
        let mut installed = Vec::new();

        for entry in fsutil::list_dir(&txn_dir)? {
            let staged = entry.path();
            if !entry.file_type().at(&staged)?.is_dir() {
                warn!(transaction = %txn, path = %staged.display(), "ignoring stray file in staging");
                continue;
            }
            let Some(id) = entry
                .file_name()
                .into_string()
                .ok()
                .and_then(|name| ContentId::new(name).ok())
            else {
                warn!(transaction = %txn, path = %staged.display(), "ignoring unrecognized staging entry");
                continue;
            };

            self.install(&id, &staged, |from, to| fs::rename(from, to))?;
            installed.push(id);
        }

        info!(transaction = %txn, count = installed.len(), "committed staged writes");
        Ok(installed)
    }

    /// Move one staged leaf onto its permanent location.
    ///
    /// `rename` is attempted first; when it fails (typically across devices)
    /// the staged files are copied instead.
    fn install<R>(&self, id: &ContentId, staged: &Path, rename: R) -> StoreResult<()>
    where
        R: Fn(&Path, &Path) -> io::Result<()>,
    {
        let sharded = ShardedPath::of(id);
        let target = self.layout.permanent_leaf(&sharded);

        if target.is_dir() {
            debug!(id = %id, "replacing existing content");
            fsutil::remove_leaf(&target)?;
        }
        let parent = sharded.shard2_dir(self.layout.store_root());
        fs::create_dir_all(&parent).at(&parent)?;

        match rename(staged, &target) {
            Ok(()) => {
                debug!(id = %id, target = %target.display(), "installed by rename");
                Ok(())
            }
            Err(e) => {
                warn!(id = %id, error = %e, "rename failed; falling back to copy");
                copy_leaf(staged, &target)
            }
        }
    }

    /// Remove every object in `descriptors` and prune emptied shard
    /// directories.
    ///
    /// An object that vanished since it was staged is an
    /// [`StoreError::InconsistentState`] and stops the commit.
    pub fn commit_deletes(&self, descriptors: &[DeletionDescriptor]) -> StoreResult<Vec<ContentId>> {
        let root = self.layout.store_root();
        let mut removed = Vec::with_capacity(descriptors.len());

        for descriptor in descriptors {
            let sharded = ShardedPath::of(&descriptor.id);
            let leaf = sharded.leaf_dir(root);
            if !leaf.is_dir() {
                return Err(StoreError::InconsistentState {
                    id: descriptor.id.clone(),
                    path: leaf,
                });
            }

            fsutil::remove_leaf(&leaf)?;
            let shard1 = sharded.shard1_dir(root);
            // Ids beginning with `tmp` shard under the staging root, which stays.
            if fsutil::remove_dir_if_empty(&sharded.shard2_dir(root))?
                && shard1 != self.layout.staging_root()
            {
                fsutil::remove_dir_if_empty(&shard1)?;
            }
            debug!(id = %descriptor.id, "removed content");
            removed.push(descriptor.id.clone());
        }

        info!(count = removed.len(), "committed staged deletions");
        Ok(removed)
    }
}

/// Copy the files of a staged leaf into a fresh permanent leaf.
fn copy_leaf(staged: &Path, target: &Path) -> StoreResult<()> {
    fsutil::remove_tree(target)?;
    fs::create_dir_all(target).at(target)?;
    for entry in fsutil::list_dir(staged)? {
        let from = entry.path();
        let to = target.join(entry.file_name());
        fs::copy(&from, &to).at(&from)?;
    }
    Ok(())
}
