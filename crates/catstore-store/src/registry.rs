use std::sync::Arc;

use catstore_types::{ContentId, ContentUri, Record, TransactionId};
use dashmap::DashMap;
use tracing::debug;

use crate::error::StoreResult;
use crate::item::DeletionDescriptor;
use crate::layout::StoreLayout;
use crate::shard::ShardedPath;

/// In-memory record of which permanent objects each transaction will delete.
///
/// Staging a delete never touches the disk; it only remembers what a later
/// commit should remove.
#[derive(Debug, Default)]
pub struct DeletionRegistry {
    entries: DashMap<TransactionId, Vec<DeletionDescriptor>>,
}

impl DeletionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `records` against the permanent store and remember the ones
    /// that exist under `txn`.
    ///
    /// Records whose object is not in the store are skipped without error.
    /// Repeated calls for one transaction accumulate; an id is only
    /// remembered once.
    pub fn stage(
        &self,
        layout: &StoreLayout,
        txn: &TransactionId,
        records: &[Arc<dyn Record>],
    ) -> StoreResult<Vec<DeletionDescriptor>> {
        let mut found = Vec::with_capacity(records.len());
        for record in records {
            let id = ContentId::new(record.id())?;
            if !layout.permanent_leaf(&ShardedPath::of(&id)).is_dir() {
                debug!(transaction = %txn, id = %id, "delete requested for unknown content; skipping");
                continue;
            }
            found.push(DeletionDescriptor {
                uri: ContentUri::for_id(&id),
                id,
                record: Arc::clone(record),
            });
        }

        let mut entry = self.entries.entry(txn.clone()).or_default();
        for descriptor in &found {
            if !entry.iter().any(|d| d.id == descriptor.id) {
                entry.push(descriptor.clone());
            }
        }
        debug!(transaction = %txn, staged = found.len(), total = entry.len(), "staged deletions");
        Ok(found)
    }

    /// Descriptors remembered for `txn`.
    pub fn get(&self, txn: &TransactionId) -> Option<Vec<DeletionDescriptor>> {
        self.entries.get(txn).map(|entry| entry.value().clone())
    }

    /// Forget `txn`. Returns whether it was present.
    pub fn remove(&self, txn: &TransactionId) -> bool {
        self.entries.remove(txn).is_some()
    }

    pub fn contains(&self, txn: &TransactionId) -> bool {
        self.entries.contains_key(txn)
    }

    /// Number of transactions holding staged deletions.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
