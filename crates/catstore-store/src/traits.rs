use std::sync::Arc;

use catstore_types::{ContentId, ContentUri, Record, TransactionId};

use crate::commit::CommitOutcome;
use crate::error::{StoreError, StoreResult};
use crate::item::{ContentItem, DeletionDescriptor, ResolvedContentItem};
use crate::reader::ContentStream;

/// Transactional content storage.
///
/// All implementations must satisfy these invariants:
/// - `create`, `update` and `delete` only stage; nothing is visible to `read`
///   until `commit`.
/// - `commit` is the only operation that mutates the permanent store, and it
///   always leaves the transaction empty, whether it succeeds or fails.
/// - `rollback` never touches the permanent store and is idempotent.
/// - A transaction holds either staged writes or staged deletes, not both.
pub trait StorageProvider: Send + Sync {
    /// Stage new payloads under `txn`.
    fn create(
        &self,
        txn: &TransactionId,
        items: Vec<ContentItem>,
    ) -> StoreResult<Vec<ResolvedContentItem>>;

    /// Stage replacement payloads under `txn`. The existing objects are
    /// removed when the transaction commits.
    fn update(
        &self,
        txn: &TransactionId,
        items: Vec<ContentItem>,
    ) -> StoreResult<Vec<ResolvedContentItem>>;

    /// Stage removal of the payloads owned by `records`.
    ///
    /// Records without a stored payload are skipped.
    fn delete(
        &self,
        txn: &TransactionId,
        records: &[Arc<dyn Record>],
    ) -> StoreResult<Vec<DeletionDescriptor>>;

    /// Apply whatever `txn` staged.
    fn commit(&self, txn: &TransactionId) -> StoreResult<CommitOutcome>;

    /// Discard whatever `txn` staged.
    fn rollback(&self, txn: &TransactionId) -> StoreResult<()>;

    /// Open a committed payload.
    fn read(&self, id: &ContentId) -> StoreResult<ContentStream>;

    /// Open a committed payload by its `content:{id}` reference.
    fn read_uri(&self, uri: &str) -> StoreResult<ContentStream> {
        let uri = ContentUri::parse(uri).map_err(|e| StoreError::InvalidUri(e.to_string()))?;
        self.read(uri.id())
    }
}
