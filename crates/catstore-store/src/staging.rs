use std::fs::{self, File};
use std::io::{self, BufWriter, Write};

use catstore_types::{ContentId, ContentUri, TransactionId};
use tracing::{debug, warn};

use crate::error::{IoContext, StoreResult};
use crate::fsutil;
use crate::item::{ContentItem, ResolvedContentItem};
use crate::layout::StoreLayout;

/// Writes payloads into per-transaction directories under the staging root.
///
/// Nothing here touches the permanent store. Distinct transactions write to
/// disjoint subtrees, so staging needs no lock.
#[derive(Clone, Debug)]
pub struct StagingArea {
    layout: StoreLayout,
}

impl StagingArea {
    pub fn new(layout: StoreLayout) -> Self {
        Self { layout }
    }

    /// Stage every item under `tmp/{txn}/{item.id}/{filename}`.
    ///
    /// The first I/O failure aborts the call. Items staged before it stay on
    /// disk until the transaction is rolled back.
    pub fn stage(
        &self,
        txn: &TransactionId,
        items: Vec<ContentItem>,
    ) -> StoreResult<Vec<ResolvedContentItem>> {
        items
            .into_iter()
            .map(|item| self.stage_one(txn, item))
            .collect()
    }

    fn stage_one(
        &self,
        txn: &TransactionId,
        mut item: ContentItem,
    ) -> StoreResult<ResolvedContentItem> {
        let filename = item.file_name()?;
        let dir = self.layout.staging_leaf(txn, &item.id);
        fs::create_dir_all(&dir).at(&dir)?;
        // Restaging an id within the same transaction replaces the earlier file.
        fsutil::empty_dir(&dir)?;

        let path = dir.join(&filename);
        let file = File::create(&path).at(&path)?;
        let mut writer = BufWriter::new(file);
        let copied = io::copy(&mut item.source, &mut writer).at(&path)?;
        writer.flush().at(&path)?;

        if copied != item.size {
            warn!(
                transaction = %txn,
                id = %item.id,
                declared = item.size,
                actual = copied,
                "staged size does not match declared size"
            );
        }
        debug!(transaction = %txn, id = %item.id, bytes = copied, "staged content");

        Ok(ResolvedContentItem {
            uri: ContentUri::for_id(&item.id),
            id: item.id,
            path,
            size: copied,
            mime_type: item.mime_type,
            filename,
            record: item.record,
        })
    }

    /// Whether `txn` has a staging directory.
    pub fn has_transaction(&self, txn: &TransactionId) -> bool {
        self.layout.transaction_dir(txn).is_dir()
    }

    /// Ids staged under `txn`, sorted.
    pub fn staged_ids(&self, txn: &TransactionId) -> StoreResult<Vec<ContentId>> {
        let dir = self.layout.transaction_dir(txn);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        Ok(fsutil::list_dir(&dir)?
            .into_iter()
            .filter(|entry| entry.file_type().map(|t| t.is_dir()).unwrap_or(false))
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter_map(|name| ContentId::new(name).ok())
            .collect())
    }

    /// Delete the staging tree of `txn`. Returns whether anything was there.
    pub fn purge(&self, txn: &TransactionId) -> StoreResult<bool> {
        fsutil::remove_tree(&self.layout.transaction_dir(txn))
    }

    /// Transactions with a staging directory on disk, sorted.
    ///
    /// Names that cannot be transaction ids are skipped; these include the
    /// three-character shard directories of ids that begin with `tmp`.
    pub fn pending(&self) -> StoreResult<Vec<TransactionId>> {
        if !self.layout.staging_root().is_dir() {
            return Ok(Vec::new());
        }
        Ok(fsutil::list_dir(self.layout.staging_root())?
            .into_iter()
            .filter(|entry| entry.file_type().map(|t| t.is_dir()).unwrap_or(false))
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter_map(|name| TransactionId::new(name).ok())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use std::sync::Arc;
    use std::thread;

    fn setup() -> (tempfile::TempDir, StagingArea, StoreLayout) {
        let dir = tempfile::tempdir().unwrap();
        let layout = StoreLayout::open(dir.path()).unwrap();
        (dir, StagingArea::new(layout.clone()), layout)
    }

    fn txn(s: &str) -> TransactionId {
        TransactionId::new(s).unwrap()
    }

    fn item(id: &str, bytes: &[u8]) -> ContentItem {
        ContentItem::from_bytes(ContentId::new(id).unwrap(), bytes.to_vec(), "text/plain")
            .with_filename(format!("{id}.txt"))
    }

    #[test]
    fn stage_writes_under_transaction_dir() {
        let (_dir, staging, layout) = setup();
        let t = txn("txn-1");
        let resolved = staging.stage(&t, vec![item("abc123", b"hello")]).unwrap();

        assert_eq!(resolved.len(), 1);
        let r = &resolved[0];
        assert_eq!(r.size, 5);
        assert_eq!(r.uri.to_string(), "content:abc123");
        assert_eq!(r.mime_type, "text/plain");
        assert_eq!(r.path, layout.store_root().join("tmp/txn-1/abc123/abc123.txt"));
        assert!(r.path.is_absolute());
        assert_eq!(fs::read(&r.path).unwrap(), b"hello");
        assert!(staging.has_transaction(&t));
    }

    #[test]
    fn size_mismatch_is_not_fatal() {
        let (_dir, staging, _) = setup();
        let id = ContentId::new("abc").unwrap();
        let item = ContentItem::new(id, io::Cursor::new(b"four".to_vec()), 99, "text/plain");
        let resolved = staging.stage(&txn("txn-1"), vec![item]).unwrap();
        assert_eq!(resolved[0].size, 4);
    }

    #[test]
    fn restaging_replaces_previous_file() {
        let (_dir, staging, layout) = setup();
        let t = txn("txn-1");
        staging.stage(&t, vec![item("abc", b"one")]).unwrap();
        let id = ContentId::new("abc").unwrap();
        let second = ContentItem::from_bytes(id.clone(), b"two".to_vec(), "text/plain");
        staging.stage(&t, vec![second]).unwrap();

        let leaf = layout.staging_leaf(&t, &id);
        let names: Vec<_> = fs::read_dir(&leaf).unwrap().map(|e| e.unwrap().file_name()).collect();
        assert_eq!(names.len(), 1);
    }

    #[test]
    fn failure_aborts_but_keeps_earlier_items() {
        struct Broken;
        impl Read for Broken {
            fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::Other, "source failed"))
            }
        }

        let (_dir, staging, layout) = setup();
        let t = txn("txn-1");
        let broken = ContentItem::new(ContentId::new("bad").unwrap(), Broken, 1, "text/plain");
        let err = staging.stage(&t, vec![item("good", b"ok"), broken]).unwrap_err();
        assert!(matches!(err, crate::StoreError::Io { .. }));

        let good = layout.staging_leaf(&t, &ContentId::new("good").unwrap());
        assert!(good.join("good.txt").exists());
    }

    #[test]
    fn staged_ids_and_pending() {
        let (_dir, staging, _) = setup();
        staging.stage(&txn("txn-b"), vec![item("two", b"2"), item("one", b"1")]).unwrap();
        staging.stage(&txn("txn-a"), vec![item("three", b"3")]).unwrap();

        let ids: Vec<_> = staging.staged_ids(&txn("txn-b")).unwrap();
        assert_eq!(ids, [ContentId::new("one").unwrap(), ContentId::new("two").unwrap()]);
        assert_eq!(staging.pending().unwrap(), [txn("txn-a"), txn("txn-b")]);
        assert!(staging.staged_ids(&txn("none")).unwrap().is_empty());
    }

    #[test]
    fn pending_skips_shard_directories() {
        let (_dir, staging, layout) = setup();
        // Permanent shard of an id such as "tmpabc1".
        fs::create_dir_all(layout.staging_root().join("abc/tmpabc1")).unwrap();
        assert!(staging.pending().unwrap().is_empty());
    }

    #[test]
    fn purge_is_idempotent() {
        let (_dir, staging, _) = setup();
        let t = txn("txn-1");
        staging.stage(&t, vec![item("abc", b"x")]).unwrap();
        assert!(staging.purge(&t).unwrap());
        assert!(!staging.has_transaction(&t));
        assert!(!staging.purge(&t).unwrap());
    }

    #[test]
    fn concurrent_transactions_stay_disjoint() {
        let (_dir, staging, layout) = setup();
        let staging = Arc::new(staging);

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let staging = Arc::clone(&staging);
                thread::spawn(move || {
                    let t = txn(&format!("txn-{i}"));
                    let items = (0..4)
                        .map(|j| item(&format!("id{j}"), format!("{i}:{j}").as_bytes()))
                        .collect();
                    staging.stage(&t, items).unwrap();
                })
            })
            .collect();
        for h in handles {
            h.join().expect("thread should not panic");
        }

        for i in 0..8 {
            let t = txn(&format!("txn-{i}"));
            for j in 0..4 {
                let id = ContentId::new(format!("id{j}")).unwrap();
                let path = layout.staging_leaf(&t, &id).join(format!("id{j}.txt"));
                assert_eq!(fs::read(path).unwrap(), format!("{i}:{j}").as_bytes());
            }
        }
    }
}
