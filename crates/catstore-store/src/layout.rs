use std::fs;
use std::path::{Path, PathBuf};

use catstore_types::{ContentId, TransactionId};
use tracing::debug;

use crate::error::{IoContext, StoreResult};
use crate::shard::ShardedPath;

pub const CONTENT_DIR: &str = "content";
pub const STORE_DIR: &str = "store";
pub const STAGING_DIR: &str = "tmp";

/// On-disk layout of a store.
///
/// ```text
/// {base}/content/store/{shard1}/{shard2}/{id}/{filename}        permanent
/// {base}/content/store/tmp/{transaction}/{id}/{filename}        staging
/// ```
#[derive(Clone, Debug)]
pub struct StoreLayout {
    store_root: PathBuf,
    staging_root: PathBuf,
}

impl StoreLayout {
    /// Create the store and staging directories under `base` if missing.
    ///
    /// The returned roots are absolute.
    pub fn open(base: &Path) -> StoreResult<Self> {
        let store_root = base.join(CONTENT_DIR).join(STORE_DIR);
        let staging_root = store_root.join(STAGING_DIR);
        fs::create_dir_all(&staging_root).at(&staging_root)?;
        let store_root = fs::canonicalize(&store_root).at(&store_root)?;
        let staging_root = store_root.join(STAGING_DIR);
        debug!(store = %store_root.display(), "opened store layout");
        Ok(Self {
            store_root,
            staging_root,
        })
    }

    /// Root of the permanent store.
    pub fn store_root(&self) -> &Path {
        &self.store_root
    }

    /// Root under which every transaction stages.
    pub fn staging_root(&self) -> &Path {
        &self.staging_root
    }

    /// `tmp/{transaction}`.
    pub fn transaction_dir(&self, txn: &TransactionId) -> PathBuf {
        self.staging_root.join(txn.as_str())
    }

    /// `tmp/{transaction}/{id}`.
    pub fn staging_leaf(&self, txn: &TransactionId, id: &ContentId) -> PathBuf {
        self.transaction_dir(txn).join(id.as_str())
    }

    /// `{shard1}/{shard2}/{id}` under the store root.
    pub fn permanent_leaf(&self, sharded: &ShardedPath) -> PathBuf {
        sharded.leaf_dir(&self.store_root)
    }
}
