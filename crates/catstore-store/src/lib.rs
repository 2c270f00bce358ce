//! File-system content store for catstore.
//!
//! Payloads belonging to catalog records are kept in a sharded directory
//! tree. Every change goes through a transaction: writes and deletes are
//! staged under a caller-supplied [`TransactionId`] and only reach the
//! permanent store when that transaction commits.
//!
//! # Layout
//!
//! ```text
//! {base}/content/store/{shard1}/{shard2}/{id}/{filename}     permanent
//! {base}/content/store/tmp/{transaction}/{id}/{filename}     staging
//! ```
//!
//! See [`shard`] for how an id maps onto `shard1/shard2`.
//!
//! # Components
//!
//! - [`StagingArea`] -- writes payloads into per-transaction directories
//! - [`DeletionRegistry`] -- remembers which objects a transaction will delete
//! - [`CommitEngine`] -- the only component that mutates the permanent store
//! - [`ContentStream`] -- streaming read of a committed payload
//! - [`FileSystemContentStore`] -- ties the above together behind [`StorageProvider`]
//!
//! # Design Rules
//!
//! 1. Nothing is visible to readers until commit.
//! 2. Commit and rollback always leave the transaction empty.
//! 3. A leaf directory holds exactly one file; anything else is corruption.
//! 4. Staging is lock-free across transactions; commit, rollback and delete
//!    staging are serialized by one store-wide lock.
//! 5. Commit is not atomic across items: a mid-batch failure keeps the
//!    items installed before it.
//! 6. All I/O errors are propagated with the path they happened at.

pub mod commit;
pub mod config;
pub mod error;
mod fsutil;
pub mod item;
pub mod layout;
pub mod mime;
pub mod reader;
pub mod registry;
pub mod shard;
pub mod staging;
pub mod store;
pub mod traits;

pub use catstore_types::{ContentId, ContentUri, Record, RecordRef, TransactionId};
pub use commit::{CommitEngine, CommitOutcome};
pub use config::StoreConfig;
pub use error::{StoreError, StoreResult};
pub use item::{ContentItem, DeletionDescriptor, ResolvedContentItem, DEFAULT_FILE_NAME};
pub use layout::StoreLayout;
pub use mime::{DefaultMimeResolver, MimeResolver, DEFAULT_MIME_TYPE};
pub use reader::ContentStream;
pub use registry::DeletionRegistry;
pub use shard::{shard, ShardedPath};
pub use staging::StagingArea;
pub use store::FileSystemContentStore;
pub use traits::StorageProvider;
