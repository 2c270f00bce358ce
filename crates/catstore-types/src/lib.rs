//! Foundation types for the catstore content store.
//!
//! Every other catstore crate depends on `catstore-types`. The types here are
//! deliberately small: they name things, validate them, and nothing more.
//!
//! # Key Types
//!
//! - [`ContentId`] -- Opaque identifier of one stored payload
//! - [`TransactionId`] -- Caller-supplied token grouping staged writes or deletes
//! - [`ContentUri`] -- The `content:{id}` reference string handed back to callers
//! - [`Record`] -- Capability of a catalog metadata record to name its content

pub mod error;
pub mod id;
pub mod record;
pub mod uri;

pub use error::TypeError;
pub use id::{validate_file_name, ContentId, TransactionId};
pub use record::{Record, RecordRef};
pub use uri::ContentUri;
