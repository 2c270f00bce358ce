use std::fmt::Debug;

use serde::{Deserialize, Serialize};

/// A catalog metadata record, as far as the content store cares about it.
///
/// The store only ever asks a record for the id of the content it owns;
/// every other attribute belongs to the catalog.
pub trait Record: Debug + Send + Sync {
    /// Id of the content payload owned by this record.
    fn id(&self) -> &str;
}

/// Minimal record carrying nothing but an id.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordRef {
    pub id: String,
}

impl RecordRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

impl Record for RecordRef {
    fn id(&self) -> &str {
        &self.id
    }
}
