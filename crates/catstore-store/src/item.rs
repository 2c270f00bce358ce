use std::fmt;
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use catstore_types::{validate_file_name, ContentId, ContentUri, Record};

use crate::error::StoreResult;

/// Filename used when a caller does not supply one.
pub const DEFAULT_FILE_NAME: &str = "content_store_file.bin";

/// A payload handed to the store for create or update.
///
/// The byte source is consumed when the item is staged.
pub struct ContentItem {
    pub id: ContentId,
    pub source: Box<dyn Read + Send>,
    /// Size the caller declares; checked against the bytes actually copied.
    pub size: u64,
    pub mime_type: String,
    pub filename: Option<String>,
    pub record: Option<Arc<dyn Record>>,
}

impl ContentItem {
    pub fn new(
        id: ContentId,
        source: impl Read + Send + 'static,
        size: u64,
        mime_type: impl Into<String>,
    ) -> Self {
        Self {
            id,
            source: Box::new(source),
            size,
            mime_type: mime_type.into(),
            filename: None,
            record: None,
        }
    }

    /// An item backed by an in-memory buffer; the declared size is its length.
    pub fn from_bytes(id: ContentId, bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        let size = bytes.len() as u64;
        Self::new(id, std::io::Cursor::new(bytes), size, mime_type)
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn with_record(mut self, record: Arc<dyn Record>) -> Self {
        self.record = Some(record);
        self
    }

    /// The validated name the payload is stored under.
    pub fn file_name(&self) -> StoreResult<String> {
        match &self.filename {
            Some(name) => {
                validate_file_name(name)?;
                Ok(name.clone())
            }
            None => Ok(DEFAULT_FILE_NAME.to_string()),
        }
    }
}

impl fmt::Debug for ContentItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContentItem")
            .field("id", &self.id)
            .field("size", &self.size)
            .field("mime_type", &self.mime_type)
            .field("filename", &self.filename)
            .field("record", &self.record)
            .finish_non_exhaustive()
    }
}

/// A payload as the store sees it after create or update.
#[derive(Clone, Debug)]
pub struct ResolvedContentItem {
    pub id: ContentId,
    pub uri: ContentUri,
    /// Absolute path of the staged file.
    pub path: PathBuf,
    /// Bytes actually written.
    pub size: u64,
    pub mime_type: String,
    pub filename: String,
    pub record: Option<Arc<dyn Record>>,
}

/// A permanent object slated for removal by a transaction.
#[derive(Clone, Debug)]
pub struct DeletionDescriptor {
    pub id: ContentId,
    pub uri: ContentUri,
    pub record: Arc<dyn Record>,
}
