use std::io;
use std::path::PathBuf;

use catstore_types::{ContentId, TypeError};

/// Errors from content store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// I/O error while reading or writing the store on disk.
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The requested content id is unknown to the store.
    #[error("content not found: {0}")]
    NotFound(ContentId),

    /// A leaf directory does not hold exactly one regular file.
    #[error("corrupted store entry {id}: {reason}")]
    CorruptedStore { id: ContentId, reason: String },

    /// A permanent object vanished between staging and commit.
    #[error("inconsistent state: {id} expected at {} but missing", path.display())]
    InconsistentState { id: ContentId, path: PathBuf },

    /// An id, transaction id or filename failed validation.
    #[error(transparent)]
    InvalidId(#[from] TypeError),

    /// A content reference could not be parsed.
    #[error("invalid content uri: {0}")]
    InvalidUri(String),

    /// The store configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(String),
}

impl StoreError {
    /// Wrap an I/O error with the path it happened at.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Attach a path to an `io::Result`.
pub(crate) trait IoContext<T> {
    fn at(self, path: impl Into<PathBuf>) -> StoreResult<T>;
}

impl<T> IoContext<T> for io::Result<T> {
    fn at(self, path: impl Into<PathBuf>) -> StoreResult<T> {
        self.map_err(|source| StoreError::io(path, source))
    }
}
