use thiserror::Error;

/// Errors produced by type construction and parsing.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid content id {id:?}: {reason}")]
    InvalidContentId { id: String, reason: String },

    #[error("invalid transaction id {id:?}: {reason}")]
    InvalidTransactionId { id: String, reason: String },

    #[error("invalid file name {name:?}: {reason}")]
    InvalidFileName { name: String, reason: String },

    #[error("invalid content uri {uri:?}: {reason}")]
    InvalidUri { uri: String, reason: String },
}
