use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Characters that may never appear in an id. Ids become directory names.
const FORBIDDEN_CHARS: &[char] = &['/', '\\', '\0'];

/// Minimum length of a transaction id, in characters.
///
/// Staging directories live next to the three-character `shard2` directories
/// of ids beginning with `tmp`; a transaction id of four or more characters
/// can never alias one of them.
pub const MIN_TRANSACTION_ID_LEN: usize = 4;

/// Check that `value` can be used as a single path component.
fn path_component_problem(value: &str) -> Option<String> {
    if value.is_empty() {
        return Some("must not be empty".into());
    }
    if value == "." || value == ".." {
        return Some("must not be a relative directory marker".into());
    }
    FORBIDDEN_CHARS
        .iter()
        .find(|ch| value.contains(**ch))
        .map(|ch| format!("contains forbidden character: {ch:?}"))
}

/// Check that `name` can be stored as the single file of a leaf directory.
pub fn validate_file_name(name: &str) -> Result<(), TypeError> {
    match path_component_problem(name) {
        Some(reason) => Err(TypeError::InvalidFileName {
            name: name.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}

/// Opaque identifier of one stored payload.
///
/// Immutable once assigned. A `ContentId` is never empty and is always a
/// single safe path component, so it can be used directly as the leaf
/// directory of the permanent store.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentId(String);

impl ContentId {
    /// Validate and wrap an id.
    pub fn new(id: impl Into<String>) -> Result<Self, TypeError> {
        let id = id.into();
        match path_component_problem(&id) {
            Some(reason) => Err(TypeError::InvalidContentId { id, reason }),
            None => Ok(Self(id)),
        }
    }

    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the id, returning the inner string.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Debug for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentId({})", self.0)
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ContentId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for ContentId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for ContentId {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ContentId> for String {
    fn from(id: ContentId) -> Self {
        id.0
    }
}

/// Caller-supplied token grouping a set of staged writes or staged deletes.
///
/// Transaction ids name a directory under the staging root, so they follow
/// the same rules as [`ContentId`] and must additionally be at least
/// [`MIN_TRANSACTION_ID_LEN`] characters long.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TransactionId(String);

impl TransactionId {
    /// Validate and wrap a transaction id.
    pub fn new(id: impl Into<String>) -> Result<Self, TypeError> {
        let id = id.into();
        if let Some(reason) = path_component_problem(&id) {
            return Err(TypeError::InvalidTransactionId { id, reason });
        }
        if id.chars().count() < MIN_TRANSACTION_ID_LEN {
            return Err(TypeError::InvalidTransactionId {
                id,
                reason: format!("must be at least {MIN_TRANSACTION_ID_LEN} characters"),
            });
        }
        Ok(Self(id))
    }

    /// Mint a fresh, time-ordered transaction id (UUID v7).
    pub fn generate() -> Self {
        Self(uuid::Uuid::now_v7().to_string())
    }

    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TransactionId({})", self.0)
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TransactionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for TransactionId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for TransactionId {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TransactionId> for String {
    fn from(id: TransactionId) -> Self {
        id.0
    }
}
