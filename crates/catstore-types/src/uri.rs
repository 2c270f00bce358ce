use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::id::ContentId;

/// URI scheme of every content reference.
pub const CONTENT_SCHEME: &str = "content";

/// Reference string handed back to callers for a stored payload.
///
/// Always rendered as `content:{id}`.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentUri {
    id: ContentId,
}

impl ContentUri {
    /// The reference for a given content id.
    pub fn for_id(id: &ContentId) -> Self {
        Self { id: id.clone() }
    }

    /// Parse a `content:{id}` reference.
    pub fn parse(uri: &str) -> Result<Self, TypeError> {
        let (scheme, rest) = uri.split_once(':').ok_or_else(|| TypeError::InvalidUri {
            uri: uri.to_string(),
            reason: "missing scheme".into(),
        })?;
        if scheme != CONTENT_SCHEME {
            return Err(TypeError::InvalidUri {
                uri: uri.to_string(),
                reason: format!("unsupported scheme {scheme:?}"),
            });
        }
        let id = ContentId::new(rest).map_err(|e| TypeError::InvalidUri {
            uri: uri.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self { id })
    }

    /// The content id this reference points at.
    pub fn id(&self) -> &ContentId {
        &self.id
    }
}

impl fmt::Debug for ContentUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentUri({self})")
    }
}

impl fmt::Display for ContentUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{CONTENT_SCHEME}:{}", self.id)
    }
}

impl FromStr for ContentUri {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ContentUri {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ContentUri> for String {
    fn from(uri: ContentUri) -> Self {
        uri.to_string()
    }
}
