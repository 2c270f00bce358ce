//! Deterministic mapping from a content id to its directory in the store.
//!
//! An id is right-padded with `'0'` to six characters; the first three
//! characters name the top-level shard, the next three the second-level
//! shard, and the unpadded id names the leaf:
//!
//! ```text
//! abcdef123456  ->  abc/def/abcdef123456/
//! 42            ->  420/000/42/
//! ```
//!
//! Two fixed-width levels bound the number of entries in any one directory,
//! and because the leaf is the full id two ids never share a leaf.

use std::path::{Path, PathBuf};

use catstore_types::ContentId;

use crate::error::StoreResult;

/// Width, in characters, of each shard directory name.
pub const SHARD_WIDTH: usize = 3;

const PAD_CHAR: char = '0';

/// Directory coordinates of one content id.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ShardedPath {
    pub shard1: String,
    pub shard2: String,
    pub leaf: String,
}

impl ShardedPath {
    /// Shard a validated content id. Never fails.
    pub fn of(id: &ContentId) -> Self {
        let padded: Vec<char> = id
            .as_str()
            .chars()
            .chain(std::iter::repeat(PAD_CHAR))
            .take(SHARD_WIDTH * 2)
            .collect();
        Self {
            shard1: padded[..SHARD_WIDTH].iter().collect(),
            shard2: padded[SHARD_WIDTH..].iter().collect(),
            leaf: id.as_str().to_string(),
        }
    }

    /// `shard1/shard2/leaf`, relative to the store root.
    pub fn relative(&self) -> PathBuf {
        [&self.shard1, &self.shard2, &self.leaf].iter().collect()
    }

    /// Absolute leaf directory under `root`.
    pub fn leaf_dir(&self, root: &Path) -> PathBuf {
        root.join(self.relative())
    }

    /// The `shard2` directory under `root`.
    pub fn shard2_dir(&self, root: &Path) -> PathBuf {
        root.join(&self.shard1).join(&self.shard2)
    }

    /// The `shard1` directory under `root`.
    pub fn shard1_dir(&self, root: &Path) -> PathBuf {
        root.join(&self.shard1)
    }
}

/// Shard a raw id string, rejecting ids that cannot name a directory.
pub fn shard(id: &str) -> StoreResult<ShardedPath> {
    Ok(ShardedPath::of(&ContentId::new(id)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use proptest::prelude::*;

    fn parts(p: &ShardedPath) -> (&str, &str, &str) {
        (&p.shard1, &p.shard2, &p.leaf)
    }

    #[test]
    fn long_id_uses_its_own_prefixes() {
        let p = shard("abcdef123456").unwrap();
        assert_eq!(parts(&p), ("abc", "def", "abcdef123456"));
    }

    #[test]
    fn short_id_is_zero_padded_but_leaf_is_not() {
        let p = shard("42").unwrap();
        assert_eq!(parts(&p), ("420", "000", "42"));
    }

    #[test]
    fn exactly_six_characters() {
        let p = shard("abcdef").unwrap();
        assert_eq!(parts(&p), ("abc", "def", "abcdef"));
    }

    #[test]
    fn multibyte_ids_are_split_on_characters() {
        let p = shard("ααβββγ1").unwrap();
        assert_eq!(parts(&p), ("ααβ", "ββγ", "ααβββγ1"));
    }

    #[test]
    fn empty_id_is_rejected() {
        assert!(matches!(shard(""), Err(StoreError::InvalidId(_))));
    }

    #[test]
    fn relative_path_layout() {
        let p = shard("abcdef123456").unwrap();
        assert_eq!(p.relative(), PathBuf::from("abc/def/abcdef123456"));
        let root = Path::new("/store");
        assert_eq!(p.leaf_dir(root), PathBuf::from("/store/abc/def/abcdef123456"));
        assert_eq!(p.shard2_dir(root), PathBuf::from("/store/abc/def"));
        assert_eq!(p.shard1_dir(root), PathBuf::from("/store/abc"));
    }

    proptest! {
        #[test]
        fn sharding_is_deterministic_and_keeps_the_leaf(id in "[a-zA-Z0-9._-]{1,64}") {
            prop_assume!(id != "." && id != "..");
            let a = shard(&id).unwrap();
            let b = shard(&id).unwrap();
            prop_assert_eq!(&a, &b);
            prop_assert_eq!(&a.leaf, &id);
            prop_assert_eq!(a.shard1.chars().count(), SHARD_WIDTH);
            prop_assert_eq!(a.shard2.chars().count(), SHARD_WIDTH);
        }
    }
}
