//! Small file-system helpers shared by staging, commit and read.

use std::fs::{self, DirEntry};
use std::io;
use std::path::Path;

use walkdir::WalkDir;

use crate::error::{IoContext, StoreError, StoreResult};

/// Entries of `dir`, sorted by name.
pub(crate) fn list_dir(dir: &Path) -> StoreResult<Vec<DirEntry>> {
    let mut entries = fs::read_dir(dir)
        .at(dir)?
        .collect::<io::Result<Vec<_>>>()
        .at(dir)?;
    entries.sort_by_key(DirEntry::file_name);
    Ok(entries)
}

/// Remove everything inside `dir`, keeping `dir` itself.
pub(crate) fn empty_dir(dir: &Path) -> StoreResult<()> {
    for entry in list_dir(dir)? {
        let path = entry.path();
        if entry.file_type().at(&path)?.is_dir() {
            remove_tree(&path)?;
        } else {
            ignore_missing(fs::remove_file(&path)).at(&path)?;
        }
    }
    Ok(())
}

/// Delete the files of a leaf directory and then the directory.
pub(crate) fn remove_leaf(dir: &Path) -> StoreResult<()> {
    empty_dir(dir)?;
    ignore_missing(fs::remove_dir(dir)).at(dir)
}

/// Remove `dir` if it exists and has no entries. Returns whether it was removed.
pub(crate) fn remove_dir_if_empty(dir: &Path) -> StoreResult<bool> {
    let mut entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(StoreError::io(dir, e)),
    };
    if entries.next().is_some() {
        return Ok(false);
    }
    ignore_missing(fs::remove_dir(dir)).at(dir)?;
    Ok(true)
}

/// Depth-first delete of `root` and everything under it.
///
/// Returns `false` if `root` did not exist. Entries that disappear while
/// walking are not errors.
pub(crate) fn remove_tree(root: &Path) -> StoreResult<bool> {
    if fs::symlink_metadata(root).is_err() {
        return Ok(false);
    }
    for entry in WalkDir::new(root).contents_first(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.io_error().map(io::Error::kind) == Some(io::ErrorKind::NotFound) => {
                continue
            }
            Err(e) => {
                let path = e.path().unwrap_or(root).to_path_buf();
                return Err(StoreError::io(path, e.into()));
            }
        };
        let path = entry.path();
        let removed = if entry.file_type().is_dir() {
            fs::remove_dir(path)
        } else {
            fs::remove_file(path)
        };
        ignore_missing(removed).at(path)?;
    }
    Ok(true)
}

fn ignore_missing(result: io::Result<()>) -> io::Result<()> {
    match result {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_dir_is_sorted() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["c", "a", "b"] {
            fs::write(dir.path().join(name), name).unwrap();
        }
        let names: Vec<_> = list_dir(dir.path())
            .unwrap()
            .into_iter()
            .map(|e| e.file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, ["a", "b", "c"]);
    }

    #[test]
    fn remove_tree_deletes_nested_content() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("root");
        fs::create_dir_all(root.join("x/y")).unwrap();
        fs::write(root.join("x/y/file"), b"1").unwrap();
        fs::write(root.join("top"), b"2").unwrap();
        assert!(remove_tree(&root).unwrap());
        assert!(!root.exists());
        assert!(!remove_tree(&root).unwrap());
    }

    #[test]
    fn remove_leaf_deletes_files_and_dir() {
        let dir = tempfile::tempdir().unwrap();
        let leaf = dir.path().join("leaf");
        fs::create_dir(&leaf).unwrap();
        fs::write(leaf.join("a"), b"a").unwrap();
        fs::write(leaf.join("b"), b"b").unwrap();
        remove_leaf(&leaf).unwrap();
        assert!(!leaf.exists());
    }

    #[test]
    fn remove_dir_if_empty_keeps_populated_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let full = dir.path().join("full");
        let empty = dir.path().join("empty");
        fs::create_dir(&full).unwrap();
        fs::create_dir(&empty).unwrap();
        fs::write(full.join("f"), b"f").unwrap();

        assert!(!remove_dir_if_empty(&full).unwrap());
        assert!(full.exists());
        assert!(remove_dir_if_empty(&empty).unwrap());
        assert!(!empty.exists());
        assert!(!remove_dir_if_empty(&empty).unwrap());
    }
}
