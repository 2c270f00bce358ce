use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use catstore_types::{ContentId, ContentUri};
use tracing::debug;

use crate::error::{IoContext, StoreError, StoreResult};
use crate::fsutil;
use crate::layout::StoreLayout;
use crate::mime::{self, MimeResolver, SNIFF_LEN};
use crate::shard::ShardedPath;

/// A committed payload opened for reading.
///
/// The payload is streamed from disk; nothing beyond the content-type sniff
/// window is read up front.
pub struct ContentStream {
    pub id: ContentId,
    pub uri: ContentUri,
    /// Absolute path of the stored file.
    pub path: PathBuf,
    pub filename: String,
    pub size: u64,
    pub mime_type: String,
    reader: BufReader<File>,
}

impl ContentStream {
    /// Consume the stream, returning the underlying reader.
    pub fn into_reader(self) -> BufReader<File> {
        self.reader
    }
}

impl Read for ContentStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.read(buf)
    }
}

impl fmt::Debug for ContentStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContentStream")
            .field("id", &self.id)
            .field("path", &self.path)
            .field("size", &self.size)
            .field("mime_type", &self.mime_type)
            .finish_non_exhaustive()
    }
}

/// Locate and open the committed payload of `id`.
pub(crate) fn open(
    layout: &StoreLayout,
    resolver: &dyn MimeResolver,
    id: &ContentId,
) -> StoreResult<ContentStream> {
    let leaf = layout.permanent_leaf(&ShardedPath::of(id));
    if !leaf.is_dir() {
        return Err(StoreError::NotFound(id.clone()));
    }

    let entries = fsutil::list_dir(&leaf)?;
    let [entry] = entries.as_slice() else {
        return Err(StoreError::CorruptedStore {
            id: id.clone(),
            reason: format!("{} entries in leaf directory, expected exactly 1", entries.len()),
        });
    };
    let path = entry.path();
    if !entry.file_type().at(&path)?.is_file() {
        return Err(StoreError::CorruptedStore {
            id: id.clone(),
            reason: "leaf entry is not a regular file".into(),
        });
    }

    let mut file = File::open(&path).at(&path)?;
    let size = file.metadata().at(&path)?.len();
    let head = read_head(&mut file, &path)?;
    let mime_type = mime::resolve(resolver, &path, &head);
    debug!(id = %id, size, mime = %mime_type, "opened content");

    Ok(ContentStream {
        id: id.clone(),
        uri: ContentUri::for_id(id),
        filename: entry.file_name().to_string_lossy().into_owned(),
        path,
        size,
        mime_type,
        reader: BufReader::new(file),
    })
}

/// Read the sniff window and rewind.
fn read_head(file: &mut File, path: &Path) -> StoreResult<Vec<u8>> {
    let mut head = Vec::with_capacity(SNIFF_LEN);
    (&*file).take(SNIFF_LEN as u64).read_to_end(&mut head).at(path)?;
    file.seek(SeekFrom::Start(0)).at(path)?;
    Ok(head)
}
