use std::io;
use std::path::Path;

use tracing::{debug, warn};

/// Content type reported when nothing better can be determined.
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// Number of leading bytes handed to [`MimeResolver::guess`].
pub const SNIFF_LEN: usize = 8192;

/// Content type resolution, supplied by the embedding application.
pub trait MimeResolver: Send + Sync {
    /// Guess from a file extension and the leading bytes of the payload.
    fn guess(&self, bytes: &[u8], extension: Option<&str>) -> Option<String>;

    /// Probe a file on disk.
    fn probe(&self, path: &Path) -> io::Result<Option<String>>;
}

/// Extension table lookup followed by magic-number sniffing.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultMimeResolver;

impl MimeResolver for DefaultMimeResolver {
    fn guess(&self, bytes: &[u8], extension: Option<&str>) -> Option<String> {
        extension
            .and_then(|ext| mime_guess::from_ext(ext).first())
            .map(|mime| mime.essence_str().to_string())
            .or_else(|| infer::get(bytes).map(|kind| kind.mime_type().to_string()))
    }

    fn probe(&self, path: &Path) -> io::Result<Option<String>> {
        Ok(infer::get_from_path(path)?.map(|kind| kind.mime_type().to_string()))
    }
}

/// Resolve the content type of a stored file. Never fails.
///
/// Order: `guess` on extension and leading bytes, then `probe`, then
/// [`DEFAULT_MIME_TYPE`].
pub fn resolve(resolver: &dyn MimeResolver, path: &Path, head: &[u8]) -> String {
    let extension = path.extension().and_then(|e| e.to_str());
    if let Some(mime) = resolver.guess(head, extension) {
        return mime;
    }
    match resolver.probe(path) {
        Ok(Some(mime)) => mime,
        Ok(None) => {
            debug!(path = %path.display(), "no content type detected; using default");
            DEFAULT_MIME_TYPE.to_string()
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "content type probe failed; using default");
            DEFAULT_MIME_TYPE.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];

    struct Failing;

    impl MimeResolver for Failing {
        fn guess(&self, _: &[u8], _: Option<&str>) -> Option<String> {
            None
        }

        fn probe(&self, _: &Path) -> io::Result<Option<String>> {
            Err(io::Error::new(io::ErrorKind::Other, "boom"))
        }
    }

    #[test]
    fn extension_wins() {
        let r = DefaultMimeResolver;
        assert_eq!(r.guess(PNG_MAGIC, Some("txt")).as_deref(), Some("text/plain"));
    }

    #[test]
    fn bytes_used_without_known_extension() {
        let r = DefaultMimeResolver;
        assert_eq!(r.guess(PNG_MAGIC, None).as_deref(), Some("image/png"));
        assert_eq!(r.guess(PNG_MAGIC, Some("zzqq")).as_deref(), Some("image/png"));
    }

    #[test]
    fn unknown_everything_is_none() {
        let r = DefaultMimeResolver;
        assert!(r.guess(b"plain words", None).is_none());
    }

    #[test]
    fn probe_reads_file_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blob");
        fs::write(&path, PNG_MAGIC).unwrap();
        let r = DefaultMimeResolver;
        assert_eq!(r.probe(&path).unwrap().as_deref(), Some("image/png"));
    }

    #[test]
    fn resolve_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blob");
        fs::write(&path, b"no magic here").unwrap();
        assert_eq!(resolve(&DefaultMimeResolver, &path, b"no magic here"), DEFAULT_MIME_TYPE);
    }

    #[test]
    fn resolve_survives_probe_errors() {
        let path = Path::new("/definitely/not/here");
        assert_eq!(resolve(&Failing, path, b""), DEFAULT_MIME_TYPE);
    }
}
