use std::fs;
use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};

use little_chat_core::history::{Error, TranscriptCache};
use little_chat_model::Transcript;

/// A transcript cache stored as a JSON file.
///
/// The file holds the transcript in its wire format, a JSON array of
/// `{"role", "message"}` objects. A missing file means nothing is cached.
#[derive(Clone, Debug)]
pub struct FileCache {
    path: PathBuf,
}

impl FileCache {
    /// Creates a cache backed by the file at `path`.
    ///
    /// The file is not touched until the cache is used.
    #[inline]
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    /// Returns the path of the backing file.
    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TranscriptCache for FileCache {
    fn get(&self) -> Result<Option<Transcript>, Error> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == IoErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(Error::io().with_reason(err.to_string())),
        };
        let transcript = serde_json::from_slice(&bytes)
            .map_err(|err| Error::decode().with_reason(err.to_string()))?;
        Ok(Some(transcript))
    }

    fn set(&self, transcript: &Transcript) -> Result<(), Error> {
        let bytes = serde_json::to_vec(transcript)
            .map_err(|err| Error::decode().with_reason(err.to_string()))?;
        // Write aside and rename, so a crash never leaves half a file.
        let tmp_path = self.path.with_extension("tmp");
        fs::write(&tmp_path, bytes)
            .and_then(|_| fs::rename(&tmp_path, &self.path))
            .map_err(|err| Error::io().with_reason(err.to_string()))?;
        trace!("cached {} messages in {:?}", transcript.len(), self.path);
        Ok(())
    }

    fn clear(&self) -> Result<(), Error> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == IoErrorKind::NotFound => Ok(()),
            Err(err) => Err(Error::io().with_reason(err.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::process;

    use little_chat_core::history::ErrorKind;
    use little_chat_model::Message;

    use super::*;

    fn temp_cache(name: &str) -> FileCache {
        let path = env::temp_dir()
            .join(format!("little-chat-test-{}-{name}.json", process::id()));
        fs::remove_file(&path).ok();
        FileCache::new(path)
    }

    #[test]
    fn test_round_trip() {
        let cache = temp_cache("round-trip");
        assert_eq!(cache.get().unwrap(), None);

        let transcript: Transcript =
            vec![Message::user("Hello"), Message::assistant("Hi there")].into();
        cache.set(&transcript).unwrap();
        assert_eq!(cache.get().unwrap(), Some(transcript));

        let raw = fs::read_to_string(cache.path()).unwrap();
        assert!(raw.starts_with(r#"[{"role":"user","message":"Hello"}"#));

        cache.clear().unwrap();
        assert_eq!(cache.get().unwrap(), None);
        // Clearing twice is fine.
        cache.clear().unwrap();
    }

    #[test]
    fn test_malformed_file() {
        let cache = temp_cache("malformed");
        fs::write(cache.path(), "<html>").unwrap();
        let err = cache.get().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decode);
        cache.clear().unwrap();
    }
}
