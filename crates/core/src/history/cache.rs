use std::sync::{Mutex, MutexGuard, PoisonError};

use little_chat_model::Transcript;

use super::Error;

/// Client-side storage holding the last known transcript.
///
/// The cache is a single slot. Operations are synchronous and expected to
/// be fast; the session calls them from its own loop.
pub trait TranscriptCache: Send + Sync + 'static {
    /// Returns the cached transcript, or `None` if nothing is cached.
    fn get(&self) -> Result<Option<Transcript>, Error>;

    /// Replaces the cached transcript.
    fn set(&self, transcript: &Transcript) -> Result<(), Error>;

    /// Removes the cached transcript.
    fn clear(&self) -> Result<(), Error>;
}

/// A cache that lives as long as the process.
#[derive(Default)]
pub struct MemoryCache {
    entry: Mutex<Option<Transcript>>,
}

impl MemoryCache {
    /// Creates an empty cache.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Option<Transcript>> {
        self.entry.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TranscriptCache for MemoryCache {
    #[inline]
    fn get(&self) -> Result<Option<Transcript>, Error> {
        Ok(self.lock().clone())
    }

    #[inline]
    fn set(&self, transcript: &Transcript) -> Result<(), Error> {
        *self.lock() = Some(transcript.clone());
        Ok(())
    }

    #[inline]
    fn clear(&self) -> Result<(), Error> {
        *self.lock() = None;
        Ok(())
    }
}
