//! Reconciliation of the conversation between the client-side cache and
//! the server.
//!
//! The cache is written first and synchronously, the server afterwards and
//! in the background. Server writes go through a single queue and reach the
//! server in the order they were issued, so a slow save can't land after a
//! later clear or a later save. Nothing here is transactional: a failed
//! server write leaves the cache ahead of the server, and the next
//! successful save catches it up. Failures are logged and never reported
//! to the caller.

mod cache;
mod error;

use std::pin::Pin;
use std::sync::Arc;

use little_chat_model::Transcript;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::backend_client::BackendClient;
pub use cache::{MemoryCache, TranscriptCache};
pub use error::{Error, ErrorKind};

/// A prepared server write. Logs its own failure.
type ServerWrite = Pin<Box<dyn Future<Output = ()> + Send>>;

struct QueuedWrite {
    request: ServerWrite,
    done_tx: oneshot::Sender<()>,
}

/// Keeps the cache and the server copy of a conversation in step.
#[derive(Clone)]
pub struct HistoryStore {
    backend: BackendClient,
    cache: Arc<dyn TranscriptCache>,
    writes_tx: mpsc::UnboundedSender<QueuedWrite>,
}

impl HistoryStore {
    /// Creates a store writing to `backend` and `cache`.
    ///
    /// Must be called from within a tokio runtime. The server writer runs
    /// until every clone of the store is dropped.
    pub fn new(
        backend: BackendClient,
        cache: Arc<dyn TranscriptCache>,
    ) -> Self {
        let (writes_tx, writes_rx) = mpsc::unbounded_channel();
        tokio::spawn(
            run_writer(writes_rx).instrument(debug_span!("history writer")),
        );
        Self {
            backend,
            cache,
            writes_tx,
        }
    }

    /// Loads the conversation to show on startup.
    ///
    /// A non-empty server history wins and replaces the cached one.
    /// Otherwise the cached transcript is used, and if there is none the
    /// conversation starts empty.
    ///
    /// The returned future doesn't borrow `self`.
    pub fn load(&self) -> impl Future<Output = Transcript> + Send + 'static {
        let fetch = self.fetch();
        let store = self.clone();
        async move { store.resolve(fetch.await) }
    }

    /// Fetches the server copy only, without touching the cache.
    ///
    /// Resolves to `None` if the server has no usable history. Pass the
    /// result to [`resolve`](Self::resolve) to finish loading.
    pub fn fetch(
        &self,
    ) -> impl Future<Output = Option<Transcript>> + Send + 'static {
        let request = self.backend.fetch_history();
        async move {
            match request.await {
                Ok(Some(history)) if !history.is_empty() => {
                    debug!("fetched {} messages from server", history.len());
                    Some(history)
                }
                Ok(_) => {
                    debug!("server has no history");
                    None
                }
                Err(err) => {
                    warn!("failed to fetch history: {err}");
                    None
                }
            }
        }
        .instrument(debug_span!("fetch history"))
    }

    /// Picks the conversation to show from a fetched server copy and the
    /// cache. A server copy is written back into the cache.
    pub fn resolve(&self, server: Option<Transcript>) -> Transcript {
        if let Some(history) = server {
            if let Err(err) = self.cache.set(&history) {
                warn!("failed to update cache: {err}");
            }
            return history;
        }
        match self.cache.get() {
            Ok(Some(cached)) => {
                debug!("loaded {} messages from cache", cached.len());
                cached
            }
            Ok(None) => Transcript::new(),
            Err(err) => {
                warn!("failed to read cache: {err}");
                Transcript::new()
            }
        }
    }

    /// Saves `transcript` to the cache, then to the server in the
    /// background.
    ///
    /// The returned handle resolves once the server write is done. It may
    /// be dropped; the write keeps going.
    pub fn save(&self, transcript: &Transcript) -> JoinHandle<()> {
        if let Err(err) = self.cache.set(transcript) {
            warn!("failed to update cache: {err}");
        }
        let request = self.backend.save_history(transcript);
        self.enqueue(Box::pin(async move {
            if let Err(err) = request.await {
                warn!("failed to save history: {err}");
            }
        }))
    }

    /// Removes the cached transcript, then asks the server to delete its
    /// copy in the background.
    ///
    /// The server deletion runs after every save issued before it.
    pub fn clear(&self) -> JoinHandle<()> {
        self.clear_cache();
        let request = self.backend.clear();
        self.enqueue(Box::pin(async move {
            if let Err(err) = request.await {
                warn!("failed to clear history: {err}");
            }
        }))
    }

    /// Removes the cached transcript only.
    pub fn clear_cache(&self) {
        if let Err(err) = self.cache.clear() {
            warn!("failed to clear cache: {err}");
        }
    }

    fn enqueue(&self, request: ServerWrite) -> JoinHandle<()> {
        let (done_tx, done_rx) = oneshot::channel();
        if self.writes_tx.send(QueuedWrite { request, done_tx }).is_err() {
            warn!("history writer has stopped, dropping a server write");
        }
        // Resolves early if the write was dropped.
        tokio::spawn(async move {
            done_rx.await.ok();
        })
    }
}

async fn run_writer(mut writes_rx: mpsc::UnboundedReceiver<QueuedWrite>) {
    while let Some(write) = writes_rx.recv().await {
        let QueuedWrite { request, done_tx } = write;
        request.await;
        done_tx.send(()).ok();
    }
    trace!("history store is gone");
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use little_chat_model::Message;
    use little_chat_test_backend::TestBackend;
    use tokio::time::sleep;

    use super::*;

    fn conversation() -> Transcript {
        vec![Message::user("Hello"), Message::assistant("Hi there")].into()
    }

    fn new_store(backend: &TestBackend) -> (HistoryStore, Arc<MemoryCache>) {
        let cache = Arc::new(MemoryCache::new());
        let store = HistoryStore::new(
            BackendClient::new(backend.clone()),
            Arc::clone(&cache) as _,
        );
        (store, cache)
    }

    #[tokio::test(start_paused = true)]
    async fn test_save_then_load() {
        let backend = TestBackend::default();
        let (store, cache) = new_store(&backend);
        store.save(&conversation()).await.unwrap();
        assert_eq!(cache.get().unwrap(), Some(conversation()));
        assert_eq!(backend.history(), Some(conversation()));

        // A fresh client sees the server copy.
        let (store, cache) = new_store(&backend);
        assert_eq!(store.load().await, conversation());
        assert_eq!(cache.get().unwrap(), Some(conversation()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_server_wins_over_cache() {
        let mut backend = TestBackend::default();
        backend.set_history(conversation());
        let (store, cache) = new_store(&backend);
        cache.set(&vec![Message::user("stale")].into()).unwrap();

        assert_eq!(store.load().await, conversation());
        assert_eq!(cache.get().unwrap(), Some(conversation()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fall_back_to_cache() {
        let backend = TestBackend::default();
        let (store, cache) = new_store(&backend);
        cache.set(&conversation()).unwrap();
        assert_eq!(store.load().await, conversation());

        let mut unavailable = TestBackend::default();
        unavailable.set_history_unavailable();
        let (store, cache) = new_store(&unavailable);
        cache.set(&conversation()).unwrap();
        assert_eq!(store.load().await, conversation());

        let mut empty = TestBackend::default();
        empty.set_history(Transcript::new());
        let (store, cache) = new_store(&empty);
        cache.set(&conversation()).unwrap();
        assert_eq!(store.load().await, conversation());
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_nothing() {
        let backend = TestBackend::default();
        let (store, _) = new_store(&backend);
        assert!(store.load().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear() {
        let backend = TestBackend::default();
        let (store, cache) = new_store(&backend);
        store.save(&conversation()).await.unwrap();

        let task = store.clear();
        // The cache is cleared before the server is contacted.
        assert_eq!(cache.get().unwrap(), None);
        task.await.unwrap();
        assert_eq!(backend.clears(), 1);
        assert!(store.load().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cache_ahead_of_server() {
        let mut backend = TestBackend::default();
        backend.set_persistence_broken();
        let (store, cache) = new_store(&backend);

        store.save(&conversation()).await.unwrap();
        assert_eq!(cache.get().unwrap(), Some(conversation()));
        assert_eq!(backend.history(), None);
        assert_eq!(store.load().await, conversation());
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_save_then_fast_clear() {
        let mut backend = TestBackend::default();
        let (store, cache) = new_store(&backend);

        backend.set_delay(Duration::from_millis(100));
        let save = store.save(&conversation());
        backend.set_delay(Duration::from_millis(1));
        let clear = store.clear();
        clear.await.unwrap();
        save.await.unwrap();
        sleep(Duration::from_millis(200)).await;

        assert_eq!(backend.saved(), [conversation()]);
        assert_eq!(backend.clears(), 1);
        assert_eq!(backend.history(), None);
        assert_eq!(cache.get().unwrap(), None);
        assert!(store.load().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_saves_land_in_order() {
        let mut backend = TestBackend::default();
        let (store, cache) = new_store(&backend);
        let first: Transcript = vec![Message::user("Hello")].into();
        let mut second = conversation();
        second.push(Message::user("And again"));

        backend.set_delay(Duration::from_millis(100));
        store.save(&first);
        backend.set_delay(Duration::from_millis(1));
        store.save(&second).await.unwrap();

        assert_eq!(backend.saved(), [first, second.clone()]);
        assert_eq!(backend.history(), Some(second.clone()));
        assert_eq!(cache.get().unwrap(), Some(second));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_leaves_cache_alone() {
        let mut backend = TestBackend::default();
        backend.set_history(conversation());
        let (store, cache) = new_store(&backend);

        let fetched = store.fetch().await;
        assert_eq!(fetched, Some(conversation()));
        assert_eq!(cache.get().unwrap(), None);
        assert_eq!(store.resolve(fetched), conversation());
        assert_eq!(cache.get().unwrap(), Some(conversation()));
    }
}
