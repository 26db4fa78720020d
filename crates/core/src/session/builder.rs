use std::sync::Arc;
use std::time::Duration;

use little_chat_actor::Actor;
use little_chat_model::ChatBackend;
use tokio::sync::watch;

use super::ChatSession;
use super::state::{Hydrate, SessionState, TurnStage};
use crate::backend_client::BackendClient;
use crate::history::{HistoryStore, MemoryCache, TranscriptCache};
use crate::render::{MemoryLog, Renderer};

/// The default delay between two typed characters of a reply.
pub const DEFAULT_REVEAL_INTERVAL: Duration = Duration::from_millis(10);

/// [`ChatSession`] builder.
pub struct SessionBuilder {
    backend: BackendClient,
    renderer: Option<Arc<dyn Renderer>>,
    cache: Option<Arc<dyn TranscriptCache>>,
    reveal_interval: Duration,
    on_idle: Option<Box<dyn Fn() + Send + Sync>>,
}

impl SessionBuilder {
    /// Creates a new builder with the specified backend.
    #[inline]
    pub fn with_backend<B: ChatBackend + 'static>(backend: B) -> Self {
        Self {
            backend: BackendClient::new(backend),
            renderer: None,
            cache: None,
            reveal_interval: DEFAULT_REVEAL_INTERVAL,
            on_idle: None,
        }
    }

    /// Sets the renderer showing the chat log.
    ///
    /// Defaults to a [`MemoryLog`].
    #[inline]
    pub fn with_renderer<R: Renderer>(mut self, renderer: Arc<R>) -> Self {
        self.renderer = Some(renderer as Arc<dyn Renderer>);
        self
    }

    /// Sets the client-side cache of the conversation.
    ///
    /// Defaults to a [`MemoryCache`].
    #[inline]
    pub fn with_cache<C: TranscriptCache>(mut self, cache: Arc<C>) -> Self {
        self.cache = Some(cache as Arc<dyn TranscriptCache>);
        self
    }

    /// Sets the delay between two typed characters of a reply.
    #[inline]
    pub fn with_reveal_interval(mut self, interval: Duration) -> Self {
        self.reveal_interval = interval;
        self
    }

    /// Attaches a callback to be invoked when the session is idle.
    #[inline]
    pub fn on_idle(
        mut self,
        on_idle: impl Fn() + Send + Sync + 'static,
    ) -> Self {
        self.on_idle = Some(Box::new(on_idle));
        self
    }

    /// Builds the session and starts loading the stored conversation.
    ///
    /// Must be called from within a tokio runtime.
    pub fn build(self) -> ChatSession {
        let Self {
            backend,
            renderer,
            cache,
            reveal_interval,
            on_idle,
        } = self;
        let renderer =
            renderer.unwrap_or_else(|| Arc::new(MemoryLog::new()) as _);
        let cache = cache.unwrap_or_else(|| Arc::new(MemoryCache::new()) as _);

        let (stage_tx, stage_rx) = watch::channel(TurnStage::default());
        let state = SessionState {
            history: HistoryStore::new(backend.clone(), cache),
            backend,
            renderer,
            transcript: Default::default(),
            stage: TurnStage::default(),
            stage_tx,
            pending_inputs: Default::default(),
            reveals: Default::default(),
            reveal_interval,
            epoch: 0,
            idle_waiters: Default::default(),
            on_idle,
        };
        let actor = Actor::spawn(state, Some("chat session"));
        if actor.send(Hydrate).is_err() {
            error!("chat session has stopped before loading history");
        }
        ChatSession { actor, stage_rx }
    }
}
