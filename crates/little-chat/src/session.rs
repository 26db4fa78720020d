use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use little_chat_core::history::MemoryCache;
use little_chat_core::{
    ChatSession, DEFAULT_REVEAL_INTERVAL, SessionBuilder as CoreBuilder,
};
use little_chat_http::{Error, HttpBackend, HttpConfig};

use crate::{FileCache, TerminalRenderer};

/// A session builder for terminal chats.
///
/// The session talks to the server over HTTP, prints to the terminal and
/// caches the conversation in a file, if one is given.
pub struct SessionBuilder {
    config: HttpConfig,
    renderer: Option<TerminalRenderer>,
    cache_path: Option<PathBuf>,
    reveal_interval: Duration,
    on_idle: Option<Box<dyn Fn() + Send + Sync>>,
}

impl SessionBuilder {
    /// Creates a session builder with a specified server configuration.
    #[inline]
    pub fn with_config(config: HttpConfig) -> Self {
        Self {
            config,
            renderer: None,
            cache_path: None,
            reveal_interval: DEFAULT_REVEAL_INTERVAL,
            on_idle: None,
        }
    }

    /// Sets the renderer, which prints to stdout by default.
    #[inline]
    pub fn with_renderer(mut self, renderer: TerminalRenderer) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// Caches the conversation in the file at `path`.
    ///
    /// Without a cache file, the conversation is cached in memory only.
    #[inline]
    pub fn with_cache_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.cache_path = Some(path.into());
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

    /// Builds a new session.
    ///
    /// Must be called from within a tokio runtime. Fails if the HTTP
    /// client cannot be created.
    pub fn build(self) -> Result<ChatSession, Error> {
        let backend = HttpBackend::new(self.config)?;
        let renderer = self.renderer.unwrap_or_default();
        let mut builder = CoreBuilder::with_backend(backend)
            .with_renderer(Arc::new(renderer))
            .with_reveal_interval(self.reveal_interval);
        builder = match self.cache_path {
            Some(path) => {
                debug!("caching conversation in {path:?}");
                builder.with_cache(Arc::new(FileCache::new(path)))
            }
            None => builder.with_cache(Arc::new(MemoryCache::new())),
        };
        if let Some(on_idle) = self.on_idle {
            builder = builder.on_idle(on_idle);
        }
        Ok(builder.build())
    }
}
