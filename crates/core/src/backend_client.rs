use std::pin::Pin;
use std::sync::Arc;

use little_chat_model::{BackendError, ChatBackend, Reply, Transcript};
use tracing::Instrument;

type BackendResult<T> = Result<T, Box<dyn BackendError>>;
type BoxedFuture<T> = Pin<Box<dyn Future<Output = BackendResult<T>> + Send>>;

trait BackendObject: Send + Sync + 'static {
    fn get_response(&self, prompt: &str) -> BoxedFuture<Reply>;

    fn clear(&self) -> BoxedFuture<()>;

    fn save_history(&self, history: &Transcript) -> BoxedFuture<()>;

    fn fetch_history(&self) -> BoxedFuture<Option<Transcript>>;
}

struct AnyBackend<B: ChatBackend>(B);

impl<B: ChatBackend + 'static> BackendObject for AnyBackend<B> {
    fn get_response(&self, prompt: &str) -> BoxedFuture<Reply> {
        erase(self.0.get_response(prompt), trace_span!("get response"))
    }

    fn clear(&self) -> BoxedFuture<()> {
        erase(self.0.clear(), trace_span!("clear history"))
    }

    fn save_history(&self, history: &Transcript) -> BoxedFuture<()> {
        trace!("saving {} messages", history.len());
        erase(self.0.save_history(history), trace_span!("save history"))
    }

    fn fetch_history(&self) -> BoxedFuture<Option<Transcript>> {
        erase(self.0.fetch_history(), trace_span!("fetch history"))
    }
}

#[inline]
fn erase<T, E, F>(fut: F, span: tracing::Span) -> BoxedFuture<T>
where
    F: Future<Output = Result<T, E>> + Send + 'static,
    E: BackendError,
{
    Box::pin(
        async move {
            let result = fut.await;
            if let Err(err) = &result {
                debug!("backend error ({}): {err}", err.kind());
            }
            result.map_err(|err| Box::new(err) as Box<dyn BackendError>)
        }
        .instrument(span),
    )
}

/// A type-erased handle to a [`ChatBackend`].
///
/// The session and the history store share one backend; this wrapper
/// makes it cheap to clone and removes the backend's type parameter from
/// everything that holds it.
#[derive(Clone)]
pub struct BackendClient {
    backend: Arc<dyn BackendObject>,
}

impl BackendClient {
    /// Wraps `backend`.
    #[inline]
    pub fn new<B: ChatBackend + 'static>(backend: B) -> Self {
        Self {
            backend: Arc::new(AnyBackend(backend)),
        }
    }

    /// See [`ChatBackend::get_response`].
    ///
    /// The request is prepared immediately, the returned future only waits
    /// for the answer, so it can be moved to another task.
    #[inline]
    pub fn get_response(
        &self,
        prompt: &str,
    ) -> impl Future<Output = BackendResult<Reply>> + Send + 'static {
        self.backend.get_response(prompt)
    }

    /// See [`ChatBackend::clear`].
    #[inline]
    pub fn clear(
        &self,
    ) -> impl Future<Output = BackendResult<()>> + Send + 'static {
        self.backend.clear()
    }

    /// See [`ChatBackend::save_history`].
    #[inline]
    pub fn save_history(
        &self,
        history: &Transcript,
    ) -> impl Future<Output = BackendResult<()>> + Send + 'static {
        self.backend.save_history(history)
    }

    /// See [`ChatBackend::fetch_history`].
    #[inline]
    pub fn fetch_history(
        &self,
    ) -> impl Future<Output = BackendResult<Option<Transcript>>> + Send + 'static
    {
        self.backend.fetch_history()
    }
}

#[cfg(test)]
mod tests {
    use little_chat_model::{ErrorKind, Message};
    use little_chat_test_backend::{PresetReply, TestBackend};

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_get_response() {
        let mut backend = TestBackend::default();
        backend.add_reply(PresetReply::message("How are you?"));
        backend.add_reply(PresetReply::InvalidResponse);

        let client = BackendClient::new(backend.clone());
        let reply = client.get_response("Hi").await.unwrap();
        assert_eq!(reply, Reply::Message("How are you?".to_owned()));

        let err = client.get_response("Hi again").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidResponse);
        assert_eq!(backend.prompts(), ["Hi", "Hi again"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_is_prepared_eagerly() {
        let backend = TestBackend::default();
        let client = BackendClient::new(backend.clone());

        let fut = client.get_response("Hello");
        assert_eq!(backend.prompts(), ["Hello"]);
        drop(fut);
    }

    #[tokio::test(start_paused = true)]
    async fn test_history_round_trip() {
        let backend = TestBackend::default();
        let client = BackendClient::new(backend);
        let transcript: Transcript = vec![Message::user("Hello")].into();

        client.save_history(&transcript).await.unwrap();
        let history = client.fetch_history().await.unwrap();
        assert_eq!(history, Some(transcript));

        client.clear().await.unwrap();
        assert_eq!(client.fetch_history().await.unwrap(), None);
    }
}
