use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::future::ready;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use little_chat_model::{
    BackendError, ChatBackend, ErrorKind, Message, Reply, Transcript,
};
use tokio::time::sleep;

#[derive(Debug)]
struct FakeBackendError(ErrorKind);

impl Display for FakeBackendError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

impl Error for FakeBackendError {}

impl BackendError for FakeBackendError {
    fn kind(&self) -> ErrorKind {
        self.0
    }
}

/// Echoes prompts back and keeps history in memory, like a server whose
/// session lives for the whole test.
#[derive(Default)]
struct FakeBackend {
    history: Arc<Mutex<Option<Transcript>>>,
}

impl ChatBackend for FakeBackend {
    type Error = FakeBackendError;

    fn get_response(
        &self,
        prompt: &str,
    ) -> impl Future<Output = Result<Reply, Self::Error>> + Send + 'static {
        let prompt = prompt.to_owned();
        async move {
            sleep(Duration::from_millis(1)).await;
            if prompt.is_empty() {
                return Ok(Reply::Error("Prompt cannot be empty".to_owned()));
            }
            if prompt == "offline" {
                return Err(FakeBackendError(ErrorKind::Unreachable));
            }
            Ok(Reply::Message(format!("You said {prompt}")))
        }
    }

    fn clear(
        &self,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'static {
        self.history.lock().unwrap().take();
        ready(Ok(()))
    }

    fn save_history(
        &self,
        history: &Transcript,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'static {
        *self.history.lock().unwrap() = Some(history.clone());
        ready(Ok(()))
    }

    fn fetch_history(
        &self,
    ) -> impl Future<Output = Result<Option<Transcript>, Self::Error>>
    + Send
    + 'static {
        ready(Ok(self.history.lock().unwrap().clone()))
    }
}

mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_reply() {
        let backend = FakeBackend::default();

        let reply = backend.get_response("Good morning").await.unwrap();
        assert_eq!(reply, Reply::Message("You said Good morning".to_owned()));
        assert!(!reply.is_error());

        let reply = backend.get_response("").await.unwrap();
        assert!(reply.is_error());
        assert_eq!(reply.text(), "Prompt cannot be empty");
    }

    #[tokio::test(start_paused = true)]
    async fn test_error() {
        let backend = FakeBackend::default();
        let err = backend.get_response("offline").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unreachable);
    }

    #[tokio::test]
    async fn test_history_lifecycle() {
        let backend = FakeBackend::default();
        assert_eq!(backend.fetch_history().await.unwrap(), None);

        let transcript: Transcript =
            vec![Message::user("Hello"), Message::assistant("Hi there")].into();
        backend.save_history(&transcript).await.unwrap();
        assert_eq!(backend.fetch_history().await.unwrap(), Some(transcript));

        backend.clear().await.unwrap();
        assert_eq!(backend.fetch_history().await.unwrap(), None);
    }
}
