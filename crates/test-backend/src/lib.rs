//! A scripted, in-process chat backend for testing purpose.

mod preset;

use std::collections::VecDeque;
use std::error::Error as StdError;
use std::fmt::{self, Debug, Display, Formatter};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use little_chat_model::{
    BackendError, ChatBackend, ErrorKind, Reply, Transcript,
};
use tokio::time::sleep;

pub use preset::*;

#[derive(Debug)]
pub struct Error {
    #[allow(dead_code)]
    message: &'static str,
    kind: ErrorKind,
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Debug::fmt(self, f)
    }
}

impl StdError for Error {}

impl BackendError for Error {
    #[inline]
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

#[derive(Default)]
struct State {
    script: VecDeque<PresetReply>,
    delay: Option<Duration>,
    history: Option<Transcript>,
    history_unavailable: bool,
    persistence_broken: bool,
    prompts: Vec<String>,
    saved: Vec<Transcript>,
    clears: usize,
}

/// A fake server for testing purpose.
///
/// Replies are taken from a script in order, one per `get_response` call.
/// When the script runs out, requests fail. The backend also keeps the
/// server-side history and records every call, so tests can check what
/// the server would have seen.
///
/// Clones share the same state, so a test can keep one clone for
/// inspection and hand the other one to the code under test.
#[derive(Clone, Default)]
pub struct TestBackend {
    state: Arc<Mutex<State>>,
}

impl TestBackend {
    #[inline]
    pub fn add_reply(&mut self, preset: PresetReply) {
        self.lock().script.push_back(preset);
    }

    /// Delays every answer by `duration`.
    #[inline]
    pub fn set_delay(&mut self, duration: Duration) {
        self.lock().delay = Some(duration);
    }

    /// Sets the history the server holds for this session.
    #[inline]
    pub fn set_history(&mut self, history: Transcript) {
        self.lock().history = Some(history);
    }

    /// Makes `fetch_history` fail.
    #[inline]
    pub fn set_history_unavailable(&mut self) {
        self.lock().history_unavailable = true;
    }

    /// Makes `save_history` and `clear` fail.
    #[inline]
    pub fn set_persistence_broken(&mut self) {
        self.lock().persistence_broken = true;
    }

    /// Returns the history the server currently holds.
    #[inline]
    pub fn history(&self) -> Option<Transcript> {
        self.lock().history.clone()
    }

    /// Returns every prompt received so far.
    #[inline]
    pub fn prompts(&self) -> Vec<String> {
        self.lock().prompts.clone()
    }

    /// Returns every successfully saved history, oldest first.
    #[inline]
    pub fn saved(&self) -> Vec<Transcript> {
        self.lock().saved.clone()
    }

    /// Returns how many times `clear` was received.
    #[inline]
    pub fn clears(&self) -> usize {
        self.lock().clears
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn delay(&self) -> Duration {
        self.lock().delay.unwrap_or(Duration::from_millis(1))
    }
}

impl ChatBackend for TestBackend {
    type Error = crate::Error;

    fn get_response(
        &self,
        prompt: &str,
    ) -> impl Future<Output = Result<Reply, Self::Error>> + Send + 'static {
        let preset = {
            let mut state = self.lock();
            state.prompts.push(prompt.to_owned());
            state.script.pop_front()
        };
        let delay = self.delay();
        async move {
            sleep(delay).await;
            let Some(preset) = preset else {
                return Err(Error {
                    message: "no more preset replies",
                    kind: ErrorKind::Other,
                });
            };
            let kind = match &preset {
                PresetReply::InvalidResponse => ErrorKind::InvalidResponse,
                _ => ErrorKind::Unreachable,
            };
            preset.into_reply().ok_or(Error {
                message: "preset failure",
                kind,
            })
        }
    }

    fn clear(
        &self,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'static {
        let this = self.clone();
        let delay = self.delay();
        async move {
            sleep(delay).await;
            let mut state = this.lock();
            if state.persistence_broken {
                return Err(Error {
                    message: "clear rejected",
                    kind: ErrorKind::Status,
                });
            }
            state.clears += 1;
            state.history = None;
            Ok(())
        }
    }

    fn save_history(
        &self,
        history: &Transcript,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'static {
        let this = self.clone();
        let history = history.clone();
        let delay = self.delay();
        async move {
            sleep(delay).await;
            let mut state = this.lock();
            if state.persistence_broken {
                return Err(Error {
                    message: "save rejected",
                    kind: ErrorKind::Status,
                });
            }
            state.saved.push(history.clone());
            state.history = Some(history);
            Ok(())
        }
    }

    fn fetch_history(
        &self,
    ) -> impl Future<Output = Result<Option<Transcript>, Self::Error>>
    + Send
    + 'static {
        let this = self.clone();
        let delay = self.delay();
        async move {
            sleep(delay).await;
            let state = this.lock();
            if state.history_unavailable {
                return Err(Error {
                    message: "history unavailable",
                    kind: ErrorKind::Unreachable,
                });
            }
            Ok(state.history.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use little_chat_model::Message;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_scripted_replies() {
        let mut backend = TestBackend::default();
        backend.add_reply(PresetReply::message("Hi there"));
        backend.add_reply(PresetReply::error("rate limited"));
        backend.add_reply(PresetReply::Unreachable);

        let reply = backend.get_response("Hello").await.unwrap();
        assert_eq!(reply, Reply::Message("Hi there".to_owned()));

        let reply = backend.get_response("Hello again").await.unwrap();
        assert_eq!(reply, Reply::Error("rate limited".to_owned()));

        let err = backend.get_response("Anyone?").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unreachable);

        let err = backend.get_response("Still there?").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Other);

        assert_eq!(
            backend.prompts(),
            ["Hello", "Hello again", "Anyone?", "Still there?"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_history() {
        let mut backend = TestBackend::default();
        let transcript: Transcript =
            vec![Message::user("Hello"), Message::assistant("Hi there")].into();

        backend.save_history(&transcript).await.unwrap();
        assert_eq!(backend.fetch_history().await.unwrap(), Some(transcript));
        assert_eq!(backend.saved().len(), 1);

        backend.clear().await.unwrap();
        assert_eq!(backend.fetch_history().await.unwrap(), None);
        assert_eq!(backend.clears(), 1);

        backend.set_persistence_broken();
        assert!(backend.save_history(&Transcript::new()).await.is_err());
        assert!(backend.clear().await.is_err());
        assert_eq!(backend.clears(), 1);
    }
}
