mod builder;
mod state;

use little_chat_actor::{Actor, ActorDeadError};
use little_chat_model::Transcript;
use tokio::sync::watch;

pub use builder::{DEFAULT_REVEAL_INTERVAL, SessionBuilder};
use state::{BeginInput, Clear, SessionState, Submit};
pub use state::TurnStage;

/// The assistant turn shown when the server could not be reached or its
/// answer was unusable.
pub const FALLBACK_REPLY: &str =
    "Error fetching AI response. Please try again later.";

/// A chat session, which owns the conversation, drives turns against a
/// backend and shows them through a renderer.
///
/// Commands are handled in the order they are issued, whatever stage the
/// session is in. A submission arriving while a turn is in flight is
/// queued and sent once the session becomes idle again.
///
/// The session keeps running while the handle (or a clone) is alive.
#[derive(Clone)]
pub struct ChatSession {
    actor: Actor<SessionState>,
    stage_rx: watch::Receiver<TurnStage>,
}

impl ChatSession {
    /// Submits user input.
    ///
    /// Empty or whitespace-only input is ignored.
    pub fn submit<S: Into<String>>(&self, input: S) {
        self.send(Submit(input.into()));
    }

    /// Tells the session that the host started collecting input.
    pub fn begin_input(&self) {
        self.send(BeginInput);
    }

    /// Clears the conversation on screen, in the cache and on the server.
    ///
    /// Running reveals are cancelled and queued submissions are dropped.
    /// A reply or a stored conversation that arrives for work started
    /// before the clear is discarded, and the session is idle again right
    /// away.
    pub fn clear(&self) {
        self.send(Clear);
    }

    /// Returns the current stage.
    #[inline]
    pub fn stage(&self) -> TurnStage {
        *self.stage_rx.borrow()
    }

    /// Returns a receiver that observes stage changes.
    #[inline]
    pub fn watch_stage(&self) -> watch::Receiver<TurnStage> {
        self.stage_rx.clone()
    }

    /// Returns the conversation as the session knows it.
    pub async fn transcript(&self) -> Result<Transcript, ActorDeadError> {
        self.actor.ask(|state, _| state.transcript.clone()).await
    }

    /// Waits until the session is idle with nothing queued.
    ///
    /// Reveals may still be running; see [`ChatSession::wait_reveals`].
    pub async fn wait_idle(&self) -> Result<(), ActorDeadError> {
        let idle_rx = self.actor.ask(|state, _| state.idle_waiter()).await?;
        idle_rx.await.map_err(|_| ActorDeadError)
    }

    /// Waits until every reveal started so far has ended.
    pub async fn wait_reveals(&self) -> Result<(), ActorDeadError> {
        let reveals =
            self.actor.ask(|state, _| state.running_reveals()).await?;
        for reveal in reveals {
            reveal.finished().await;
        }
        Ok(())
    }

    /// Stops the session. Queued commands are dropped.
    #[inline]
    pub fn shutdown(&self) {
        self.actor.stop();
    }

    fn send<M>(&self, msg: M)
    where
        M: little_chat_actor::Message<SessionState> + 'static,
    {
        if self.actor.send(msg).is_err() {
            error!("chat session has stopped");
        }
    }
}
