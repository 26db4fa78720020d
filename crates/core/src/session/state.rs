use std::collections::{HashMap, VecDeque};
use std::fmt::{self, Debug};
use std::sync::Arc;
use std::time::Duration;

use little_chat_actor::{Actor, Message};
use little_chat_model::{
    BackendError, Message as ChatMessage, Reply, Role, Transcript,
};
use tokio::sync::{oneshot, watch};

use super::FALLBACK_REPLY;
use crate::backend_client::BackendClient;
use crate::history::HistoryStore;
use crate::render::{BubbleId, Renderer};
use crate::reveal::{RevealHandle, reveal_incrementally};

/// Where a session is in its turn cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TurnStage {
    /// Loading the stored conversation.
    #[default]
    Hydrating,
    /// Waiting for anything to happen.
    Idle,
    /// The host is collecting input.
    AwaitingInput,
    /// The user's message is being shown and sent.
    Sending,
    /// Waiting for the server's reply.
    AwaitingReply,
    /// The reply is being shown.
    Rendering,
    /// The conversation is being saved.
    Persisting,
}

impl TurnStage {
    /// Returns `true` if a new turn can start right away.
    #[inline]
    pub fn accepts_input(self) -> bool {
        matches!(self, TurnStage::Idle | TurnStage::AwaitingInput)
    }
}

pub struct SessionState {
    pub(super) backend: BackendClient,
    pub(super) renderer: Arc<dyn Renderer>,
    pub(super) history: HistoryStore,
    pub(super) transcript: Transcript,
    pub(super) stage: TurnStage,
    pub(super) stage_tx: watch::Sender<TurnStage>,
    pub(super) pending_inputs: VecDeque<String>,
    pub(super) reveals: HashMap<BubbleId, RevealHandle>,
    pub(super) reveal_interval: Duration,
    /// Bumped on every clear, so that results of work started before the
    /// clear can be told apart.
    pub(super) epoch: u64,
    pub(super) idle_waiters: Vec<oneshot::Sender<()>>,

    pub(super) on_idle: Option<Box<dyn Fn() + Send + Sync>>,
}

impl SessionState {
    fn set_stage(&mut self, stage: TurnStage) {
        if self.stage == stage {
            return;
        }
        trace!("stage: {:?} -> {stage:?}", self.stage);
        self.stage = stage;
        self.stage_tx.send_replace(stage);
    }

    fn hydrate(&mut self, handle: &Actor<Self>) {
        self.set_stage(TurnStage::Hydrating);
        let fetch = self.history.fetch();
        let epoch = self.epoch;
        let handle = handle.clone();
        tokio::spawn(async move {
            let server = fetch.await;
            handle.send(HistoryLoaded { epoch, server }).ok();
        });
    }

    fn history_loaded(
        &mut self,
        epoch: u64,
        server: Option<Transcript>,
        handle: &Actor<Self>,
    ) {
        if epoch != self.epoch {
            // The clear already moved the session on.
            debug!("conversation was cleared while loading, dropping it");
            return;
        }
        let transcript = self.history.resolve(server);
        for msg in &transcript {
            self.renderer.append_message(msg.role, &msg.text);
        }
        self.transcript = transcript;
        self.set_stage(TurnStage::Idle);
        self.process_next_input(handle);
    }

    #[inline]
    fn begin_input(&mut self) {
        if self.stage == TurnStage::Idle {
            self.set_stage(TurnStage::AwaitingInput);
        }
    }

    fn submit(&mut self, input: String, handle: &Actor<Self>) {
        if input.trim().is_empty() {
            trace!("ignoring empty input");
            return;
        }
        if !self.stage.accepts_input() {
            // Sent once the current turn is over.
            debug!("turn in progress, queueing input");
            self.pending_inputs.push_back(input);
            return;
        }
        self.start_turn(input, handle);
    }

    fn process_next_input(&mut self, handle: &Actor<Self>) {
        if !self.stage.accepts_input() {
            return;
        }
        if let Some(input) = self.pending_inputs.pop_front() {
            self.start_turn(input, handle);
            return;
        }
        for waiter in self.idle_waiters.drain(..) {
            waiter.send(()).ok();
        }
        if let Some(on_idle) = &self.on_idle {
            on_idle();
        }
    }

    /// Starts a turn, assuming the stage is checked.
    fn start_turn(&mut self, input: String, handle: &Actor<Self>) {
        self.set_stage(TurnStage::Sending);
        self.renderer.append_message(Role::User, &input);
        self.renderer.show_pending_indicator();

        let request = self.backend.get_response(&input);
        self.transcript.push(ChatMessage::user(input));
        let epoch = self.epoch;
        let handle = handle.clone();
        tokio::spawn(async move {
            let result = request.await;
            handle.send(ReplyArrived { epoch, result }).ok();
        });
        self.set_stage(TurnStage::AwaitingReply);
    }

    fn reply_arrived(
        &mut self,
        epoch: u64,
        result: Result<Reply, Box<dyn BackendError>>,
        handle: &Actor<Self>,
    ) {
        if epoch != self.epoch {
            debug!("dropping a reply to a cleared conversation");
            return;
        }
        self.renderer.clear_pending_indicator();

        // A failed request still ends the turn, with the fallback text as
        // the answer.
        let reply = result.unwrap_or_else(|err| {
            warn!("failed to get a reply: {err}");
            Reply::Error(FALLBACK_REPLY.to_owned())
        });

        self.set_stage(TurnStage::Rendering);
        match reply {
            Reply::Message(text) => {
                let bubble = self.renderer.append_message(Role::Assistant, "");
                let reveal = reveal_incrementally(
                    Arc::clone(&self.renderer),
                    bubble,
                    &text,
                    self.reveal_interval,
                );
                self.track_reveal(reveal);
                self.transcript.push(ChatMessage::assistant(text));
            }
            Reply::Error(text) => {
                self.renderer.append_message(Role::Assistant, &text);
                self.transcript.push(ChatMessage::assistant(text));
            }
        }

        self.set_stage(TurnStage::Persisting);
        // Runs in the background, the next turn doesn't wait for it.
        self.history.save(&self.transcript);
        self.set_stage(TurnStage::Idle);
        self.process_next_input(handle);
    }

    fn track_reveal(&mut self, reveal: RevealHandle) {
        self.reveals.retain(|_, reveal| !reveal.is_finished());
        self.reveals.insert(reveal.bubble(), reveal);
    }

    fn clear(&mut self, handle: &Actor<Self>) {
        for (_, reveal) in self.reveals.drain() {
            reveal.cancel();
        }
        if !self.pending_inputs.is_empty() {
            debug!("dropping {} queued inputs", self.pending_inputs.len());
            self.pending_inputs.clear();
        }
        self.renderer.clear();
        self.transcript.clear();
        self.epoch += 1;
        self.history.clear();

        // Nothing is in flight anymore: a pending load or reply is dropped
        // when it arrives.
        if let TurnStage::Hydrating | TurnStage::AwaitingReply = self.stage {
            self.set_stage(TurnStage::Idle);
            self.process_next_input(handle);
        }
    }

    pub(super) fn idle_waiter(&mut self) -> oneshot::Receiver<()> {
        let (idle_tx, idle_rx) = oneshot::channel();
        if self.stage.accepts_input() && self.pending_inputs.is_empty() {
            idle_tx.send(()).ok();
        } else {
            self.idle_waiters.push(idle_tx);
        }
        idle_rx
    }

    pub(super) fn running_reveals(&mut self) -> Vec<RevealHandle> {
        self.reveals.retain(|_, reveal| !reveal.is_finished());
        self.reveals.values().cloned().collect()
    }
}

#[derive(Debug)]
pub struct Hydrate;

impl Message<SessionState> for Hydrate {
    #[inline]
    fn handle(self, state: &mut SessionState, handle: &Actor<SessionState>) {
        state.hydrate(handle);
    }
}

struct HistoryLoaded {
    epoch: u64,
    server: Option<Transcript>,
}

impl Debug for HistoryLoaded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HistoryLoaded")
            .field("epoch", &self.epoch)
            .field("len", &self.server.as_ref().map(Transcript::len))
            .finish()
    }
}

impl Message<SessionState> for HistoryLoaded {
    #[inline]
    fn handle(self, state: &mut SessionState, handle: &Actor<SessionState>) {
        state.history_loaded(self.epoch, self.server, handle);
    }
}

#[derive(Debug)]
pub struct Submit(pub String);

impl Message<SessionState> for Submit {
    #[inline]
    fn handle(self, state: &mut SessionState, handle: &Actor<SessionState>) {
        state.submit(self.0, handle);
    }
}

#[derive(Debug)]
pub struct BeginInput;

impl Message<SessionState> for BeginInput {
    #[inline]
    fn handle(self, state: &mut SessionState, _handle: &Actor<SessionState>) {
        state.begin_input();
    }
}

#[derive(Debug)]
pub struct Clear;

impl Message<SessionState> for Clear {
    #[inline]
    fn handle(self, state: &mut SessionState, handle: &Actor<SessionState>) {
        state.clear(handle);
    }
}

#[derive(Debug)]
struct ReplyArrived {
    epoch: u64,
    result: Result<Reply, Box<dyn BackendError>>,
}

impl Message<SessionState> for ReplyArrived {
    #[inline]
    fn handle(self, state: &mut SessionState, handle: &Actor<SessionState>) {
        state.reply_arrived(self.epoch, self.result, handle);
    }
}
