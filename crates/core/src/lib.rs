//! Core logic of the chat: the renderer contract and the typing reveal,
//! history reconciliation between the log, the client cache and the
//! server, and the session that drives one turn after another.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

mod backend_client;
pub mod history;
pub mod render;
pub mod reveal;
mod session;

pub use backend_client::BackendClient;
pub use session::{
    ChatSession, DEFAULT_REVEAL_INTERVAL, FALLBACK_REPLY, SessionBuilder,
    TurnStage,
};
