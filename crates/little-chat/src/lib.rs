//! An out-of-the-box chat client for the terminal.
//!
//! The crate wires an HTTP backend, a terminal renderer and a file-backed
//! cache into a ready-to-use session, and ships the `little-chat` CLI. It
//! can also be used as a library, with the building blocks re-exported
//! below for hosts that want a different setup.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

mod cache;
mod session;
mod terminal;

pub use cache::FileCache;
pub use session::SessionBuilder;
pub use terminal::TerminalRenderer;

/// Re-exports of [`little_chat_core`] crate.
pub mod core {
    pub use little_chat_core::*;
}

/// Re-exports of [`little_chat_http`] crate.
pub mod http {
    pub use little_chat_http::*;
}

/// Re-exports of [`little_chat_model`] crate.
pub mod model {
    pub use little_chat_model::*;
}
