//! Data model and backend contract of a chat conversation.
//!
//! This crate defines the messages a conversation is made of and the
//! protocol that the chat session uses to talk to the server that produces
//! assistant replies and stores history. It doesn't implement any
//! transport; see the HTTP backend crate for the real one, and the test
//! backend crate for a scripted fake.

#![deny(missing_docs)]

mod backend;
mod error;
mod message;
mod reply;

pub use backend::*;
pub use error::*;
pub use message::*;
pub use reply::*;
