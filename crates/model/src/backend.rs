use std::error::Error;

use crate::error::ErrorKind;
use crate::message::Transcript;
use crate::reply::Reply;

/// The error type for a chat backend.
pub trait BackendError: Error + Send + Sync + 'static {
    /// Returns the kind of this error.
    fn kind(&self) -> ErrorKind;
}

/// The server side of a chat: it answers prompts and keeps the durable
/// copy of the conversation.
///
/// Every method returns a future that is independent of `self`, so callers
/// can spawn it and drop the backend at any time. None of the operations
/// are retried by the caller.
pub trait ChatBackend: Send + Sync {
    /// The error type that may be returned by the backend.
    type Error: BackendError;

    /// Asks for the assistant's reply to `prompt`.
    ///
    /// An `Ok(Reply::Error(_))` is a regular answer carrying a user-facing
    /// error text; `Err(_)` means the request itself failed.
    fn get_response(
        &self,
        prompt: &str,
    ) -> impl Future<Output = Result<Reply, Self::Error>> + Send + 'static;

    /// Deletes the server's copy of the conversation.
    fn clear(
        &self,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'static;

    /// Replaces the server's copy of the conversation with `history`.
    fn save_history(
        &self,
        history: &Transcript,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'static;

    /// Fetches the server's copy of the conversation.
    ///
    /// `Ok(None)` means the server has no record for this session.
    fn fetch_history(
        &self,
    ) -> impl Future<Output = Result<Option<Transcript>, Self::Error>>
    + Send
    + 'static;
}
