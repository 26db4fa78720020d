/// The outcome of asking the server for an assistant reply.
///
/// Both variants are ordinary conversational turns. Transport failures are
/// not represented here; they are reported as errors by the backend.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Reply {
    /// The assistant's answer.
    Message(String),
    /// A user-facing error text produced by the server, shown verbatim as
    /// the assistant's answer.
    Error(String),
}

impl Reply {
    /// Returns the text to show as the assistant's message.
    #[inline]
    pub fn text(&self) -> &str {
        match self {
            Reply::Message(text) | Reply::Error(text) => text,
        }
    }

    /// Returns `true` if the server signalled an error condition.
    #[inline]
    pub fn is_error(&self) -> bool {
        matches!(self, Reply::Error(_))
    }
}
