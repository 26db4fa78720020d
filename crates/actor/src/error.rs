use std::error::Error;
use std::fmt;

/// Returned when a message is sent to an actor whose loop has already
/// stopped.
pub struct ActorDeadError;

impl fmt::Debug for ActorDeadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ActorDeadError")
    }
}

impl fmt::Display for ActorDeadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("the actor loop has stopped")
    }
}

impl Error for ActorDeadError {}
