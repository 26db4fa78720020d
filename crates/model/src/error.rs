use std::fmt::{self, Display};

/// The kind of error that occurred while talking to a backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The server could not be reached or the connection broke.
    Unreachable,
    /// The server answered with an error status and no usable body.
    Status,
    /// The server answered, but the body is not what the protocol expects.
    InvalidResponse,
    /// Any other errors.
    Other,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Unreachable => write!(f, "Server unreachable"),
            ErrorKind::Status => write!(f, "Error status"),
            ErrorKind::InvalidResponse => write!(f, "Invalid response"),
            ErrorKind::Other => write!(f, "Other error"),
        }
    }
}
