use little_chat_model::Reply;
use serde::{Deserialize, Serialize};

/// How the test backend answers one `get_response` call.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum PresetReply {
    /// Answer with `{"message": ...}`.
    #[serde(rename = "message")]
    Message(String),
    /// Answer with `{"error": ...}`.
    #[serde(rename = "error")]
    Error(String),
    /// Fail as if the server could not be reached.
    #[serde(rename = "unreachable")]
    Unreachable,
    /// Fail as if the server answered with something that isn't JSON.
    #[serde(rename = "invalid_response")]
    InvalidResponse,
}

impl PresetReply {
    /// Creates a `PresetReply::Message`.
    #[inline]
    pub fn message<S: Into<String>>(text: S) -> Self {
        Self::Message(text.into())
    }

    /// Creates a `PresetReply::Error`.
    #[inline]
    pub fn error<S: Into<String>>(text: S) -> Self {
        Self::Error(text.into())
    }

    pub(crate) fn into_reply(self) -> Option<Reply> {
        match self {
            PresetReply::Message(text) => Some(Reply::Message(text)),
            PresetReply::Error(text) => Some(Reply::Error(text)),
            PresetReply::Unreachable | PresetReply::InvalidResponse => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_script_from_json() {
        let script: Vec<PresetReply> = serde_json::from_value(json!([
            { "type": "message", "data": "Hi there" },
            { "type": "error", "data": "rate limited" },
            { "type": "unreachable" },
        ]))
        .unwrap();

        assert_eq!(
            script,
            [
                PresetReply::message("Hi there"),
                PresetReply::error("rate limited"),
                PresetReply::Unreachable,
            ]
        );
    }
}
