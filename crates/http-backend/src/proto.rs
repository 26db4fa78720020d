use little_chat_model::{ErrorKind, Reply, Transcript};
use mime::Mime;
use reqwest::header::{self, HeaderMap};
use serde::{Deserialize, Serialize};

use crate::Error;

// ------------------------------
// Types received from the server
// ------------------------------

/// Body of `POST /get_response`. Exactly one field is expected.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct ReplyPayload {
    pub message: Option<String>,
    pub error: Option<String>,
}

/// Body of the JSON variant of `GET /`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct HistoryPayload {
    #[serde(default)]
    pub history: Option<Transcript>,
}

// ------------------------
// Types sent to the server
// ------------------------

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PromptForm<'a> {
    pub prompt: &'a str,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SaveHistoryRequest<'a> {
    pub history: &'a Transcript,
}

// -----------
// Conversions
// -----------

/// Turns a decoded `/get_response` body into a reply.
///
/// An `error` field wins over `message`. A failed status is only
/// acceptable when the body carries an `error` field, which is how the
/// server rejects an empty prompt.
pub fn decode_reply(
    success: bool,
    payload: ReplyPayload,
) -> Result<Reply, Error> {
    match payload {
        ReplyPayload {
            error: Some(error), ..
        } => Ok(Reply::Error(error)),
        ReplyPayload {
            message: Some(message),
            ..
        } if success => Ok(Reply::Message(message)),
        _ if !success => Err(Error::new(
            "server answered with an error status",
            ErrorKind::Status,
        )),
        _ => Err(Error::new(
            "reply has neither `message` nor `error`",
            ErrorKind::InvalidResponse,
        )),
    }
}

/// Returns `true` if the response declares a JSON body.
pub fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<Mime>().ok())
        .map(|m| {
            m.type_() == mime::APPLICATION
                && (m.subtype() == mime::JSON || m.suffix() == Some(mime::JSON))
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use little_chat_model::Message;
    use reqwest::header::HeaderValue;
    use serde_json::json;

    use super::*;

    fn payload(value: serde_json::Value) -> ReplyPayload {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_decode_reply() {
        let reply = decode_reply(true, payload(json!({ "message": "Hi there" })));
        assert_eq!(reply.unwrap(), Reply::Message("Hi there".to_owned()));

        let reply =
            decode_reply(true, payload(json!({ "error": "rate limited" })));
        assert_eq!(reply.unwrap(), Reply::Error("rate limited".to_owned()));

        let reply = decode_reply(
            true,
            payload(json!({ "message": "Hi", "error": "rate limited" })),
        );
        assert_eq!(reply.unwrap(), Reply::Error("rate limited".to_owned()));
    }

    #[test]
    fn test_decode_reply_failures() {
        let reply = decode_reply(
            false,
            payload(json!({ "error": "Prompt cannot be empty" })),
        );
        assert_eq!(
            reply.unwrap(),
            Reply::Error("Prompt cannot be empty".to_owned())
        );

        let err = decode_reply(false, payload(json!({ "message": "Hi" })))
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Status);

        let err = decode_reply(true, payload(json!({}))).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidResponse);
    }

    #[test]
    fn test_history_payload() {
        let payload: HistoryPayload = serde_json::from_value(json!({
            "history": [
                { "role": "user", "message": "Hello" },
                { "role": "assistant", "message": "Hi there" },
            ]
        }))
        .unwrap();
        let expected: Transcript =
            vec![Message::user("Hello"), Message::assistant("Hi there")].into();
        assert_eq!(payload.history, Some(expected));

        let payload: HistoryPayload =
            serde_json::from_value(json!({})).unwrap();
        assert_eq!(payload.history, None);
    }

    #[test]
    fn test_save_history_body() {
        let transcript: Transcript = vec![Message::user("Hello")].into();
        let body = serde_json::to_value(SaveHistoryRequest {
            history: &transcript,
        })
        .unwrap();
        assert_eq!(
            body,
            json!({ "history": [{ "role": "user", "message": "Hello" }] })
        );
    }

    #[test]
    fn test_is_json() {
        let mut headers = HeaderMap::new();
        assert!(!is_json(&headers));

        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json; charset=utf-8"),
        );
        assert!(is_json(&headers));

        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/problem+json"),
        );
        assert!(is_json(&headers));

        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/html; charset=utf-8"),
        );
        assert!(!is_json(&headers));
    }
}
