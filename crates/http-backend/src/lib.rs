//! A chat backend talking to the chat server over HTTP.
//!
//! Endpoints:
//!
//! - `POST /get_response` with a form-encoded `prompt`, answering JSON with
//!   either `message` or `error`.
//! - `POST /clear` to delete the server's copy of the conversation.
//! - `POST /save_history` with `{"history": [...]}`.
//! - `GET /` with `Accept: application/json`, answering `{"history": [...]}`.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

mod config;
mod proto;

use std::error::Error as StdError;
use std::fmt::{self, Display};
use std::sync::Arc;

use little_chat_model::{
    BackendError, ChatBackend, ErrorKind, Reply, Transcript,
};
use reqwest::{Client, RequestBuilder, Response, header};
use tracing::Instrument;

pub use config::{HttpConfig, HttpConfigBuilder};
use proto::{HistoryPayload, PromptForm, ReplyPayload, SaveHistoryRequest};

/// Error type for [`HttpBackend`].
#[derive(Debug)]
pub struct Error {
    message: String,
    kind: ErrorKind,
}

impl Error {
    fn new(message: impl Into<String>, kind: ErrorKind) -> Self {
        Self {
            message: message.into(),
            kind,
        }
    }

    /// Returns the error message.
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_connect() || err.is_timeout() {
            ErrorKind::Unreachable
        } else if err.is_status() {
            ErrorKind::Status
        } else if err.is_decode() {
            ErrorKind::InvalidResponse
        } else {
            ErrorKind::Other
        };
        Self::new(format!("{err}"), kind)
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl StdError for Error {}

impl BackendError for Error {
    #[inline]
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

/// HTTP chat backend.
///
/// Cookies are kept between requests, since the server identifies the
/// conversation by its session cookie.
#[derive(Clone, Debug)]
pub struct HttpBackend {
    client: Client,
    config: Arc<HttpConfig>,
}

impl HttpBackend {
    /// Creates a new `HttpBackend` with the given configuration.
    pub fn new(config: HttpConfig) -> Result<Self, Error> {
        let mut builder = Client::builder().cookie_store(true);
        if config.no_proxy {
            builder = builder.no_proxy();
        }
        let client = builder.build()?;
        Ok(Self {
            client,
            config: Arc::new(config),
        })
    }

    fn request(&self, req: RequestBuilder) -> RequestBuilder {
        let req = req.header(header::ACCEPT, "application/json");
        match self.config.timeout {
            Some(timeout) => req.timeout(timeout),
            None => req,
        }
    }
}

impl ChatBackend for HttpBackend {
    type Error = Error;

    fn get_response(
        &self,
        prompt: &str,
    ) -> impl Future<Output = Result<Reply, Self::Error>> + Send + 'static {
        let resp_fut = self
            .request(self.client.post(self.config.url("/get_response")))
            .form(&PromptForm { prompt })
            .send();

        async move {
            let resp = resp_fut.await?;
            let success = resp.status().is_success();
            if !proto::is_json(resp.headers()) {
                let kind = if success {
                    ErrorKind::InvalidResponse
                } else {
                    ErrorKind::Status
                };
                return Err(Error::new(
                    format!("unexpected reply ({})", resp.status()),
                    kind,
                ));
            }
            let payload = resp.json::<ReplyPayload>().await?;
            trace!("got reply payload: {payload:?}");
            proto::decode_reply(success, payload)
        }
        .instrument(debug_span!("get_response"))
    }

    fn clear(
        &self,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'static {
        let resp_fut = self
            .request(self.client.post(self.config.url("/clear")))
            .send();
        async move {
            resp_fut.await.and_then(Response::error_for_status)?;
            Ok(())
        }
    }

    fn save_history(
        &self,
        history: &Transcript,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'static {
        let resp_fut = self
            .request(self.client.post(self.config.url("/save_history")))
            .json(&SaveHistoryRequest { history })
            .send();
        async move {
            resp_fut.await.and_then(Response::error_for_status)?;
            Ok(())
        }
    }

    fn fetch_history(
        &self,
    ) -> impl Future<Output = Result<Option<Transcript>, Self::Error>>
    + Send
    + 'static {
        let resp_fut = self.request(self.client.get(self.config.url("/"))).send();
        async move {
            let resp = resp_fut.await.and_then(Response::error_for_status)?;
            if !proto::is_json(resp.headers()) {
                // The server only renders its page, there is no history
                // to bootstrap from.
                debug!("index is not JSON, assuming no server history");
                return Ok(None);
            }
            let payload = resp.json::<HistoryPayload>().await?;
            Ok(payload.history)
        }
    }
}
