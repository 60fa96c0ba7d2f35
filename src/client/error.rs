//! Client-side error definitions.

use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use thiserror::Error;

use crate::binding::BindError;
use crate::http::content_type::ContentTypeError;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Everything [`Caller::call`](super::Caller::call) can fail with. Each
/// kind is a separate variant so callers can branch without matching text.
#[derive(Debug, Error)]
pub enum CallError {
    /// Caller built for a method outside HEAD/GET/DELETE/POST/PUT/PATCH.
    #[error("method {0:?} not allowed")]
    MethodNotAllowed(String),

    #[error("invalid endpoint {endpoint:?}: {source}")]
    InvalidUrl {
        endpoint: String,
        #[source]
        source: url::ParseError,
    },

    #[error("unable to set input to query: {0}")]
    Query(#[from] BindError),

    #[error("unable to encode input: {0}")]
    Encode(#[source] serde_json::Error),

    /// Transport failure: connect, timeout, cancelled, protocol.
    #[error("request error: {0}")]
    Request(#[source] reqwest::Error),

    #[error("invalid content type {content_type:?}: {source}")]
    InvalidContentType {
        status: StatusCode,
        content_type: String,
        #[source]
        source: ContentTypeError,
    },

    #[error("unable to read response body: {0}")]
    ReadBody(#[source] reqwest::Error),

    /// The server answered with a `text/plain` error page.
    #[error("plain text error: {message}")]
    PlainText { status: StatusCode, message: String },

    /// Non-200 response decoded into the configured error output type.
    #[error("{error}")]
    Structured {
        status: StatusCode,
        headers: HeaderMap,
        error: BoxError,
    },

    /// Non-200 answer to a HEAD call made with an error output type; there
    /// is no body to decode.
    #[error("request failed with status {status}")]
    Status { status: StatusCode, headers: HeaderMap },

    #[error("unable to decode response body: {source}")]
    Decode {
        status: StatusCode,
        #[source]
        source: serde_json::Error,
    },
}

impl CallError {
    /// Status of the response, when one was received.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            CallError::InvalidContentType { status, .. }
            | CallError::PlainText { status, .. }
            | CallError::Structured { status, .. }
            | CallError::Status { status, .. }
            | CallError::Decode { status, .. } => Some(*status),
            CallError::Request(err) | CallError::ReadBody(err) => err.status(),
            _ => None,
        }
    }

    /// The decoded error output, if it is an `E`.
    pub fn structured<E>(&self) -> Option<&E>
    where
        E: std::error::Error + 'static,
    {
        match self {
            CallError::Structured { error, .. } => error.downcast_ref::<E>(),
            _ => None,
        }
    }

    pub fn is_plain_text(&self) -> bool {
        matches!(self, CallError::PlainText { .. })
    }
}
