//! Dispatcher error definitions.

use std::time::Duration;

use axum::http::{Method, StatusCode};
use thiserror::Error;

use crate::binding::BindError;
use crate::http::content_type::ContentTypeError;
use crate::http::negotiate::NegotiationError;

/// Errors raised while serving a request. All of them reach the on-error
/// callback except [`Error::AlreadySent`], which is returned to the caller
/// of `send`.
#[derive(Debug, Error)]
pub enum Error {
    /// Method outside the served set.
    #[error("method {0} not allowed")]
    MethodNotAllowed(Method),

    /// OPTIONS request without an options handler.
    #[error("method {0} handler not defined")]
    OptionsNotDefined(Method),

    /// Pattern matched but the method was never registered.
    #[error("method {0} not registered")]
    MethodNotRegistered(Method),

    #[error("invalid content type {content_type:?}: {source}")]
    InvalidContentType {
        content_type: String,
        #[source]
        source: ContentTypeError,
    },

    #[error("invalid query: {0}")]
    InvalidQuery(#[from] BindError),

    #[error("request body exceeds {limit} bytes")]
    BodyTooLarge { limit: usize },

    #[error("request body not read within {0:?}")]
    ReadTimeout(Duration),

    #[error("unable to read request body: {0}")]
    ReadBody(#[source] axum::Error),

    #[error("unable to decode request body: {0}")]
    DecodeBody(#[source] serde_json::Error),

    #[error("invalid accept encoding: {0}")]
    InvalidAcceptEncoding(#[from] NegotiationError),

    /// The handler's output cannot be serialized; a server-side bug.
    #[error("unable to encode output: {0}")]
    EncodeOutput(#[source] serde_json::Error),

    #[error("unable to write response body: {0}")]
    WriteBody(#[source] std::io::Error),

    #[error("response body not written within {0:?}")]
    WriteTimeout(Duration),

    /// The transport stopped waiting for the response.
    #[error("response receiver dropped")]
    ResponseDropped,

    #[error("response already sent")]
    AlreadySent,

    #[error("handler returned without sending a response")]
    NotSent,
}

impl Error {
    /// Status the dispatcher answers with, when the error produces a response.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::MethodNotAllowed(_)
            | Error::OptionsNotDefined(_)
            | Error::MethodNotRegistered(_) => Some(StatusCode::METHOD_NOT_ALLOWED),
            Error::InvalidContentType { .. }
            | Error::InvalidQuery(_)
            | Error::BodyTooLarge { .. }
            | Error::ReadTimeout(_)
            | Error::ReadBody(_)
            | Error::DecodeBody(_)
            | Error::InvalidAcceptEncoding(_) => Some(StatusCode::BAD_REQUEST),
            Error::EncodeOutput(_) | Error::NotSent => Some(StatusCode::INTERNAL_SERVER_ERROR),
            Error::WriteBody(_)
            | Error::WriteTimeout(_)
            | Error::ResponseDropped
            | Error::AlreadySent => None,
        }
    }

    /// Plain-text body used when the dispatcher answers on its own.
    pub fn reply_message(&self) -> &'static str {
        match self {
            Error::MethodNotAllowed(_)
            | Error::OptionsNotDefined(_)
            | Error::MethodNotRegistered(_) => "method not allowed",
            Error::InvalidContentType { .. } => "invalid content type",
            Error::InvalidQuery(_) => "invalid query",
            Error::BodyTooLarge { .. } => "request body too large",
            Error::ReadTimeout(_) | Error::ReadBody(_) => "unable to read request body",
            Error::DecodeBody(_) => "unable to decode request body",
            Error::InvalidAcceptEncoding(_) => "invalid accept encoding",
            Error::EncodeOutput(_) => "unable to encode output",
            Error::NotSent => "handler did not send a response",
            Error::WriteBody(_)
            | Error::WriteTimeout(_)
            | Error::ResponseDropped
            | Error::AlreadySent => "internal server error",
        }
    }

    /// Whether the error points at the server rather than the client.
    pub fn is_server_side(&self) -> bool {
        matches!(
            self,
            Error::EncodeOutput(_)
                | Error::NotSent
                | Error::WriteBody(_)
                | Error::WriteTimeout(_)
                | Error::ResponseDropped
        )
    }
}

/// Setup-time registration errors. `Handler::handle` and
/// `Registrar::register` panic on these.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegisterError {
    #[error("invalid pattern {0:?}: expected [host]/path")]
    InvalidPattern(String),

    #[error("method {0:?} not allowed")]
    MethodNotAllowed(String),

    #[error("method {0:?} already registered")]
    AlreadyRegistered(String),

    #[error("method {0:?} requires an input type")]
    InputRequired(String),

    #[error("input type {type_name} must be a struct, found {shape}")]
    InputNotStruct {
        type_name: &'static str,
        shape: &'static str,
    },
}
