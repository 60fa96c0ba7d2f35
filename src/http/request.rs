//! Per-request context handed through the middleware chain.
//!
//! # Responsibilities
//! - Carry the request head (method, target, headers) and extensions
//! - Carry the decoded input as a type-erased value
//! - Keep the raw body bytes when the body was read
//!
//! # Design Decisions
//! - Created once per call and owned by the task serving it
//! - Input type is fixed at registration, so handlers downcast to it

use std::any::Any;

use axum::http::request::Parts;
use axum::http::{Extensions, HeaderMap, Method, Uri, Version};
use bytes::Bytes;

/// Request line and headers, cloned into error reports.
#[derive(Debug, Clone)]
pub struct RequestHead {
    pub method: Method,
    pub uri: Uri,
    pub version: Version,
    pub headers: HeaderMap,
}

impl From<&Parts> for RequestHead {
    fn from(parts: &Parts) -> Self {
        Self {
            method: parts.method.clone(),
            uri: parts.uri.clone(),
            version: parts.version,
            headers: parts.headers.clone(),
        }
    }
}

pub(crate) type Input = Box<dyn Any + Send + Sync>;

/// A request after binding, as seen by middleware and handlers.
pub struct Request {
    head: RequestHead,
    extensions: Extensions,
    body: Bytes,
    input: Input,
}

impl Request {
    pub(crate) fn new(head: RequestHead, extensions: Extensions, body: Bytes, input: Input) -> Self {
        Self {
            head,
            extensions,
            body,
            input,
        }
    }

    pub fn head(&self) -> &RequestHead {
        &self.head
    }

    pub fn method(&self) -> &Method {
        &self.head.method
    }

    pub fn uri(&self) -> &Uri {
        &self.head.uri
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.head.headers
    }

    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }

    /// Raw request body. Empty when the input was bound from the query.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// The decoded input, if it is a `T`.
    pub fn input<T: 'static>(&self) -> Option<&T> {
        self.input.downcast_ref::<T>()
    }

    /// Take ownership of the decoded input. Gives the request back when the
    /// input is not a `T`.
    pub fn into_input<T: 'static>(self) -> Result<T, Self> {
        let Self {
            head,
            extensions,
            body,
            input,
        } = self;
        match input.downcast::<T>() {
            Ok(value) => Ok(*value),
            Err(input) => Err(Self {
                head,
                extensions,
                body,
                input,
            }),
        }
    }
}

impl std::fmt::Debug for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.head.method)
            .field("uri", &self.head.uri)
            .field("body_len", &self.body.len())
            .finish_non_exhaustive()
    }
}
