//! Scoped handler configuration.
//!
//! # Data Flow
//! ```text
//! Config::default()
//!     → Options (root)    .resolve() → Arc<Config> held by Handler
//!     → Options (pattern) .resolve() → Arc<Config> held by PatternHandler
//!     → Options (method)  .resolve() → Arc<Config> held by MethodHandler
//! ```
//!
//! # Design Decisions
//! - `Options` is an overlay; unset fields inherit from the parent scope
//! - Middleware is appended, scalars are overridden
//! - A resolved `Config` is never mutated; requests read the method's snapshot

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::response::Response;
use futures_util::future::BoxFuture;

use crate::handler::Error;
use crate::http::encoding::DEFAULT_COMPRESSION_LEVEL;
use crate::http::middleware::{middleware_fn, Middleware, Next};
use crate::http::request::{Request, RequestHead};
use crate::http::sender::Sender;

/// Callback receiving every error reported while serving.
pub type OnError = Arc<dyn Fn(&Error, &RequestHead) + Send + Sync>;

/// Plain transport-level handler, used for OPTIONS and not-found.
pub type RawHandler =
    Arc<dyn Fn(axum::http::Request<Body>) -> BoxFuture<'static, Response> + Send + Sync>;

/// Fully resolved configuration of one scope.
#[derive(Clone)]
pub struct Config {
    pub(crate) on_error: Option<OnError>,
    pub(crate) middleware: Vec<Middleware>,
    /// Zero means unlimited.
    pub(crate) max_request_body_size: usize,
    pub(crate) read_timeout: Option<Duration>,
    pub(crate) write_timeout: Option<Duration>,
    pub(crate) allow_encoding: bool,
    pub(crate) compression_level: u32,
    pub(crate) not_found: Option<RawHandler>,
    pub(crate) options_handler: Option<RawHandler>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            on_error: None,
            middleware: Vec::new(),
            max_request_body_size: 0,
            read_timeout: None,
            write_timeout: None,
            allow_encoding: false,
            compression_level: DEFAULT_COMPRESSION_LEVEL,
            not_found: None,
            options_handler: None,
        }
    }
}

impl Config {
    pub fn max_request_body_size(&self) -> usize {
        self.max_request_body_size
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout
    }

    pub fn write_timeout(&self) -> Option<Duration> {
        self.write_timeout
    }

    pub fn allow_encoding(&self) -> bool {
        self.allow_encoding
    }

    pub fn compression_level(&self) -> u32 {
        self.compression_level
    }

    pub fn middleware_len(&self) -> usize {
        self.middleware.len()
    }

    /// Log the error and hand it to the on-error callback.
    pub(crate) fn report(&self, err: &Error, head: &RequestHead) {
        if err.is_server_side() {
            tracing::error!(method = %head.method, uri = %head.uri, error = %err, "Request failed");
        } else {
            tracing::warn!(method = %head.method, uri = %head.uri, error = %err, "Request rejected");
        }
        if let Some(on_error) = &self.on_error {
            on_error(err, head);
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("on_error", &self.on_error.is_some())
            .field("middleware", &self.middleware.len())
            .field("max_request_body_size", &self.max_request_body_size)
            .field("read_timeout", &self.read_timeout)
            .field("write_timeout", &self.write_timeout)
            .field("allow_encoding", &self.allow_encoding)
            .field("compression_level", &self.compression_level)
            .field("not_found", &self.not_found.is_some())
            .field("options_handler", &self.options_handler.is_some())
            .finish()
    }
}

/// Overrides applied on top of a parent scope's [`Config`].
#[derive(Clone, Default)]
pub struct Options {
    on_error: Option<OnError>,
    middleware: Vec<Middleware>,
    max_request_body_size: Option<usize>,
    read_timeout: Option<Option<Duration>>,
    write_timeout: Option<Option<Duration>>,
    allow_encoding: Option<bool>,
    compression_level: Option<u32>,
    not_found: Option<RawHandler>,
    options_handler: Option<RawHandler>,
}

fn raw_handler<F, Fut>(f: F) -> RawHandler
where
    F: Fn(axum::http::Request<Body>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    Arc::new(move |req| -> BoxFuture<'static, Response> { Box::pin(f(req)) })
}

fn non_zero(duration: Duration) -> Option<Duration> {
    (!duration.is_zero()).then_some(duration)
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_error<F>(mut self, on_error: F) -> Self
    where
        F: Fn(&Error, &RequestHead) + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(on_error));
        self
    }

    /// Append an interceptor to the inherited chain.
    pub fn middleware<F, Fut>(self, f: F) -> Self
    where
        F: Fn(Request, Sender, Next) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.with_middleware(middleware_fn(f))
    }

    pub fn with_middleware(mut self, middleware: Middleware) -> Self {
        self.middleware.push(middleware);
        self
    }

    /// Cap on request body bytes. Zero disables the cap.
    pub fn max_request_body_size(mut self, limit: usize) -> Self {
        self.max_request_body_size = Some(limit);
        self
    }

    /// Deadline for reading the request body. Zero disables it.
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(non_zero(timeout));
        self
    }

    /// Deadline for writing the response body. Zero disables it.
    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = Some(non_zero(timeout));
        self
    }

    pub fn allow_encoding(mut self, allow: bool) -> Self {
        self.allow_encoding = Some(allow);
        self
    }

    /// Level (0-9) used by the compressing encodings.
    pub fn compression_level(mut self, level: u32) -> Self {
        self.compression_level = Some(level.min(9));
        self
    }

    pub fn not_found_handler<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(axum::http::Request<Body>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        self.not_found = Some(raw_handler(f));
        self
    }

    pub fn options_handler<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(axum::http::Request<Body>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        self.options_handler = Some(raw_handler(f));
        self
    }

    /// Layer `other` on top of `self`.
    pub fn merge(mut self, other: Options) -> Self {
        self.middleware.extend(other.middleware);
        Self {
            on_error: other.on_error.or(self.on_error),
            middleware: self.middleware,
            max_request_body_size: other.max_request_body_size.or(self.max_request_body_size),
            read_timeout: other.read_timeout.or(self.read_timeout),
            write_timeout: other.write_timeout.or(self.write_timeout),
            allow_encoding: other.allow_encoding.or(self.allow_encoding),
            compression_level: other.compression_level.or(self.compression_level),
            not_found: other.not_found.or(self.not_found),
            options_handler: other.options_handler.or(self.options_handler),
        }
    }

    /// Produce the child scope's configuration. `parent` is left untouched.
    pub fn resolve(&self, parent: &Config) -> Config {
        let mut middleware = parent.middleware.clone();
        middleware.extend(self.middleware.iter().cloned());
        Config {
            on_error: self.on_error.clone().or_else(|| parent.on_error.clone()),
            middleware,
            max_request_body_size: self
                .max_request_body_size
                .unwrap_or(parent.max_request_body_size),
            read_timeout: self.read_timeout.unwrap_or(parent.read_timeout),
            write_timeout: self.write_timeout.unwrap_or(parent.write_timeout),
            allow_encoding: self.allow_encoding.unwrap_or(parent.allow_encoding),
            compression_level: self.compression_level.unwrap_or(parent.compression_level),
            not_found: self.not_found.clone().or_else(|| parent.not_found.clone()),
            options_handler: self
                .options_handler
                .clone()
                .or_else(|| parent.options_handler.clone()),
        }
    }
}
