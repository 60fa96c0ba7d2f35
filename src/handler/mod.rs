//! Request dispatching subsystem.
//!
//! # Data Flow
//! ```text
//! axum Request
//!     → Handler (mod.rs): method gate, OPTIONS, '*' target
//!     → RouteTable lookup (host, path)
//!     → PatternHandler (pattern.rs): method table, "" fallback, 405
//!     → MethodHandler (method.rs): bind input, run middleware + handler
//!     → Response from the Sender
//! ```
//!
//! # Design Decisions
//! - Configuration resolves once per scope at registration (options.rs)
//! - Registration errors panic, request errors go to the on-error callback
//! - Input types are described by a Prototype, never by a shared value

mod error;
mod method;
mod options;
mod pattern;
mod prototype;

pub use error::{Error, RegisterError};
pub use options::{Config, OnError, Options, RawHandler};
pub use pattern::Registrar;
pub use prototype::Prototype;

use std::convert::Infallible;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::header::{self, HeaderValue};
use axum::http::{Method, StatusCode};
use axum::response::Response;
use futures_util::future::BoxFuture;
use tower::Service;

use crate::http::request::RequestHead;
use crate::http::response::plain_text;
use crate::routing::RouteTable;
use pattern::PatternHandler;

/// Root dispatcher. Cheap to clone; clones share the route table.
#[derive(Clone)]
pub struct Handler {
    inner: Arc<Inner>,
}

struct Inner {
    config: Arc<Config>,
    routes: RouteTable<Arc<PatternHandler>>,
}

/// Methods the dispatcher serves at all.
fn is_known_method(method: &Method) -> bool {
    matches!(
        *method,
        Method::GET
            | Method::HEAD
            | Method::POST
            | Method::PUT
            | Method::PATCH
            | Method::DELETE
            | Method::OPTIONS
    )
}

impl Handler {
    pub fn new(options: Options) -> Self {
        Self {
            inner: Arc::new(Inner {
                config: Arc::new(options.resolve(&Config::default())),
                routes: RouteTable::new(),
            }),
        }
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Registrar for `pattern`. The first call fixes the pattern's options;
    /// later calls return the same pattern and ignore theirs.
    ///
    /// # Panics
    /// When the pattern has no path part.
    pub fn handle(&self, pattern: &str, options: Options) -> Registrar {
        match self.try_handle(pattern, options) {
            Ok(registrar) => registrar,
            Err(err) => panic!("rapi: {err}"),
        }
    }

    pub fn try_handle(&self, pattern: &str, options: Options) -> Result<Registrar, RegisterError> {
        let config = &self.inner.config;
        let handler = self
            .inner
            .routes
            .get_or_insert_with(pattern, |parsed| {
                tracing::debug!(pattern = %parsed, "Pattern registered");
                Arc::new(PatternHandler::new(parsed.to_string(), options.resolve(config)))
            })
            .map_err(|_| RegisterError::InvalidPattern(pattern.to_string()))?;
        Ok(Registrar::new(handler))
    }

    /// Dispatch one request.
    pub async fn serve(&self, req: axum::http::Request<Body>) -> Response {
        let config = &self.inner.config;
        let method = req.method().clone();

        if !is_known_method(&method) {
            let (parts, _) = req.into_parts();
            let err = Error::MethodNotAllowed(method);
            config.report(&err, &RequestHead::from(&parts));
            return plain_text(StatusCode::METHOD_NOT_ALLOWED, err.reply_message());
        }

        if method == Method::OPTIONS {
            if let Some(options_handler) = &config.options_handler {
                return options_handler(req).await;
            }
            let (parts, _) = req.into_parts();
            let err = Error::OptionsNotDefined(method);
            config.report(&err, &RequestHead::from(&parts));
            return plain_text(StatusCode::METHOD_NOT_ALLOWED, err.reply_message());
        }

        // asterisk-form only makes sense for OPTIONS
        if req.uri().path() == "*" {
            tracing::debug!(method = %method, "Rejecting asterisk request target");
            let mut response = Response::new(Body::empty());
            *response.status_mut() = StatusCode::BAD_REQUEST;
            response
                .headers_mut()
                .insert(header::CONNECTION, HeaderValue::from_static("close"));
            return response;
        }

        let host = req
            .headers()
            .get(header::HOST)
            .and_then(|v| v.to_str().ok())
            .or_else(|| req.uri().host())
            .map(str::to_owned);
        match self.inner.routes.lookup(host.as_deref(), req.uri().path()) {
            Some(pattern) => {
                tracing::debug!(method = %method, path = %req.uri().path(), "Dispatching");
                pattern.serve(req).await
            }
            None => match &config.not_found {
                Some(not_found) => not_found(req).await,
                None => plain_text(StatusCode::NOT_FOUND, "404 page not found"),
            },
        }
    }
}

impl std::fmt::Debug for Handler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handler")
            .field("config", &self.inner.config)
            .field("patterns", &self.inner.routes.len())
            .finish()
    }
}

impl Service<axum::http::Request<Body>> for Handler {
    type Response = Response;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<Response, Infallible>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: axum::http::Request<Body>) -> Self::Future {
        let handler = self.clone();
        Box::pin(async move { Ok(handler.serve(req).await) })
    }
}
