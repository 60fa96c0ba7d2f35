//! Per-pattern method table.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock};

use axum::body::Body;
use axum::http::header::{self, HeaderValue};
use axum::http::StatusCode;
use axum::response::Response;

use super::error::{Error, RegisterError};
use super::method::MethodHandler;
use super::options::{Config, Options};
use super::prototype::Prototype;
use crate::binding::{binds_query, Shape};
use crate::http::middleware::{handler_fn, DoFunc};
use crate::http::request::{Request, RequestHead};
use crate::http::response::plain_text;
use crate::http::sender::Sender;

/// Verbs a handler can be registered for. The empty string matches any
/// method not registered explicitly; HEAD follows GET.
const REGISTRABLE: [&str; 6] = ["", "GET", "POST", "PUT", "PATCH", "DELETE"];

pub(crate) struct PatternHandler {
    pattern: String,
    config: Arc<Config>,
    methods: RwLock<HashMap<String, Arc<MethodHandler>>>,
}

impl PatternHandler {
    pub(crate) fn new(pattern: String, config: Config) -> Self {
        Self {
            pattern,
            config: Arc::new(config),
            methods: RwLock::new(HashMap::new()),
        }
    }

    fn try_register(
        &self,
        method: &str,
        prototype: Prototype,
        terminal: DoFunc,
        options: &Options,
    ) -> Result<(), RegisterError> {
        let method = method.to_ascii_uppercase();
        if !REGISTRABLE.contains(&method.as_str()) {
            return Err(RegisterError::MethodNotAllowed(method));
        }

        let query_bound = method.is_empty()
            || method
                .parse()
                .map(|m| binds_query(&m))
                .unwrap_or(false);
        if query_bound {
            match prototype.shape() {
                None => return Err(RegisterError::InputRequired(method)),
                Some(Shape::Struct) => {}
                Some(Shape::Other(shape)) => {
                    return Err(RegisterError::InputNotStruct {
                        type_name: prototype.type_name(),
                        shape,
                    })
                }
            }
        }

        let mut methods = self.methods.write().unwrap_or_else(PoisonError::into_inner);
        if methods.contains_key(&method) {
            return Err(RegisterError::AlreadyRegistered(method));
        }

        let config = options.resolve(&self.config);
        let method_handler = Arc::new(MethodHandler::new(config, prototype, terminal));
        if method == "GET" {
            methods.insert("HEAD".to_string(), method_handler.clone());
        }
        tracing::debug!(
            pattern = %self.pattern,
            method = if method.is_empty() { "*" } else { method.as_str() },
            input = method_handler.prototype().type_name(),
            "Method registered"
        );
        methods.insert(method, method_handler);
        Ok(())
    }

    fn allowed(&self) -> String {
        let methods = self.methods.read().unwrap_or_else(PoisonError::into_inner);
        let mut allowed: Vec<&str> = methods
            .keys()
            .map(String::as_str)
            .filter(|m| !m.is_empty())
            .collect();
        allowed.sort_unstable();
        allowed.join(", ")
    }

    pub(crate) async fn serve(&self, req: axum::http::Request<Body>) -> Response {
        let handler = {
            let methods = self.methods.read().unwrap_or_else(PoisonError::into_inner);
            methods
                .get(req.method().as_str())
                .or_else(|| methods.get(""))
                .cloned()
        };
        if let Some(handler) = handler {
            return handler.serve(req).await;
        }

        let (parts, _) = req.into_parts();
        let err = Error::MethodNotRegistered(parts.method.clone());
        self.config.report(&err, &RequestHead::from(&parts));
        let mut response = plain_text(StatusCode::METHOD_NOT_ALLOWED, err.reply_message());
        if let Ok(allow) = HeaderValue::from_str(&self.allowed()) {
            response.headers_mut().insert(header::ALLOW, allow);
        }
        response
    }
}

/// Registers method handlers under one pattern. Returned by
/// [`Handler::handle`](super::Handler::handle); calls chain.
#[derive(Clone)]
pub struct Registrar {
    pattern: Arc<PatternHandler>,
}

impl Registrar {
    pub(crate) fn new(pattern: Arc<PatternHandler>) -> Self {
        Self { pattern }
    }

    /// Register `handler` for `method`.
    ///
    /// # Panics
    /// On a duplicate method, a method outside GET/POST/PUT/PATCH/DELETE
    /// (or `""` for any), or a query-bound method without a struct input.
    pub fn register<F, Fut>(
        &self,
        method: &str,
        prototype: Prototype,
        handler: F,
        options: Options,
    ) -> &Self
    where
        F: Fn(Request, Sender) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        if let Err(err) = self.try_register(method, prototype, handler, options) {
            panic!("rapi: register {}: {err}", self.pattern.pattern);
        }
        self
    }

    /// Fallible form of [`Registrar::register`].
    pub fn try_register<F, Fut>(
        &self,
        method: &str,
        prototype: Prototype,
        handler: F,
        options: Options,
    ) -> Result<&Self, RegisterError>
    where
        F: Fn(Request, Sender) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.pattern
            .try_register(method, prototype, handler_fn(handler), &options)?;
        Ok(self)
    }

    pub fn pattern(&self) -> &str {
        &self.pattern.pattern
    }
}

impl std::fmt::Debug for Registrar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registrar")
            .field("pattern", &self.pattern.pattern)
            .field("allowed", &self.pattern.allowed())
            .finish()
    }
}
