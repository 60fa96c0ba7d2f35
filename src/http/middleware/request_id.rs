//! Request correlation middleware.
//! Tags every call with an id and a tracing span.

use std::time::Instant;

use tracing::Instrument;
use uuid::Uuid;

use super::{middleware_fn, Middleware, Next};
use crate::http::request::Request;
use crate::http::sender::Sender;

pub const X_REQUEST_ID: &str = "x-request-id";

/// Correlation id attached to the request extensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestId(pub Uuid);

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Reuse the caller's `x-request-id` when it is a UUID, otherwise mint one.
pub fn request_id() -> Middleware {
    middleware_fn(|mut req: Request, send: Sender, next: Next| async move {
        let id = req
            .headers()
            .get(X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| Uuid::parse_str(v).ok())
            .map(RequestId)
            .unwrap_or_else(|| RequestId(Uuid::new_v4()));
        req.extensions_mut().insert(id);

        let span = tracing::info_span!(
            "rpc",
            request_id = %id,
            method = %req.method(),
            path = %req.uri().path(),
        );
        let start = Instant::now();
        next.run(req, send).instrument(span.clone()).await;
        span.in_scope(|| tracing::debug!(elapsed = ?start.elapsed(), "Call finished"));
    })
}
