//! Onion-shaped middleware chain.
//!
//! # Data Flow
//! ```text
//! Next { index: 0 }.run(req, send)
//!     → middleware[0](req, send, Next { index: 1 })
//!         → middleware[1](req, send, Next { index: 2 })
//!             → terminal handler(req, send)
//! ```
//!
//! # Design Decisions
//! - The chain is an immutable slice shared by every request of a route
//! - `Next` is an index into it, so no per-request closure nesting
//! - `Next::run` does nothing once the response is sent; a middleware
//!   that answers directly short-circuits everything after it

pub mod request_id;

use std::future::Future;
use std::sync::Arc;

use futures_util::future::BoxFuture;

use crate::http::request::Request;
use crate::http::sender::Sender;

pub use request_id::{request_id, RequestId, X_REQUEST_ID};

/// Interceptor: may act before/after calling `next`, or answer through the
/// sender and return without calling it.
pub type Middleware = Arc<dyn Fn(Request, Sender, Next) -> BoxFuture<'static, ()> + Send + Sync>;

/// Terminal handler registered for a route.
pub type DoFunc = Arc<dyn Fn(Request, Sender) -> BoxFuture<'static, ()> + Send + Sync>;

/// Box an async closure into a [`Middleware`].
pub fn middleware_fn<F, Fut>(f: F) -> Middleware
where
    F: Fn(Request, Sender, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Arc::new(move |req, send, next| -> BoxFuture<'static, ()> { Box::pin(f(req, send, next)) })
}

/// Box an async closure into a [`DoFunc`].
pub fn handler_fn<F, Fut>(f: F) -> DoFunc
where
    F: Fn(Request, Sender) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Arc::new(move |req, send| -> BoxFuture<'static, ()> { Box::pin(f(req, send)) })
}

/// The rest of the chain after the current middleware.
#[derive(Clone)]
pub struct Next {
    chain: Arc<[Middleware]>,
    index: usize,
    terminal: DoFunc,
}

impl Next {
    pub(crate) fn new(chain: Arc<[Middleware]>, terminal: DoFunc) -> Self {
        Self {
            chain,
            index: 0,
            terminal,
        }
    }

    /// Continue with the next middleware, or the terminal handler.
    pub async fn run(self, req: Request, sender: Sender) {
        if sender.is_sent() {
            return;
        }
        match self.chain.get(self.index).cloned() {
            Some(middleware) => {
                let next = Next {
                    chain: self.chain,
                    index: self.index + 1,
                    terminal: self.terminal,
                };
                middleware(req, sender, next).await;
            }
            None => (self.terminal)(req, sender).await,
        }
    }
}

impl std::fmt::Debug for Next {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Next")
            .field("index", &self.index)
            .field("len", &self.chain.len())
            .finish()
    }
}
