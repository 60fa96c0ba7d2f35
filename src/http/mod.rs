//! HTTP protocol plumbing shared by the dispatcher and the client.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (axum, tracing layer)
//!     → handler::Handler (routing, binding)
//!     → request.rs (Request Context) + middleware/ (chain)
//!     → sender.rs (negotiate.rs → encoding.rs → body stream)
//!     → response bytes
//!
//! client::Caller
//!     → content_type.rs (validate response media type)
//! ```

pub mod content_type;
pub mod encoding;
pub mod middleware;
pub mod negotiate;
pub mod request;
pub mod response;
pub mod sender;
pub mod server;

pub use encoding::Encoding;
pub use middleware::{handler_fn, middleware_fn, DoFunc, Middleware, Next, RequestId};
pub use negotiate::{parse_header_options, HeaderOption};
pub use request::{Request, RequestHead};
pub use sender::Sender;
pub use server::HttpServer;
