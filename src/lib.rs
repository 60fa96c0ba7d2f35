//! JSON RPC dispatch and middleware pipeline.
//!
//! Typed handlers registered per (pattern, method), inputs bound from the
//! query string or a JSON body, onion middleware, a one-shot response
//! sender with content negotiation, and a client mirroring the same wire
//! rules.

// Core subsystems
pub mod binding;
pub mod handler;
pub mod http;
pub mod routing;

// Outbound
pub mod client;

// Cross-cutting concerns
pub mod config;
pub mod lifecycle;
pub mod observability;

pub mod demo;

pub use client::{CallError, CallOptions, Caller, Factory};
pub use config::ServerConfig;
pub use handler::{Error, Handler, Options, Prototype, Registrar};
pub use http::{HttpServer, Next, Request, Sender};
pub use lifecycle::Shutdown;
