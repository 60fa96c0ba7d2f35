//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → tracing events (dispatch, rejections, failures)
//!     → spans (TraceLayer per connection request, request_id per call)
//!
//! logging.rs:
//!     → EnvFilter → fmt layer (pretty or JSON) → stdout
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Request ID flows through the middleware span

pub mod logging;

pub use logging::init_logging;
