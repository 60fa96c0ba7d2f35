//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Registration:
//!     Handler::handle("/ping") → matcher.rs (parse) → router.rs (insert once)
//!
//! Incoming Request (host, path)
//!     → router.rs (scan)
//!     → matcher.rs (evaluate pattern)
//!     → most specific PatternHandler, or no match
//! ```
//!
//! # Design Decisions
//! - Patterns follow the familiar mux rules: exact paths, '/'-terminated
//!   subtrees, optional leading host
//! - Deterministic: same input always matches same pattern

pub mod matcher;
pub mod router;

pub use matcher::{Pattern, PatternError};
pub use router::RouteTable;
