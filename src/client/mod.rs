//! Typed JSON client mirroring the dispatcher's wire rules.
//!
//! # Data Flow
//! ```text
//! Factory (client, base URL, options)
//!     → Caller<O> (endpoint, method, options)
//!     → call_with(input, options):
//!         GET/HEAD/DELETE → to_query → URL query
//!         otherwise       → JSON body + "\n"
//!     → reqwest send
//!     → validate Content-Type (text/plain only on non-200)
//!     → Response<O> | CallError::{PlainText, Structured, Decode, ..}
//! ```
//!
//! # Design Decisions
//! - Options layer factory → caller → call, like the server's scopes
//! - Without an error output type, non-200 bodies still decode into `O`

mod caller;
mod error;
mod factory;
mod options;

pub use caller::{Caller, Response};
pub use error::{BoxError, CallError};
pub use factory::Factory;
pub use options::CallOptions;
