//! Field binding between typed values and the wire.
//!
//! # Data Flow
//! ```text
//! Server side:
//!     URL query string
//!     → QueryParams::parse (percent-decoding, first value wins)
//!     → from_query::<T> (serde-derived, per-field coercion)
//!     → typed input
//!
//! Client side:
//!     typed input
//!     → to_query (serde-derived, None fields omitted)
//!     → QueryParams::encode
//!     → URL query string
//! ```
//!
//! # Design Decisions
//! - Field names resolve through serde, so `#[serde(rename = "..")]` is the wire name
//! - Query-bound inputs use `#[serde(default)]`; missing keys keep the default value
//! - Scalar text follows the JSON form of the type (base64 bytes, RFC 3339 timestamps)
//! - Nested structs, sequences and maps are rejected and the error names the field

mod de;
mod probe;
mod ser;
mod types;

pub use de::from_query;
pub use ser::to_query;
pub use types::{Base64, Empty};

pub(crate) use probe::{shape_of, Shape};

use std::fmt;

use axum::http::Method;
use thiserror::Error;

/// Methods whose input travels in the query string unless a body is forced
/// (client) or a content type is given (server).
pub fn binds_query(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::DELETE)
}

/// Errors produced while binding query parameters.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BindError {
    /// A value could not be coerced into the field's type.
    #[error("field {field:?}: invalid value {value:?}: {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    /// The field's type has no query-string form.
    #[error("field {field:?}: unsupported field type {kind}")]
    Unsupported { field: String, kind: &'static str },

    /// The bound value is not a struct.
    #[error("input must be struct, got {0}")]
    NotStruct(&'static str),

    /// Error raised by a serde implementation.
    #[error("{0}")]
    Custom(String),
}

impl BindError {
    /// Attach field context to errors raised by a field's own serde impl.
    fn in_field(self, field: &str, value: &str) -> Self {
        match self {
            BindError::Custom(reason) => BindError::InvalidValue {
                field: field.to_string(),
                value: value.to_string(),
                reason,
            },
            other => other,
        }
    }
}

impl serde::de::Error for BindError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        BindError::Custom(msg.to_string())
    }
}

impl serde::ser::Error for BindError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        BindError::Custom(msg.to_string())
    }
}

/// Ordered multi-map of query parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a raw (percent-encoded) query string.
    pub fn parse(query: &str) -> Self {
        let pairs = url::form_urlencoded::parse(query.as_bytes())
            .into_owned()
            .collect();
        Self { pairs }
    }

    /// First value recorded for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn append(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.pairs.push((key.into(), value.into()));
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Encode as `application/x-www-form-urlencoded`, sorted by key.
    pub fn encode(&self) -> String {
        let mut sorted: Vec<&(String, String)> = self.pairs.iter().collect();
        sorted.sort_by(|a, b| a.0.cmp(&b.0));
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        for (k, v) in sorted {
            serializer.append_pair(k, v);
        }
        serializer.finish()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for QueryParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            pairs: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}
