//! Per-call options, layered factory → caller → call.

use std::fmt;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::de::DeserializeOwned;

use super::error::BoxError;

/// Error payload a caller decodes non-200 responses into.
#[derive(Clone, Copy)]
pub(crate) struct ErrorOutput {
    pub(crate) type_name: &'static str,
    pub(crate) decode: fn(&[u8]) -> Result<BoxError, serde_json::Error>,
}

fn decode_error<E>(body: &[u8]) -> Result<BoxError, serde_json::Error>
where
    E: std::error::Error + DeserializeOwned + Send + Sync + 'static,
{
    serde_json::from_slice::<E>(body).map(|err| Box::new(err) as BoxError)
}

#[derive(Debug, Clone)]
enum HeaderOp {
    Set(HeaderName, HeaderValue),
    Add(HeaderName, HeaderValue),
}

/// Overlay of call settings. Later layers override scalars and apply their
/// header operations after the earlier ones.
#[derive(Clone, Default)]
pub struct CallOptions {
    headers: Vec<HeaderOp>,
    max_response_body_size: Option<usize>,
    force_body: Option<bool>,
    timeout: Option<Duration>,
    error_output: Option<ErrorOutput>,
}

impl CallOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace any values of `name` with `value`.
    pub fn request_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.push(HeaderOp::Set(name, value));
        self
    }

    /// Add `value` to `name`, keeping earlier values.
    pub fn additional_request_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.push(HeaderOp::Add(name, value));
        self
    }

    /// Read at most `limit` response bytes. Zero reads everything.
    pub fn max_response_body_size(mut self, limit: usize) -> Self {
        self.max_response_body_size = Some(limit);
        self
    }

    /// Send the input as a JSON body even for GET, HEAD and DELETE.
    pub fn force_body(mut self, force: bool) -> Self {
        self.force_body = Some(force);
        self
    }

    /// Deadline for the whole call.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Decode non-200 responses into `E` and return them as
    /// [`CallError::Structured`](super::CallError::Structured).
    pub fn error_output<E>(mut self) -> Self
    where
        E: std::error::Error + DeserializeOwned + Send + Sync + 'static,
    {
        self.error_output = Some(ErrorOutput {
            type_name: std::any::type_name::<E>(),
            decode: decode_error::<E>,
        });
        self
    }

    /// Layer `other` on top of `self`.
    pub fn merge(mut self, other: CallOptions) -> Self {
        self.headers.extend(other.headers);
        Self {
            headers: self.headers,
            max_response_body_size: other.max_response_body_size.or(self.max_response_body_size),
            force_body: other.force_body.or(self.force_body),
            timeout: other.timeout.or(self.timeout),
            error_output: other.error_output.or(self.error_output),
        }
    }

    pub(crate) fn header_map(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for op in &self.headers {
            match op {
                HeaderOp::Set(name, value) => {
                    headers.insert(name.clone(), value.clone());
                }
                HeaderOp::Add(name, value) => {
                    headers.append(name.clone(), value.clone());
                }
            }
        }
        headers
    }

    pub(crate) fn max_body(&self) -> usize {
        self.max_response_body_size.unwrap_or(0)
    }

    pub(crate) fn is_force_body(&self) -> bool {
        self.force_body.unwrap_or(false)
    }

    pub(crate) fn call_timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub(crate) fn error_decoder(&self) -> Option<ErrorOutput> {
        self.error_output
    }
}

impl fmt::Debug for CallOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallOptions")
            .field("headers", &self.headers)
            .field("max_response_body_size", &self.max_response_body_size)
            .field("force_body", &self.force_body)
            .field("timeout", &self.timeout)
            .field("error_output", &self.error_output.map(|e| e.type_name))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::ACCEPT_LANGUAGE;

    #[test]
    fn test_header_ops_apply_in_order() {
        let base = CallOptions::new()
            .request_header(ACCEPT_LANGUAGE, HeaderValue::from_static("en"))
            .additional_request_header(ACCEPT_LANGUAGE, HeaderValue::from_static("de"));
        let headers = base.clone().header_map();
        assert_eq!(headers.get_all(ACCEPT_LANGUAGE).iter().count(), 2);

        let layered = base.merge(
            CallOptions::new().request_header(ACCEPT_LANGUAGE, HeaderValue::from_static("fr")),
        );
        let values: Vec<_> = layered.header_map().get_all(ACCEPT_LANGUAGE).iter().cloned().collect();
        assert_eq!(values, [HeaderValue::from_static("fr")]);
    }

    #[test]
    fn test_merge_overrides_scalars() {
        let merged = CallOptions::new()
            .max_response_body_size(10)
            .force_body(true)
            .merge(CallOptions::new().max_response_body_size(20));
        assert_eq!(merged.max_body(), 20);
        assert!(merged.is_force_body());
        assert_eq!(merged.call_timeout(), None);
    }
}
