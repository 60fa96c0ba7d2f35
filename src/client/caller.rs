//! One endpoint + method, called repeatedly.

use std::fmt;
use std::marker::PhantomData;

use bytes::{Bytes, BytesMut};
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use super::error::CallError;
use super::options::CallOptions;
use crate::binding::{binds_query, to_query};
use crate::http::content_type::{
    validate_content_type, APPLICATION_JSON, JSON_CONTENT_TYPE, TEXT_PLAIN,
};

/// Plain-text error bodies are read up to this many bytes.
const PLAIN_TEXT_LIMIT: usize = 1024;

/// A completed call.
#[derive(Debug)]
pub struct Response<O> {
    pub status: StatusCode,
    pub headers: HeaderMap,
    /// Decoded body. `None` for HEAD calls.
    pub out: Option<O>,
}

impl<O> Response<O> {
    pub fn into_out(self) -> Option<O> {
        self.out
    }
}

/// Typed requester for one endpoint. Built by [`Factory`](super::Factory).
pub struct Caller<O> {
    client: reqwest::Client,
    url: Url,
    method: Method,
    options: CallOptions,
    _out: PhantomData<fn() -> O>,
}

impl<O> Clone for Caller<O> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            url: self.url.clone(),
            method: self.method.clone(),
            options: self.options.clone(),
            _out: PhantomData,
        }
    }
}

impl<O> fmt::Debug for Caller<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Caller")
            .field("method", &self.method)
            .field("url", &self.url.as_str())
            .field("out", &std::any::type_name::<O>())
            .finish()
    }
}

impl<O: DeserializeOwned> Caller<O> {
    pub(crate) fn new(client: reqwest::Client, url: Url, method: Method, options: CallOptions) -> Self {
        Self {
            client,
            url,
            method,
            options,
            _out: PhantomData,
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub async fn call<I>(&self, input: &I) -> Result<Response<O>, CallError>
    where
        I: Serialize + ?Sized,
    {
        self.call_with(input, CallOptions::new()).await
    }

    /// Call with `options` layered over the caller's own. Dropping the
    /// returned future cancels the request.
    pub async fn call_with<I>(&self, input: &I, options: CallOptions) -> Result<Response<O>, CallError>
    where
        I: Serialize + ?Sized,
    {
        let options = self.options.clone().merge(options);
        let mut url = self.url.clone();

        let builder = if !options.is_force_body() && binds_query(&self.method) {
            let params = to_query(input)?;
            if !params.is_empty() {
                url.set_query(Some(&params.encode()));
            }
            self.client
                .request(self.method.clone(), url)
                .headers(options.header_map())
        } else {
            let mut body = serde_json::to_vec(input).map_err(CallError::Encode)?;
            body.push(b'\n');
            self.client
                .request(self.method.clone(), url)
                .headers(options.header_map())
                .header(header::CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE))
                .body(body)
        };
        let builder = match options.call_timeout() {
            Some(timeout) => builder.timeout(timeout),
            None => builder,
        };

        tracing::debug!(method = %self.method, url = %self.url, "Calling");
        let mut response = builder.send().await.map_err(CallError::Request)?;
        let status = response.status();
        let headers = response.headers().clone();

        if let Some(value) = headers.get(header::CONTENT_TYPE) {
            let content_type = String::from_utf8_lossy(value.as_bytes()).into_owned();
            let allowed: &[&str] = if status == StatusCode::OK {
                &[APPLICATION_JSON]
            } else {
                &[APPLICATION_JSON, TEXT_PLAIN]
            };
            let media = validate_content_type(&content_type, allowed).map_err(|source| {
                CallError::InvalidContentType {
                    status,
                    content_type: content_type.clone(),
                    source,
                }
            })?;
            if media.essence == TEXT_PLAIN {
                let body = read_limited(&mut response, PLAIN_TEXT_LIMIT).await?;
                let message = String::from_utf8_lossy(&body);
                return Err(CallError::PlainText {
                    status,
                    message: message.trim_end_matches('\n').to_string(),
                });
            }
        }

        if self.method == Method::HEAD {
            if status != StatusCode::OK && options.error_decoder().is_some() {
                return Err(CallError::Status { status, headers });
            }
            return Ok(Response {
                status,
                headers,
                out: None,
            });
        }

        let body = read_limited(&mut response, options.max_body()).await?;
        let decode_error = |source| CallError::Decode { status, source };

        if status != StatusCode::OK {
            if let Some(error_output) = options.error_decoder() {
                let error = (error_output.decode)(&body).map_err(decode_error)?;
                return Err(CallError::Structured {
                    status,
                    headers,
                    error,
                });
            }
        }

        let out = serde_json::from_slice::<O>(&body).map_err(decode_error)?;
        Ok(Response {
            status,
            headers,
            out: Some(out),
        })
    }
}

/// Read the body, keeping at most `limit` bytes (zero: everything).
async fn read_limited(response: &mut reqwest::Response, limit: usize) -> Result<Bytes, CallError> {
    let mut buf = BytesMut::new();
    while let Some(chunk) = response.chunk().await.map_err(CallError::ReadBody)? {
        buf.extend_from_slice(&chunk);
        if limit > 0 && buf.len() >= limit {
            buf.truncate(limit);
            break;
        }
    }
    Ok(buf.freeze())
}
