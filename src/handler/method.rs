//! Per (pattern, method) request processing.
//!
//! # Data Flow
//! ```text
//! axum Request
//!     → spawn process():
//!         validate Content-Type
//!         → bind input (query, or JSON body under size cap + read deadline)
//!         → Next::run (middleware → handler)
//!         → NotSent check
//!     → await response head from the Sender
//! ```

use std::sync::Arc;

use axum::body::Body;
use axum::http::request::Parts;
use axum::http::{header, StatusCode};
use axum::response::Response;
use bytes::{Bytes, BytesMut};
use http_body_util::BodyExt;
use tracing::Instrument;

use super::error::Error;
use super::options::Config;
use super::prototype::Prototype;
use crate::binding::{binds_query, QueryParams};
use crate::http::content_type::{validate_content_type, APPLICATION_JSON};
use crate::http::middleware::{DoFunc, Middleware, Next};
use crate::http::request::{Input, Request, RequestHead};
use crate::http::response::plain_text;
use crate::http::sender::Sender;

pub(crate) struct MethodHandler {
    config: Arc<Config>,
    chain: Arc<[Middleware]>,
    prototype: Prototype,
    terminal: DoFunc,
}

impl MethodHandler {
    pub(crate) fn new(config: Config, prototype: Prototype, terminal: DoFunc) -> Self {
        let chain: Arc<[Middleware]> = config.middleware.clone().into();
        Self {
            config: Arc::new(config),
            chain,
            prototype,
            terminal,
        }
    }

    pub(crate) fn prototype(&self) -> &Prototype {
        &self.prototype
    }

    pub(crate) async fn serve(self: Arc<Self>, req: axum::http::Request<Body>) -> Response {
        let (parts, body) = req.into_parts();
        let (sender, head_rx) = Sender::new(self.config.clone(), RequestHead::from(&parts));
        let task = tokio::spawn(
            self.process(parts, body, sender)
                .instrument(tracing::Span::current()),
        );

        match head_rx.await {
            Ok(response) => response,
            // every Sender is gone without answering: the task died
            Err(_) => {
                if let Err(join) = task.await {
                    tracing::error!(error = %join, "Request task failed");
                }
                plain_text(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
            }
        }
    }

    async fn process(self: Arc<Self>, parts: Parts, body: Body, sender: Sender) {
        let (body, input) = match self.bind(&parts, body).await {
            Ok(bound) => bound,
            Err(err) => {
                sender.report(&err);
                sender.send_error(StatusCode::BAD_REQUEST, err.reply_message());
                return;
            }
        };

        let request = Request::new(sender.head().clone(), parts.extensions, body, input);
        Next::new(self.chain.clone(), self.terminal.clone())
            .run(request, sender.clone())
            .await;

        if !sender.is_sent() {
            let err = Error::NotSent;
            sender.report(&err);
            sender.send_error(StatusCode::INTERNAL_SERVER_ERROR, err.reply_message());
        }
    }

    async fn bind(&self, parts: &Parts, body: Body) -> Result<(Bytes, Input), Error> {
        let content_type = parts.headers.get(header::CONTENT_TYPE);
        if let Some(value) = content_type {
            let value = String::from_utf8_lossy(value.as_bytes());
            validate_content_type(&value, &[APPLICATION_JSON]).map_err(|source| {
                Error::InvalidContentType {
                    content_type: value.to_string(),
                    source,
                }
            })?;
        }

        if self.prototype.is_none() {
            return Ok((Bytes::new(), Box::new(())));
        }

        if content_type.is_none() && binds_query(&parts.method) {
            let params = QueryParams::parse(parts.uri.query().unwrap_or_default());
            let input = self.prototype.from_query(&params)?;
            return Ok((Bytes::new(), input));
        }

        let limit = self.config.max_request_body_size;
        let declared = parts
            .headers
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<usize>().ok());
        if limit > 0 && declared.is_some_and(|len| len > limit) {
            return Err(Error::BodyTooLarge { limit });
        }

        let read = read_limited(body, limit);
        let bytes = match self.config.read_timeout {
            Some(deadline) => tokio::time::timeout(deadline, read)
                .await
                .map_err(|_| Error::ReadTimeout(deadline))??,
            None => read.await?,
        };

        let input = self.prototype.from_json(&bytes).map_err(Error::DecodeBody)?;
        Ok((bytes, input))
    }
}

/// Collect the body, failing as soon as it grows past `limit` (zero: no cap).
async fn read_limited(mut body: Body, limit: usize) -> Result<Bytes, Error> {
    let mut buf = BytesMut::new();
    while let Some(frame) = body.frame().await {
        let frame = frame.map_err(Error::ReadBody)?;
        if let Ok(data) = frame.into_data() {
            if limit > 0 && buf.len() + data.len() > limit {
                return Err(Error::BodyTooLarge { limit });
            }
            buf.extend_from_slice(&data);
        }
    }
    Ok(buf.freeze())
}
