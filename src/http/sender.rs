//! One-shot response sender.
//!
//! # Data Flow
//! ```text
//! send(output, status)
//!     → claim Sent Flag (CAS)        second call → Err(AlreadySent)
//!     → negotiate Accept-Encoding
//!     → serde_json + "\n"
//!     → headers (Content-Type, Content-Length | Content-Encoding)
//!     → head delivered to the transport
//!     → HEAD: stop
//!     → body chunks → encoder → channel → transport, under write deadline
//! ```
//!
//! # Design Decisions
//! - The transport waits on a oneshot for the response head; the body follows
//!   through a bounded channel so the write deadline covers real backpressure
//! - On deadline or write failure the body stream yields an error, which makes
//!   the transport drop the connection instead of ending the body cleanly

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::header::{self, HeaderMap, HeaderValue};
use axum::http::{Method, StatusCode};
use axum::response::Response;
use bytes::Bytes;
use futures_util::Stream;
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};

use crate::handler::{Config, Error};
use crate::http::content_type::JSON_CONTENT_TYPE;
use crate::http::encoding::{ContentEncoder, Encoding};
use crate::http::negotiate::{select_encoding, NegotiationError};
use crate::http::request::RequestHead;
use crate::http::response::plain_text;

/// Size of the slices fed to the encoder.
const WRITE_CHUNK: usize = 16 * 1024;

/// Answers one request. Cheap to clone; all clones share the Sent Flag.
#[derive(Clone)]
pub struct Sender {
    inner: Arc<Inner>,
}

struct Inner {
    sent: AtomicBool,
    head_tx: Mutex<Option<oneshot::Sender<Response>>>,
    config: Arc<Config>,
    head: RequestHead,
}

impl Sender {
    pub(crate) fn new(config: Arc<Config>, head: RequestHead) -> (Self, oneshot::Receiver<Response>) {
        let (head_tx, head_rx) = oneshot::channel();
        let sender = Self {
            inner: Arc::new(Inner {
                sent: AtomicBool::new(false),
                head_tx: Mutex::new(Some(head_tx)),
                config,
                head,
            }),
        };
        (sender, head_rx)
    }

    /// Whether a response has already been claimed by any clone.
    pub fn is_sent(&self) -> bool {
        self.inner.sent.load(Ordering::Acquire)
    }

    pub fn head(&self) -> &RequestHead {
        &self.inner.head
    }

    /// Serialize `output` as JSON and write it with `status`.
    pub async fn send<O>(&self, output: &O, status: StatusCode) -> Result<(), Error>
    where
        O: Serialize + ?Sized,
    {
        self.send_with_headers(output, status, HeaderMap::new()).await
    }

    /// Like [`Sender::send`], with extra response headers. `Content-Type`,
    /// `Content-Length` and `Content-Encoding` are always set by the sender.
    pub async fn send_with_headers<O>(
        &self,
        output: &O,
        status: StatusCode,
        extra: HeaderMap,
    ) -> Result<(), Error>
    where
        O: Serialize + ?Sized,
    {
        if !self.claim() {
            tracing::warn!(
                method = %self.inner.head.method,
                uri = %self.inner.head.uri,
                status = %status,
                "Response already sent, ignoring second send"
            );
            return Err(Error::AlreadySent);
        }

        let encoding = match self.negotiate() {
            Ok(encoding) => encoding,
            Err(err) => {
                return Err(self.fail(err.into(), StatusCode::BAD_REQUEST));
            }
        };

        let mut body = match serde_json::to_vec(output) {
            Ok(body) => body,
            Err(source) => {
                return Err(self.fail(Error::EncodeOutput(source), StatusCode::INTERNAL_SERVER_ERROR));
            }
        };
        body.push(b'\n');

        let mut headers = extra;
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
        if encoding.is_identity() {
            headers.remove(header::CONTENT_ENCODING);
            headers.insert(header::CONTENT_LENGTH, HeaderValue::from(body.len()));
        } else {
            headers.remove(header::CONTENT_LENGTH);
            headers.insert(header::CONTENT_ENCODING, HeaderValue::from_static(encoding.as_str()));
        }
        if self.inner.config.allow_encoding {
            headers.append(header::VARY, HeaderValue::from_static("accept-encoding"));
        }

        if self.inner.head.method == Method::HEAD {
            return self.deliver(response(status, headers, Body::empty()));
        }

        let (chunks_tx, chunks_rx) = mpsc::channel(1);
        let (abort_tx, abort_rx) = oneshot::channel();
        let stream = BodyStream {
            chunks: chunks_rx,
            abort: Some(abort_rx),
        };
        self.deliver(response(status, headers, Body::from_stream(stream)))?;

        let encoder = ContentEncoder::new(encoding, self.inner.config.compression_level);
        let write = write_body(chunks_tx, encoder, body);
        let result = match self.inner.config.write_timeout {
            Some(limit) => tokio::select! {
                written = write => written.map_err(Error::WriteBody),
                _ = tokio::time::sleep(limit) => Err(Error::WriteTimeout(limit)),
            },
            None => write.await.map_err(Error::WriteBody),
        };

        if let Err(err) = result {
            let _ = abort_tx.send(io::Error::other(err.to_string()));
            self.report(&err);
            return Err(err);
        }
        Ok(())
    }

    /// Answer with a plain-text error. Returns false when a response was
    /// already claimed.
    pub(crate) fn send_error(&self, status: StatusCode, message: &str) -> bool {
        self.claim() && self.deliver(plain_text(status, message)).is_ok()
    }

    pub(crate) fn report(&self, err: &Error) {
        self.inner.config.report(err, &self.inner.head);
    }

    fn claim(&self) -> bool {
        self.inner
            .sent
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    fn negotiate(&self) -> Result<Encoding, NegotiationError> {
        if !self.inner.config.allow_encoding {
            return Ok(Encoding::Identity);
        }
        match self
            .inner
            .head
            .headers
            .get(header::ACCEPT_ENCODING)
            .and_then(|v| v.to_str().ok())
        {
            Some(offers) => select_encoding(offers),
            None => Ok(Encoding::Identity),
        }
    }

    /// Report `err`, answer with a plain-text `status` and hand the error back.
    fn fail(&self, err: Error, status: StatusCode) -> Error {
        self.report(&err);
        let _ = self.deliver(plain_text(status, err.reply_message()));
        err
    }

    fn deliver(&self, response: Response) -> Result<(), Error> {
        let head_tx = self
            .inner
            .head_tx
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        match head_tx.map(|tx| tx.send(response)) {
            Some(Ok(())) => Ok(()),
            _ => {
                let err = Error::ResponseDropped;
                self.report(&err);
                Err(err)
            }
        }
    }
}

impl std::fmt::Debug for Sender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sender")
            .field("method", &self.inner.head.method)
            .field("uri", &self.inner.head.uri)
            .field("sent", &self.is_sent())
            .finish()
    }
}

fn response(status: StatusCode, headers: HeaderMap, body: Body) -> Response {
    let mut response = Response::new(body);
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}

async fn write_body(
    chunks: mpsc::Sender<Bytes>,
    mut encoder: ContentEncoder,
    body: Vec<u8>,
) -> io::Result<()> {
    for chunk in body.chunks(WRITE_CHUNK) {
        push(&chunks, encoder.encode(chunk)?).await?;
    }
    push(&chunks, encoder.finish()?).await
}

async fn push(chunks: &mpsc::Sender<Bytes>, bytes: Bytes) -> io::Result<()> {
    if bytes.is_empty() {
        return Ok(());
    }
    chunks
        .send(bytes)
        .await
        .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "response body receiver dropped"))
}

/// Response body fed by the sender. Ends when the writer finishes, errors
/// when the writer aborts.
struct BodyStream {
    chunks: mpsc::Receiver<Bytes>,
    abort: Option<oneshot::Receiver<io::Error>>,
}

impl Stream for BodyStream {
    type Item = io::Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if let Some(abort) = self.abort.as_mut() {
            match Pin::new(abort).poll(cx) {
                Poll::Ready(Ok(err)) => {
                    self.abort = None;
                    self.chunks.close();
                    return Poll::Ready(Some(Err(err)));
                }
                // writer finished without aborting
                Poll::Ready(Err(_)) => self.abort = None,
                Poll::Pending => {}
            }
        }
        self.chunks.poll_recv(cx).map(|chunk| chunk.map(Ok))
    }
}
