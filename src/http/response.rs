//! Plain-text responses emitted by the dispatcher itself.
//!
//! # Responsibilities
//! - Answer requests that never reach a handler (404, 405, bad target)
//! - Answer binding failures before the handler runs
//!
//! # Design Decisions
//! - Same shape as a stock text error page: `text/plain`, `nosniff`,
//!   message plus newline
//! - Handlers never use this; their output always goes out as JSON

use axum::body::Body;
use axum::http::header::{self, HeaderValue};
use axum::http::StatusCode;
use axum::response::Response;

use crate::http::content_type::TEXT_CONTENT_TYPE;

/// Build a plain-text response carrying `message`.
pub fn plain_text(status: StatusCode, message: &str) -> Response {
    let body = format!("{message}\n");
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(TEXT_CONTENT_TYPE));
    headers.insert(header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[tokio::test]
    async fn test_plain_text_shape() {
        let response = plain_text(StatusCode::NOT_FOUND, "404 page not found");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers()[header::CONTENT_TYPE], TEXT_CONTENT_TYPE);
        assert_eq!(response.headers()[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"404 page not found\n");
    }
}
