//! End-to-end dispatch tests driving [`Handler`] as a tower service.

use std::io::Read;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use bytes::Bytes;
use futures_util::StreamExt;
use http_body_util::BodyExt;
use tower::ServiceExt;

use rapi::demo::{self, ErrorReply, PingRequest, ReverseRequest};
use rapi::handler::Options;
use rapi::http::middleware::{request_id, RequestId};
use rapi::{Error, Handler, Prototype};

async fn call(handler: &Handler, req: Request<Body>) -> (StatusCode, HeaderMap, Bytes) {
    let response = handler.clone().oneshot(req).await.unwrap();
    let (parts, body) = response.into_parts();
    let body = body.collect().await.unwrap().to_bytes();
    (parts.status, parts.headers, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(body.into())
        .unwrap()
}

fn demo_handler(options: Options) -> Handler {
    let handler = Handler::new(options);
    demo::register(&handler);
    handler
}

/// Handler with one counting endpoint at `/count` accepting GET and POST.
fn counting_handler(options: Options) -> (Handler, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let handler = Handler::new(options);
    let counter = calls.clone();
    let count = move |_req: rapi::Request, send: rapi::Sender| {
        let counter = counter.clone();
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            let _ = send.send(&serde_json::json!({"ok": true}), StatusCode::OK).await;
        }
    };
    handler
        .handle("/count", Options::new())
        .register("GET", Prototype::of::<PingRequest>(), count.clone(), Options::new())
        .register("POST", Prototype::of::<PingRequest>(), count, Options::new());
    (handler, calls)
}

fn recording_options() -> (Options, Arc<Mutex<Vec<String>>>) {
    let errors = Arc::new(Mutex::new(Vec::new()));
    let sink = errors.clone();
    let options = Options::new().on_error(move |err: &Error, _head| {
        sink.lock().unwrap().push(err.to_string());
    });
    (options, errors)
}

#[tokio::test]
async fn test_get_binds_query() {
    let handler = demo_handler(Options::new());
    let (status, headers, body) = call(&handler, get("/ping?payload=hello")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(&body[..], b"{\"payload\":\"hello\"}\n");
    assert_eq!(
        headers.get(header::CONTENT_TYPE).unwrap(),
        "application/json; charset=utf-8"
    );
    assert_eq!(headers.get(header::CONTENT_LENGTH).unwrap(), "20");
}

#[tokio::test]
async fn test_post_binds_json_body() {
    let handler = demo_handler(Options::new());
    let (status, _, body) =
        call(&handler, post_json("/reverse", r#"{"string":"abcdefgh"}"#)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(&body[..], b"{\"reversedString\":\"hgfedcba\"}\n");
}

#[tokio::test]
async fn test_get_with_json_content_type_reads_body() {
    let handler = demo_handler(Options::new());
    let req = Request::builder()
        .uri("/reverse?string=ignored")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"string":"ab"}"#))
        .unwrap();
    let (status, _, body) = call(&handler, req).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(&body[..], b"{\"reversedString\":\"ba\"}\n");
}

#[tokio::test]
async fn test_catch_all_pattern_answers_structured_error() {
    let handler = demo_handler(Options::new());
    let (status, _, body) = call(&handler, post_json("/unknown/path", "{}")).await;

    assert_eq!(status, StatusCode::NOT_IMPLEMENTED);
    let reply: ErrorReply = serde_json::from_slice(&body).unwrap();
    assert_eq!(reply.error, "Not Implemented");
}

#[tokio::test]
async fn test_unregistered_method_is_405_with_allow() {
    let (options, errors) = recording_options();
    let (handler, calls) = counting_handler(options);
    let req = Request::builder()
        .method(Method::DELETE)
        .uri("/count")
        .body(Body::empty())
        .unwrap();
    let (status, headers, body) = call(&handler, req).await;

    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(&body[..], b"method not allowed\n");
    assert_eq!(headers.get(header::ALLOW).unwrap(), "GET, HEAD, POST");
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(errors.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_unknown_method_is_405() {
    let (handler, calls) = counting_handler(Options::new());
    let req = Request::builder()
        .method(Method::TRACE)
        .uri("/count")
        .body(Body::empty())
        .unwrap();
    let (status, _, _) = call(&handler, req).await;

    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_options_without_handler_is_405() {
    let (handler, _) = counting_handler(Options::new());
    let req = Request::builder()
        .method(Method::OPTIONS)
        .uri("/count")
        .body(Body::empty())
        .unwrap();
    let (status, _, _) = call(&handler, req).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_options_handler_answers() {
    let options = Options::new().options_handler(|_req| async {
        axum::response::Response::builder()
            .status(StatusCode::NO_CONTENT)
            .header(header::ALLOW, "GET, POST")
            .body(Body::empty())
            .unwrap()
    });
    let (handler, _) = counting_handler(options);
    let req = Request::builder()
        .method(Method::OPTIONS)
        .uri("/count")
        .body(Body::empty())
        .unwrap();
    let (status, headers, _) = call(&handler, req).await;

    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(headers.get(header::ALLOW).unwrap(), "GET, POST");
}

#[tokio::test]
async fn test_asterisk_target_is_rejected() {
    let (options, errors) = recording_options();
    let (handler, calls) = counting_handler(options);
    let (status, headers, body) = call(&handler, get("*")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(headers.get(header::CONNECTION).unwrap(), "close");
    assert!(body.is_empty());
    assert!(errors.lock().unwrap().is_empty());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_no_route_is_404() {
    let (handler, _) = counting_handler(Options::new());
    let (status, _, body) = call(&handler, get("/missing")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(&body[..], b"404 page not found\n");
}

#[tokio::test]
async fn test_not_found_handler_overrides_default() {
    let options = Options::new().not_found_handler(|_req| async {
        axum::response::Response::builder()
            .status(StatusCode::GONE)
            .body(Body::empty())
            .unwrap()
    });
    let (handler, _) = counting_handler(options);
    let (status, _, _) = call(&handler, get("/missing")).await;
    assert_eq!(status, StatusCode::GONE);
}

#[tokio::test]
async fn test_host_pattern_wins_over_path_pattern() {
    let handler = Handler::new(Options::new());
    for (pattern, tag) in [("/where", "any"), ("api.example.com/where", "api")] {
        handler.handle(pattern, Options::new()).register(
            "GET",
            Prototype::of::<PingRequest>(),
            move |_req: rapi::Request, send: rapi::Sender| async move {
                let _ = send.send(&tag, StatusCode::OK).await;
            },
            Options::new(),
        );
    }

    let req = Request::builder()
        .uri("/where")
        .header(header::HOST, "API.example.com:8080")
        .body(Body::empty())
        .unwrap();
    let (_, _, body) = call(&handler, req).await;
    assert_eq!(&body[..], b"\"api\"\n");

    let (_, _, body) = call(&handler, get("/where")).await;
    assert_eq!(&body[..], b"\"any\"\n");
}

#[tokio::test]
async fn test_body_too_large_never_reaches_handler() {
    let (options, errors) = recording_options();
    let (handler, calls) = counting_handler(options.max_request_body_size(16));
    let payload = format!(r#"{{"payload":"{}"}}"#, "x".repeat(64));
    let (status, _, body) = call(&handler, post_json("/count", payload)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(&body[..], b"request body too large\n");
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(errors.lock().unwrap()[0].contains("exceeds 16 bytes"));
}

#[tokio::test]
async fn test_body_within_limit_is_accepted() {
    let (handler, calls) = counting_handler(Options::new().max_request_body_size(64));
    let (status, _, _) = call(&handler, post_json("/count", r#"{"payload":"x"}"#)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_invalid_content_type() {
    let (handler, calls) = counting_handler(Options::new());
    let req = Request::builder()
        .method(Method::POST)
        .uri("/count")
        .header(header::CONTENT_TYPE, "text/html")
        .body(Body::from("<p>"))
        .unwrap();
    let (status, _, body) = call(&handler, req).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(&body[..], b"invalid content type\n");
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_invalid_query() {
    let handler = demo_handler(Options::new());
    let (status, _, body) = call(&handler, get("/now?drift=soon")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(&body[..], b"invalid query\n");
}

#[tokio::test]
async fn test_undecodable_body() {
    let handler = demo_handler(Options::new());
    let (status, _, body) = call(&handler, post_json("/reverse", "{not json")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(&body[..], b"unable to decode request body\n");
}

#[tokio::test]
async fn test_head_mirrors_get_without_body() {
    let handler = demo_handler(Options::new());
    let (get_status, get_headers, get_body) = call(&handler, get("/ping?payload=hi")).await;
    let req = Request::builder()
        .method(Method::HEAD)
        .uri("/ping?payload=hi")
        .body(Body::empty())
        .unwrap();
    let (status, headers, body) = call(&handler, req).await;

    assert_eq!(status, get_status);
    assert!(body.is_empty());
    assert!(!get_body.is_empty());
    assert_eq!(
        headers.get(header::CONTENT_LENGTH),
        get_headers.get(header::CONTENT_LENGTH)
    );
    assert_eq!(
        headers.get(header::CONTENT_TYPE),
        get_headers.get(header::CONTENT_TYPE)
    );
}

#[tokio::test]
async fn test_gzip_when_allowed() {
    let handler = demo_handler(Options::new().allow_encoding(true));
    let req = Request::builder()
        .uri("/ping?payload=squeeze")
        .header(header::ACCEPT_ENCODING, "gzip;q=1, deflate;q=0.5")
        .body(Body::empty())
        .unwrap();
    let (status, headers, body) = call(&handler, req).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers.get(header::CONTENT_ENCODING).unwrap(), "gzip");
    assert!(headers.get(header::CONTENT_LENGTH).is_none());
    assert_eq!(headers.get(header::VARY).unwrap(), "accept-encoding");

    let mut plain = String::new();
    flate2::read::GzDecoder::new(&body[..])
        .read_to_string(&mut plain)
        .unwrap();
    assert_eq!(plain, "{\"payload\":\"squeeze\"}\n");
}

#[tokio::test]
async fn test_deflate_when_preferred() {
    let handler = demo_handler(Options::new().allow_encoding(true));
    let req = Request::builder()
        .uri("/ping?payload=zlib")
        .header(header::ACCEPT_ENCODING, "deflate")
        .body(Body::empty())
        .unwrap();
    let (status, headers, body) = call(&handler, req).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers.get(header::CONTENT_ENCODING).unwrap(), "deflate");
    assert!(headers.get(header::CONTENT_LENGTH).is_none());

    let mut plain = String::new();
    flate2::read::ZlibDecoder::new(&body[..])
        .read_to_string(&mut plain)
        .unwrap();
    assert_eq!(plain, "{\"payload\":\"zlib\"}\n");
}

#[tokio::test(start_paused = true)]
async fn test_stalled_body_hits_read_deadline() {
    let (options, errors) = recording_options();
    let (handler, calls) = counting_handler(options.read_timeout(Duration::from_millis(50)));

    let chunks = futures_util::stream::once(async {
        Ok::<_, std::io::Error>(Bytes::from_static(b"{\"payload\":"))
    })
    .chain(futures_util::stream::pending());
    let (status, _, body) = call(&handler, post_json("/count", Body::from_stream(chunks))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(&body[..], b"unable to read request body\n");
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    let errors = errors.lock().unwrap();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("not read within"));
}

#[tokio::test]
async fn test_encoding_ignored_by_default() {
    let handler = demo_handler(Options::new());
    let req = Request::builder()
        .uri("/ping?payload=plain")
        .header(header::ACCEPT_ENCODING, "gzip")
        .body(Body::empty())
        .unwrap();
    let (_, headers, body) = call(&handler, req).await;

    assert!(headers.get(header::CONTENT_ENCODING).is_none());
    assert_eq!(&body[..], b"{\"payload\":\"plain\"}\n");
}

#[tokio::test]
async fn test_second_send_is_rejected() {
    let (tx, rx) = tokio::sync::oneshot::channel();
    let tx = Arc::new(Mutex::new(Some(tx)));
    let handler = Handler::new(Options::new());
    handler.handle("/twice", Options::new()).register(
        "GET",
        Prototype::of::<PingRequest>(),
        move |_req: rapi::Request, send: rapi::Sender| {
            let tx = tx.clone();
            async move {
                let _ = send.send(&"first", StatusCode::OK).await;
                let second = send.send(&"second", StatusCode::CONFLICT).await;
                if let Some(tx) = tx.lock().unwrap().take() {
                    let _ = tx.send(second);
                }
            }
        },
        Options::new(),
    );

    let (status, _, body) = call(&handler, get("/twice")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(&body[..], b"\"first\"\n");
    assert!(matches!(rx.await.unwrap(), Err(Error::AlreadySent)));
}

#[tokio::test]
async fn test_handler_that_never_sends_is_500() {
    let (options, errors) = recording_options();
    let handler = Handler::new(options);
    handler.handle("/silent", Options::new()).register(
        "GET",
        Prototype::of::<PingRequest>(),
        |_req: rapi::Request, _send: rapi::Sender| async {},
        Options::new(),
    );

    let (status, _, body) = call(&handler, get("/silent")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(&body[..], b"handler did not send a response\n");
    assert_eq!(errors.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_middleware_short_circuits() {
    let guard = Options::new().middleware(|req: rapi::Request, send: rapi::Sender, next: rapi::Next| async move {
        if req.headers().contains_key(header::AUTHORIZATION) {
            next.run(req, send).await;
        } else {
            let reply = ErrorReply {
                error: "unauthorized".to_string(),
            };
            let _ = send.send(&reply, StatusCode::UNAUTHORIZED).await;
        }
    });
    let (handler, calls) = counting_handler(guard);

    let (status, _, body) = call(&handler, get("/count?payload=x")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(&body[..], b"{\"error\":\"unauthorized\"}\n");
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    let req = Request::builder()
        .uri("/count?payload=x")
        .header(header::AUTHORIZATION, "Bearer t")
        .body(Body::empty())
        .unwrap();
    let (status, _, _) = call(&handler, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_middleware_sees_decoded_input_and_request_id() {
    let (tx, rx) = tokio::sync::oneshot::channel();
    let tx = Arc::new(Mutex::new(Some(tx)));
    let inspect = Options::new().with_middleware(request_id()).middleware(
        move |req: rapi::Request, send: rapi::Sender, next: rapi::Next| {
            let tx = tx.clone();
            async move {
                let seen = (
                    req.input::<ReverseRequest>().map(|r| r.string.clone()),
                    req.extensions().get::<RequestId>().map(|id| id.to_string()),
                );
                if let Some(tx) = tx.lock().unwrap().take() {
                    let _ = tx.send(seen);
                }
                next.run(req, send).await;
            }
        },
    );
    let handler = demo_handler(inspect);

    let req = Request::builder()
        .uri("/reverse?string=mw")
        .header("x-request-id", "6f9619ff-8b86-d011-b42d-00cf4fc964ff")
        .body(Body::empty())
        .unwrap();
    let (status, _, _) = call(&handler, req).await;
    assert_eq!(status, StatusCode::OK);

    let (input, id) = rx.await.unwrap();
    assert_eq!(input.as_deref(), Some("mw"));
    assert_eq!(id.as_deref(), Some("6f9619ff-8b86-d011-b42d-00cf4fc964ff"));
}

#[tokio::test]
async fn test_pattern_options_override_root() {
    let handler = Handler::new(Options::new().max_request_body_size(8));
    handler
        .handle("/big", Options::new().max_request_body_size(0))
        .register(
            "POST",
            Prototype::of::<PingRequest>(),
            |req: rapi::Request, send: rapi::Sender| async move {
                let len = req.body().len();
                let _ = send.send(&len, StatusCode::OK).await;
            },
            Options::new(),
        );

    let payload = format!(r#"{{"payload":"{}"}}"#, "y".repeat(100));
    let expected = format!("{}\n", payload.len());
    let (status, _, body) = call(&handler, post_json("/big", payload)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(&body[..], expected.as_bytes());
}
