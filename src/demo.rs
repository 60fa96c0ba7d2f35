//! Demo RPC surface shared by `rapi-server`, `rapi-cli` and the tests.
//!
//! | Pattern    | Method    | Input            | Output         |
//! |------------|-----------|------------------|----------------|
//! | `/ping`    | GET       | `PingRequest`    | `PingReply`    |
//! | `/reverse` | GET, POST | `ReverseRequest` | `ReverseReply` |
//! | `/now`     | GET       | `NowRequest`     | `NowReply`     |
//! | `/`        | any       | `Empty`          | 501 `ErrorReply` |

use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::binding::Empty;
use crate::handler::{Handler, Options, Prototype};
use crate::http::{Request, Sender};

/// Error body of every non-200 demo reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReply {
    pub error: String,
}

impl std::fmt::Display for ErrorReply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.error)
    }
}

impl std::error::Error for ErrorReply {}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PingRequest {
    pub payload: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PingReply {
    pub payload: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReverseRequest {
    pub string: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReverseReply {
    #[serde(rename = "reversedString")]
    pub reversed_string: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NowRequest {
    /// Reference time; the server clock when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<DateTime<Utc>>,
    /// Milliseconds added to the reference time.
    pub drift: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NowReply {
    pub now: DateTime<Utc>,
}

async fn ping(req: Request, send: Sender) {
    if let Ok(input) = req.into_input::<PingRequest>() {
        let _ = send
            .send(&PingReply { payload: input.payload }, StatusCode::OK)
            .await;
    }
}

async fn reverse(req: Request, send: Sender) {
    if let Ok(input) = req.into_input::<ReverseRequest>() {
        let reply = ReverseReply {
            reversed_string: input.string.chars().rev().collect(),
        };
        let _ = send.send(&reply, StatusCode::OK).await;
    }
}

async fn now(req: Request, send: Sender) {
    if let Ok(input) = req.into_input::<NowRequest>() {
        let base = input.time.unwrap_or_else(Utc::now);
        match base.checked_add_signed(chrono::Duration::milliseconds(input.drift)) {
            Some(now) => {
                let _ = send.send(&NowReply { now }, StatusCode::OK).await;
            }
            None => {
                let reply = ErrorReply {
                    error: "drift out of range".to_string(),
                };
                let _ = send.send(&reply, StatusCode::BAD_REQUEST).await;
            }
        }
    }
}

async fn unimplemented(req: Request, send: Sender) {
    tracing::debug!(method = %req.method(), path = %req.uri().path(), "No demo endpoint");
    let reply = ErrorReply {
        error: "Not Implemented".to_string(),
    };
    let _ = send.send(&reply, StatusCode::NOT_IMPLEMENTED).await;
}

/// Register the demo endpoints on `handler`.
pub fn register(handler: &Handler) {
    handler
        .handle("/", Options::new())
        .register("", Prototype::of::<Empty>(), unimplemented, Options::new());

    handler
        .handle("/ping", Options::new())
        .register("GET", Prototype::of::<PingRequest>(), ping, Options::new());

    handler
        .handle("/reverse", Options::new())
        .register("GET", Prototype::of::<ReverseRequest>(), reverse, Options::new())
        .register("POST", Prototype::of::<ReverseRequest>(), reverse, Options::new());

    handler
        .handle("/now", Options::new())
        .register("GET", Prototype::of::<NowRequest>(), now, Options::new());
}
