//! Configuration schema definitions.
//!
//! This module defines the configuration structure for the RPC server.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::handler::Options;
use crate::http::encoding::DEFAULT_COMPRESSION_LEVEL;

/// Root configuration for the RPC server.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Request size limits.
    pub limits: LimitsConfig,

    /// Body read/write deadlines.
    pub timeouts: TimeoutConfig,

    /// Response compression.
    pub compression: CompressionConfig,

    /// Log output.
    pub logging: LoggingConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum request body in bytes; 0 disables the cap.
    pub max_request_body_size: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_request_body_size: 1024 * 1024,
        }
    }
}

/// Deadlines in milliseconds; 0 disables one.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Time allowed to read a request body.
    pub read_ms: u64,

    /// Time allowed to write a response body.
    pub write_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            read_ms: 10_000,
            write_ms: 10_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct CompressionConfig {
    /// Honour Accept-Encoding on responses.
    pub enabled: bool,

    /// Compression level, 0 (none) to 9 (best).
    pub level: u32,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: DEFAULT_COMPRESSION_LEVEL,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directives, overridden by `RUST_LOG`.
    pub filter: String,

    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "rapi=debug,tower_http=debug".to_string(),
            json: false,
        }
    }
}

impl ServerConfig {
    /// Root dispatcher options derived from this configuration.
    pub fn handler_options(&self) -> Options {
        Options::new()
            .max_request_body_size(self.limits.max_request_body_size)
            .read_timeout(Duration::from_millis(self.timeouts.read_ms))
            .write_timeout(Duration::from_millis(self.timeouts.write_ms))
            .allow_encoding(self.compression.enabled)
            .compression_level(self.compression.level)
    }
}
