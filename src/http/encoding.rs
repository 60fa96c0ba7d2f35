//! Streaming response body transforms.

use std::io::{self, Write};

use bytes::Bytes;
use flate2::write::{GzEncoder, ZlibEncoder};
use flate2::Compression;

/// Compression level used when none is configured.
pub const DEFAULT_COMPRESSION_LEVEL: u32 = 6;

/// Response body encodings the sender can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Encoding {
    Identity,
    Gzip,
    /// zlib-wrapped deflate, as HTTP defines it.
    Deflate,
}

impl Encoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            Encoding::Identity => "identity",
            Encoding::Gzip => "gzip",
            Encoding::Deflate => "deflate",
        }
    }

    /// Map a content-coding token (lowercase) to an encoding.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "identity" => Some(Encoding::Identity),
            "gzip" | "x-gzip" => Some(Encoding::Gzip),
            "deflate" => Some(Encoding::Deflate),
            _ => None,
        }
    }

    pub fn is_identity(&self) -> bool {
        matches!(self, Encoding::Identity)
    }
}

/// Incremental encoder; each call returns the bytes ready for the wire.
pub(crate) enum ContentEncoder {
    Identity,
    Gzip(GzEncoder<Vec<u8>>),
    Deflate(ZlibEncoder<Vec<u8>>),
}

impl ContentEncoder {
    pub(crate) fn new(encoding: Encoding, level: u32) -> Self {
        let level = Compression::new(level.min(9));
        match encoding {
            Encoding::Identity => ContentEncoder::Identity,
            Encoding::Gzip => ContentEncoder::Gzip(GzEncoder::new(Vec::new(), level)),
            Encoding::Deflate => ContentEncoder::Deflate(ZlibEncoder::new(Vec::new(), level)),
        }
    }

    pub(crate) fn encode(&mut self, chunk: &[u8]) -> io::Result<Bytes> {
        match self {
            ContentEncoder::Identity => Ok(Bytes::copy_from_slice(chunk)),
            ContentEncoder::Gzip(encoder) => {
                encoder.write_all(chunk)?;
                Ok(Bytes::from(std::mem::take(encoder.get_mut())))
            }
            ContentEncoder::Deflate(encoder) => {
                encoder.write_all(chunk)?;
                Ok(Bytes::from(std::mem::take(encoder.get_mut())))
            }
        }
    }

    /// Flush the trailer.
    pub(crate) fn finish(self) -> io::Result<Bytes> {
        match self {
            ContentEncoder::Identity => Ok(Bytes::new()),
            ContentEncoder::Gzip(encoder) => encoder.finish().map(Bytes::from),
            ContentEncoder::Deflate(encoder) => encoder.finish().map(Bytes::from),
        }
    }
}
