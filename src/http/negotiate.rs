//! Content negotiation for response body transforms.
//!
//! # Responsibilities
//! - Parse weighted header directives (`gzip;q=0.8, deflate, *;q=0`)
//! - Select the response encoding from an `Accept-Encoding` value
//!
//! # Design Decisions
//! - `q` is a preference weight in `[0, 1]`, never a compression level
//! - Highest weight wins, ties go to the earliest offer, `q=0` excludes
//! - `*` stands for the first supported coding not named explicitly
//! - Nothing acceptable falls back to identity rather than 406

use std::collections::HashMap;

use thiserror::Error;

use crate::http::encoding::Encoding;

/// One comma-separated alternative of a header directive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderOption {
    /// `key[=value]` pairs in header order.
    pub key_vals: Vec<(String, String)>,
    /// First value seen per key.
    pub map: HashMap<String, String>,
}

impl HeaderOption {
    /// The leading token, e.g. the coding name in `gzip;q=0.5`.
    pub fn token(&self) -> &str {
        self.key_vals.first().map(|(k, _)| k.as_str()).unwrap_or_default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.map.get(key).map(String::as_str)
    }
}

/// Parse a directive into options. Empty keys and empty options are dropped.
pub fn parse_header_options(directive: &str) -> Vec<HeaderOption> {
    let mut options = Vec::new();
    for alternative in directive.split(',') {
        let mut option = HeaderOption::default();
        for kv in alternative.trim().split(';') {
            let (key, val) = match kv.split_once('=') {
                Some((k, v)) => (k.trim(), v.trim()),
                None => (kv.trim(), ""),
            };
            if key.is_empty() {
                continue;
            }
            option.key_vals.push((key.to_string(), val.to_string()));
            option
                .map
                .entry(key.to_string())
                .or_insert_with(|| val.to_string());
        }
        if !option.key_vals.is_empty() {
            options.push(option);
        }
    }
    options
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NegotiationError {
    #[error("invalid quality value {value:?} for {coding:?}")]
    InvalidQuality { coding: String, value: String },
}

fn quality(option: &HeaderOption) -> Result<f32, NegotiationError> {
    match option.get("q") {
        None => Ok(1.0),
        Some(raw) => raw
            .parse::<f32>()
            .ok()
            .filter(|q| (0.0..=1.0).contains(q))
            .ok_or_else(|| NegotiationError::InvalidQuality {
                coding: option.token().to_string(),
                value: raw.to_string(),
            }),
    }
}

/// Select the response encoding for an `Accept-Encoding` value.
pub fn select_encoding(accept_encoding: &str) -> Result<Encoding, NegotiationError> {
    let options = parse_header_options(accept_encoding);

    let mut named = Vec::new();
    let mut offers = Vec::new();
    let mut wildcard = None;
    for option in &options {
        let q = quality(option)?;
        let token = option.token().to_ascii_lowercase();
        if token == "*" {
            wildcard.get_or_insert(q);
            continue;
        }
        if let Some(encoding) = Encoding::from_token(&token) {
            named.push(encoding);
            offers.push((encoding, q));
        }
    }

    if let Some(q) = wildcard {
        let unnamed = [Encoding::Gzip, Encoding::Deflate]
            .into_iter()
            .find(|e| !named.contains(e));
        if let Some(encoding) = unnamed {
            offers.push((encoding, q));
        }
    }

    let mut best: Option<(Encoding, f32)> = None;
    for (encoding, q) in offers {
        if q <= 0.0 {
            continue;
        }
        if best.map_or(true, |(_, best_q)| q > best_q) {
            best = Some((encoding, q));
        }
    }

    Ok(best.map(|(e, _)| e).unwrap_or(Encoding::Identity))
}
