//! Pattern parsing and matching.
//!
//! # Responsibilities
//! - Parse a registration pattern into optional host plus path rule
//! - Match host header (case-insensitive, port ignored)
//! - Match path exactly, or as a subtree when the pattern ends in '/'
//!
//! # Design Decisions
//! - Path matching is case-sensitive
//! - No regex or wildcards: "/" is the catch-all subtree
//! - Specificity orders candidates: host patterns first, then longer paths

use std::fmt;

/// Why a pattern was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternError(pub String);

impl fmt::Display for PatternError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid pattern {:?}", self.0)
    }
}

impl std::error::Error for PatternError {}

/// A parsed registration pattern, e.g. `/ping`, `/files/` or `api.example.com/ping`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    host: Option<String>,
    path: String,
}

impl Pattern {
    pub fn parse(pattern: &str) -> Result<Self, PatternError> {
        let slash = pattern
            .find('/')
            .ok_or_else(|| PatternError(pattern.to_string()))?;
        let (host, path) = pattern.split_at(slash);
        Ok(Self {
            host: (!host.is_empty()).then(|| host.to_ascii_lowercase()),
            path: path.to_string(),
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    /// Subtree patterns end in '/' and match everything below them.
    pub fn is_subtree(&self) -> bool {
        self.path.ends_with('/')
    }

    pub fn matches(&self, host: Option<&str>, path: &str) -> bool {
        if let Some(expected) = &self.host {
            let Some(host) = host else {
                return false;
            };
            if !strip_port(host).eq_ignore_ascii_case(expected) {
                return false;
            }
        }
        if self.is_subtree() {
            path.starts_with(&self.path)
        } else {
            path == self.path
        }
    }

    /// Larger wins when several patterns match the same request.
    pub fn specificity(&self) -> (bool, bool, usize) {
        (self.host.is_some(), !self.is_subtree(), self.path.len())
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(host) = &self.host {
            f.write_str(host)?;
        }
        f.write_str(&self.path)
    }
}

fn strip_port(host: &str) -> &str {
    match host.rfind(':') {
        // keep bracketed IPv6 literals whole
        Some(colon) if !host[colon..].contains(']') => &host[..colon],
        _ => host,
    }
}
