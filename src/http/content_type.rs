//! Media type parsing and validation.
//!
//! Request bodies (server side) and response bodies (client side) must be
//! JSON; only a `utf-8` charset is accepted when one is given.

use thiserror::Error;

pub const APPLICATION_JSON: &str = "application/json";
pub const TEXT_PLAIN: &str = "text/plain";
pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";
pub const TEXT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// Reasons a content type is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContentTypeError {
    #[error("unable to parse media type")]
    Malformed,

    #[error("invalid media type {0:?}")]
    MediaType(String),

    #[error("invalid charset {0:?}")]
    Charset(String),
}

/// A parsed `type/subtype; key=value` media type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaType {
    /// Lowercased `type/subtype`.
    pub essence: String,
    /// Parameters with lowercased keys, unquoted values.
    pub params: Vec<(String, String)>,
}

impl MediaType {
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

fn is_token(s: &str) -> bool {
    !s.is_empty()
        && s.bytes().all(|b| {
            b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
        })
}

/// Parse a `Content-Type` value.
pub fn parse_media_type(value: &str) -> Result<MediaType, ContentTypeError> {
    let mut parts = value.split(';');
    let essence = parts.next().unwrap_or_default().trim().to_ascii_lowercase();
    match essence.split_once('/') {
        Some((kind, subtype)) if is_token(kind) && is_token(subtype) => {}
        _ => return Err(ContentTypeError::Malformed),
    }

    let mut params = Vec::new();
    for part in parts {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let (key, val) = part.split_once('=').ok_or(ContentTypeError::Malformed)?;
        let key = key.trim().to_ascii_lowercase();
        if !is_token(&key) {
            return Err(ContentTypeError::Malformed);
        }
        let val = val.trim();
        let val = val
            .strip_prefix('"')
            .and_then(|v| v.strip_suffix('"'))
            .unwrap_or(val);
        params.push((key, val.to_string()));
    }

    Ok(MediaType { essence, params })
}

/// Parse `value` and check it against the allowed media types.
pub fn validate_content_type(value: &str, allowed: &[&str]) -> Result<MediaType, ContentTypeError> {
    let media = parse_media_type(value)?;
    if !allowed.iter().any(|a| media.essence == *a) {
        return Err(ContentTypeError::MediaType(media.essence));
    }
    if let Some(charset) = media.param("charset") {
        let charset = charset.to_ascii_lowercase();
        if charset != "utf-8" {
            return Err(ContentTypeError::Charset(charset));
        }
    }
    Ok(media)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_media_type() {
        let media = parse_media_type("Application/JSON; Charset=\"UTF-8\"").unwrap();
        assert_eq!(media.essence, "application/json");
        assert_eq!(media.param("charset"), Some("UTF-8"));
    }

    #[test]
    fn test_validate_accepts_json() {
        assert!(validate_content_type("application/json", &[APPLICATION_JSON]).is_ok());
        assert!(validate_content_type(JSON_CONTENT_TYPE, &[APPLICATION_JSON]).is_ok());
    }

    #[test]
    fn test_validate_rejects() {
        assert_eq!(
            validate_content_type("text/html", &[APPLICATION_JSON]),
            Err(ContentTypeError::MediaType("text/html".into()))
        );
        assert_eq!(
            validate_content_type("application/json; charset=latin1", &[APPLICATION_JSON]),
            Err(ContentTypeError::Charset("latin1".into()))
        );
        assert_eq!(
            validate_content_type("json", &[APPLICATION_JSON]),
            Err(ContentTypeError::Malformed)
        );
        assert_eq!(
            validate_content_type("application/json; charset", &[APPLICATION_JSON]),
            Err(ContentTypeError::Malformed)
        );
    }

    #[test]
    fn test_text_plain_only_when_allowed() {
        assert!(validate_content_type(TEXT_CONTENT_TYPE, &[APPLICATION_JSON, TEXT_PLAIN]).is_ok());
        assert!(validate_content_type(TEXT_CONTENT_TYPE, &[APPLICATION_JSON]).is_err());
    }
}
