//! Caller construction against one base URL.

use reqwest::Method;
use serde::de::DeserializeOwned;
use url::Url;

use super::caller::Caller;
use super::error::CallError;
use super::options::CallOptions;

/// Builds [`Caller`]s sharing one HTTP client, base URL and default options.
#[derive(Debug, Clone)]
pub struct Factory {
    client: reqwest::Client,
    base: Url,
    options: CallOptions,
}

impl Factory {
    pub fn new(client: reqwest::Client, mut base: Url, options: CallOptions) -> Self {
        base.set_query(None);
        base.set_fragment(None);
        Self {
            client,
            base,
            options,
        }
    }

    /// Parse `base` and build a factory on it.
    pub fn parse(client: reqwest::Client, base: &str, options: CallOptions) -> Result<Self, CallError> {
        let url = Url::parse(base).map_err(|source| CallError::InvalidUrl {
            endpoint: base.to_string(),
            source,
        })?;
        Ok(Self::new(client, url, options))
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Caller for `endpoint` (joined onto the base path) decoding into `O`.
    ///
    /// # Panics
    /// When `method` is not one of HEAD, GET, DELETE, POST, PUT, PATCH.
    pub fn caller<O>(&self, endpoint: &str, method: Method, options: CallOptions) -> Caller<O>
    where
        O: DeserializeOwned,
    {
        match self.try_caller(endpoint, method, options) {
            Ok(caller) => caller,
            Err(err) => panic!("rapi: {err}"),
        }
    }

    pub fn try_caller<O>(
        &self,
        endpoint: &str,
        method: Method,
        options: CallOptions,
    ) -> Result<Caller<O>, CallError>
    where
        O: DeserializeOwned,
    {
        let allowed = matches!(
            method,
            Method::HEAD | Method::GET | Method::DELETE | Method::POST | Method::PUT | Method::PATCH
        );
        if !allowed {
            return Err(CallError::MethodNotAllowed(method.to_string()));
        }

        let mut url = self.base.clone();
        url.set_path(&join_path(self.base.path(), endpoint));
        Ok(Caller::new(
            self.client.clone(),
            url,
            method,
            self.options.clone().merge(options),
        ))
    }
}

/// Join `endpoint` onto `base` as URL path segments, resolving `.` and `..`
/// and collapsing repeated slashes. An empty endpoint keeps `base` as is.
fn join_path(base: &str, endpoint: &str) -> String {
    if endpoint.is_empty() {
        return if base.starts_with('/') {
            base.to_string()
        } else {
            format!("/{base}")
        };
    }

    let mut segments: Vec<&str> = Vec::new();
    for segment in base.split('/').chain(endpoint.split('/')) {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            segment => segments.push(segment),
        }
    }
    format!("/{}", segments.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_path() {
        assert_eq!(join_path("/", "ping"), "/ping");
        assert_eq!(join_path("/api/", "/ping/"), "/api/ping");
        assert_eq!(join_path("api", "v1//ping"), "/api/v1/ping");
        assert_eq!(join_path("/api/v1", "../v2/ping"), "/api/v2/ping");
        assert_eq!(join_path("/api/", ""), "/api/");
        assert_eq!(join_path("", ""), "/");
    }

    #[test]
    fn test_caller_url_and_method_check() {
        let factory = Factory::parse(
            reqwest::Client::new(),
            "http://127.0.0.1:8080/rpc?drop=me",
            CallOptions::new(),
        )
        .unwrap();
        let caller = factory
            .try_caller::<()>("ping", Method::GET, CallOptions::new())
            .unwrap();
        assert_eq!(caller.url().as_str(), "http://127.0.0.1:8080/rpc/ping");

        let err = factory
            .try_caller::<()>("ping", Method::OPTIONS, CallOptions::new())
            .unwrap_err();
        assert!(matches!(err, CallError::MethodNotAllowed(m) if m == "OPTIONS"));
    }

    #[test]
    #[should_panic(expected = "not allowed")]
    fn test_caller_panics_on_bad_method() {
        let factory = Factory::parse(reqwest::Client::new(), "http://localhost/", CallOptions::new()).unwrap();
        let _ = factory.caller::<()>("ping", Method::TRACE, CallOptions::new());
    }
}
