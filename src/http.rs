//! Request/response model at the transport boundary.
//!
//! The agent treats bodies as opaque bytes; JSON helpers exist because the
//! synthesized offline response and most api-class payloads are JSON.

use std::fmt;

use serde_json::json;

/// HTTP method. Only `GET` requests are eligible for caching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Head,
    Post,
    Put,
    Patch,
    Delete,
    Options,
}

impl Method {
    pub fn is_get(&self) -> bool {
        matches!(self, Method::Get)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
            Method::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse request class driving the agent's caching policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestClass {
    /// Dynamic data; served network-first.
    Api,
    /// Shell assets and other static content; served cache-first.
    Static,
}

/// An outbound request as the agent sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: Method,
    pub url: String,
}

impl Request {
    pub fn get(url: impl Into<String>) -> Self {
        Self { method: Method::Get, url: url.into() }
    }

    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self { method, url: url.into() }
    }

    /// Whether the URL uses a scheme the agent intercepts.
    pub fn is_http(&self) -> bool {
        self.url.starts_with("http://") || self.url.starts_with("https://") || self.url.starts_with('/')
    }

    /// The path component, with scheme/host and query stripped.
    pub fn path(&self) -> &str {
        let without_scheme = match self.url.find("://") {
            Some(idx) => {
                let rest = &self.url[idx + 3..];
                match rest.find('/') {
                    Some(slash) => &rest[slash..],
                    None => "/",
                }
            }
            None => self.url.as_str(),
        };
        let end = without_scheme
            .find(|c| c == '?' || c == '#')
            .unwrap_or(without_scheme.len());
        &without_scheme[..end]
    }

    /// The cache identity of this request.
    pub fn cache_key(&self) -> CacheKey {
        CacheKey::new(self.method, &self.url)
    }
}

/// Explicit cache identity: method plus the URL with its fragment stripped.
///
/// Headers and bodies deliberately do not participate, so the same resource
/// fetched with different header variations maps to one entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    method: Method,
    url: String,
}

impl CacheKey {
    pub fn new(method: Method, url: &str) -> Self {
        let normalized = match url.find('#') {
            Some(idx) => &url[..idx],
            None => url,
        };
        Self { method, url: normalized.to_string() }
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

/// Response type as reported by the transport.
///
/// `Error` marks responses that carry no usable body (failed opaque
/// cross-origin fetches); these are never cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    Basic,
    Opaque,
    Error,
}

/// A response as the agent sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
    pub kind: ResponseKind,
}

impl Response {
    pub fn new(status: u16, body: Vec<u8>) -> Self {
        Self { status, content_type: None, body, kind: ResponseKind::Basic }
    }

    /// A 200 response with a JSON body.
    pub fn json(value: &serde_json::Value) -> Self {
        Self {
            status: 200,
            content_type: Some("application/json".to_string()),
            body: value.to_string().into_bytes(),
            kind: ResponseKind::Basic,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_kind(mut self, kind: ResponseKind) -> Self {
        self.kind = kind;
        self
    }

    /// The structured offline response served when the network is down and no
    /// cached entry exists: callers treat "offline" as a normal response
    /// branch rather than a thrown error.
    pub fn offline() -> Self {
        Self {
            status: 503,
            content_type: Some("application/json".to_string()),
            body: json!({
                "error": "Offline",
                "message": "No network connection",
            })
            .to_string()
            .into_bytes(),
            kind: ResponseKind::Basic,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == 200
    }

    /// Whether the agent may store this response: HTTP 200 with a non-error
    /// response type.
    pub fn is_cacheable(&self) -> bool {
        self.is_success() && self.kind != ResponseKind::Error
    }

    /// Parse the body as JSON.
    pub fn body_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_strips_scheme_host_query_and_fragment() {
        assert_eq!(Request::get("https://api.example.com/api/hotels?q=x").path(), "/api/hotels");
        assert_eq!(Request::get("http://example.com").path(), "/");
        assert_eq!(Request::get("/api/bookings#frag").path(), "/api/bookings");
        assert_eq!(Request::get("/static/app.css").path(), "/static/app.css");
    }

    #[test]
    fn cache_key_drops_the_fragment_but_keeps_the_query() {
        let with_fragment = Request::get("/api/hotels?q=1#section").cache_key();
        let without = Request::get("/api/hotels?q=1").cache_key();
        assert_eq!(with_fragment, without);

        let other_query = Request::get("/api/hotels?q=2").cache_key();
        assert_ne!(with_fragment, other_query);
    }

    #[test]
    fn cache_keys_distinguish_methods() {
        let get = CacheKey::new(Method::Get, "/api/x");
        let post = CacheKey::new(Method::Post, "/api/x");
        assert_ne!(get, post);
    }

    #[test]
    fn only_http_schemes_are_interceptable() {
        assert!(Request::get("https://example.com/x").is_http());
        assert!(Request::get("http://example.com/x").is_http());
        assert!(Request::get("/relative/path").is_http());
        assert!(!Request::get("chrome-extension://abc/x").is_http());
        assert!(!Request::get("data:text/plain,hi").is_http());
    }

    #[test]
    fn offline_response_has_the_documented_shape() {
        let offline = Response::offline();
        assert_eq!(offline.status, 503);
        let body = offline.body_json().unwrap();
        assert_eq!(body["error"], "Offline");
        assert_eq!(body["message"], "No network connection");
    }

    #[test]
    fn cacheability_requires_200_and_non_error_kind() {
        assert!(Response::new(200, vec![]).is_cacheable());
        assert!(!Response::new(201, vec![]).is_cacheable());
        assert!(!Response::new(404, vec![]).is_cacheable());
        assert!(!Response::new(200, vec![]).with_kind(ResponseKind::Error).is_cacheable());
        assert!(Response::new(200, vec![]).with_kind(ResponseKind::Opaque).is_cacheable());
    }
}
