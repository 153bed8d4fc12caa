//! HTTP request values and their tracking identity.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::body::Body;

static NEXT_REQUEST_ID: AtomicU64 = AtomicU64::new(1);

/// Identifies one constructed [`Request`].
///
/// Every `Request` gets a fresh id when it is built, so two requests for the
/// same URI are still tracked separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(u64);

impl RequestId {
    fn next() -> Self {
        RequestId(NEXT_REQUEST_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "req#{}", self.0)
    }
}

/// An HTTP request.
///
/// Deliberately not `Clone`: a copy would share this request's [`RequestId`].
/// Build a second request instead.
///
/// ```rust
/// use syncline_http::Request;
///
/// let req = Request::new("POST", "http://example.com/items")
///     .header("content-type", "application/json")
///     .body("{}");
/// assert_eq!(req.method(), "POST");
///
/// // A bare URI normalizes to a GET.
/// let get: Request = "http://example.com/".into();
/// assert_eq!(get.method(), "GET");
/// assert_ne!(get.id(), req.id());
/// ```
#[derive(Debug)]
pub struct Request {
    id: RequestId,
    method: String,
    uri: String,
    headers: Vec<(String, String)>,
    body: Body,
}

impl Request {
    /// Build a request with the given method and URI.
    pub fn new(method: &str, uri: &str) -> Self {
        Self {
            id: RequestId::next(),
            method: method.to_string(),
            uri: uri.to_string(),
            headers: Vec::new(),
            body: Body::Empty,
        }
    }

    /// Build a GET request.
    pub fn get(uri: &str) -> Self {
        Self::new("GET", uri)
    }

    /// Build a POST request.
    pub fn post(uri: &str) -> Self {
        Self::new("POST", uri)
    }

    /// Build a PUT request.
    pub fn put(uri: &str) -> Self {
        Self::new("PUT", uri)
    }

    /// Build a DELETE request.
    pub fn delete(uri: &str) -> Self {
        Self::new("DELETE", uri)
    }

    /// Add a header to the request.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// Set the request body.
    pub fn body(mut self, body: impl Into<Body>) -> Self {
        self.body = body.into();
        self
    }

    /// Tracking identity of this request.
    pub fn id(&self) -> RequestId {
        self.id
    }

    /// Request method (e.g. `GET`).
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Request URI as given.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Request headers as (name, value) pairs.
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Get the first header value matching `name` (case-insensitive).
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Request body.
    pub fn body_ref(&self) -> &Body {
        &self.body
    }
}

impl From<&str> for Request {
    fn from(uri: &str) -> Self {
        Request::get(uri)
    }
}

impl From<String> for Request {
    fn from(uri: String) -> Self {
        Request::get(&uri)
    }
}

impl From<&String> for Request {
    fn from(uri: &String) -> Self {
        Request::get(uri)
    }
}
