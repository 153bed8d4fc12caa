use bytes::Bytes;

use crate::error::HttpError;

/// HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    status: u16,
    headers: Vec<(String, String)>,
    body: Bytes,
}

impl Response {
    /// Build a response with the given status and no headers or body.
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Bytes::new(),
        }
    }

    /// Add a header.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// Set the body.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// HTTP status code (e.g. 200, 404).
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Response headers as (name, value) pairs.
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

    /// Consume the response and return the body bytes.
    pub fn bytes(self) -> Bytes {
        self.body
    }

    /// Consume the response and return the body as UTF-8 text.
    pub fn text(self) -> Result<String, HttpError> {
        String::from_utf8(self.body.to_vec()).map_err(|_| HttpError::Parse)
    }

    /// Reference to the body bytes without consuming.
    pub fn body_ref(&self) -> &Bytes {
        &self.body
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_decodes_utf8() {
        let resp = Response::new(200).body("hello");
        assert_eq!(resp.text().unwrap(), "hello");
    }

    #[test]
    fn text_rejects_invalid_utf8() {
        let resp = Response::new(200).body(vec![0xff, 0xfe]);
        assert!(matches!(resp.text(), Err(HttpError::Parse)));
    }

    #[test]
    fn header_lookup_ignores_case() {
        let resp = Response::new(204).header("Content-Type", "text/plain");
        assert_eq!(resp.header_value("content-type"), Some("text/plain"));
        assert_eq!(resp.status(), 204);
    }
}
