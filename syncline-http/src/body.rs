//! Request payloads.

use bytes::Bytes;

/// Payload carried by a [`Request`](crate::Request).
///
/// Every empty input normalizes to [`Body::Empty`], so a `Bytes` body is
/// never zero-length.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Body {
    #[default]
    Empty,
    Bytes(Bytes),
}

impl Body {
    fn from_bytes(bytes: Bytes) -> Self {
        if bytes.is_empty() {
            Body::Empty
        } else {
            Body::Bytes(bytes)
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Body::Empty)
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        match self {
            Body::Empty => 0,
            Body::Bytes(b) => b.len(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Body::Empty => &[],
            Body::Bytes(b) => b,
        }
    }

    /// Consume the body. Shares the underlying buffer; nothing is copied.
    pub fn into_bytes(self) -> Bytes {
        match self {
            Body::Empty => Bytes::new(),
            Body::Bytes(b) => b,
        }
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        Body::from_bytes(bytes)
    }
}

impl From<Vec<u8>> for Body {
    fn from(v: Vec<u8>) -> Self {
        Body::from_bytes(Bytes::from(v))
    }
}

impl From<String> for Body {
    fn from(s: String) -> Self {
        Body::from_bytes(Bytes::from(s))
    }
}

impl From<&[u8]> for Body {
    fn from(s: &[u8]) -> Self {
        Body::from_bytes(Bytes::copy_from_slice(s))
    }
}

impl From<&str> for Body {
    fn from(s: &str) -> Self {
        Body::from(s.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_inputs_collapse_to_empty() {
        assert_eq!(Body::from(""), Body::Empty);
        assert_eq!(Body::from(Vec::new()), Body::Empty);
        assert_eq!(Body::from(String::new()), Body::Empty);
        assert_eq!(Body::from(Bytes::new()), Body::Empty);
        assert!(Body::default().is_empty());
        assert!(Body::Empty.into_bytes().is_empty());
    }

    #[test]
    fn into_bytes_shares_the_buffer() {
        let shared = Bytes::from_static(b"payload");
        let body = Body::from(shared.clone());
        assert_eq!(body.len(), 7);
        assert_eq!(body.as_bytes(), b"payload");

        let out = body.into_bytes();
        assert_eq!(out, shared);
        assert_eq!(out.as_ptr(), shared.as_ptr());
    }
}
