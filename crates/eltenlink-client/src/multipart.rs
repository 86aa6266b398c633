//! Multipart form encoding for write operations that carry a free-text body.

use rand::Rng;
use std::fmt::Write;

/// A `multipart/form-data` body with a locally generated boundary.
///
/// Each field becomes one part with a `Content-Disposition` header naming
/// it, followed by the raw value. Requests are built per call and never
/// reused, so the body owns its fields.
#[derive(Debug, Clone)]
pub struct MultipartBody {
    boundary: String,
    fields: Vec<(String, String)>,
}

impl MultipartBody {
    /// Creates an empty body with a fresh boundary.
    #[must_use]
    pub fn new() -> Self {
        let tag: u32 = rand::thread_rng().gen_range(100_000..1_000_000);
        Self {
            boundary: format!("----EltBoundary{tag}"),
            fields: Vec::new(),
        }
    }

    /// Adds a field.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    /// The boundary string in use.
    #[must_use]
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// The `Content-Type` header value for this body.
    #[must_use]
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    /// Encodes the parts and the closing terminator.
    #[must_use]
    pub fn encode(&self) -> String {
        let mut body = String::new();
        for (name, value) in &self.fields {
            let _ = write!(
                body,
                "--{}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n",
                self.boundary
            );
        }
        let _ = write!(body, "--{}--\r\n", self.boundary);
        body
    }
}

impl Default for MultipartBody {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_encoding_layout() {
        let body = MultipartBody::new()
            .field("text", "hello\nworld")
            .field("subject", "greeting");
        let encoded = body.encode();
        let boundary = body.boundary();

        assert!(encoded.starts_with(&format!("--{boundary}\r\n")));
        assert!(encoded.contains("Content-Disposition: form-data; name=\"text\"\r\n\r\nhello\nworld\r\n"));
        assert!(encoded.contains("Content-Disposition: form-data; name=\"subject\"\r\n\r\ngreeting\r\n"));
        assert!(encoded.ends_with(&format!("--{boundary}--\r\n")));
    }

    #[test]
    fn test_boundary_shape() {
        let body = MultipartBody::new();
        assert!(body.boundary().starts_with("----EltBoundary"));
        assert_eq!(
            body.content_type(),
            format!("multipart/form-data; boundary={}", body.boundary())
        );
    }

    #[test]
    fn test_boundaries_differ_between_bodies() {
        // Randomized; two fresh bodies colliding is possible but the range
        // makes it vanishingly unlikely for a single assertion.
        let a = MultipartBody::new();
        let b = MultipartBody::new();
        let c = MultipartBody::new();
        assert!(a.boundary() != b.boundary() || b.boundary() != c.boundary());
    }
}
