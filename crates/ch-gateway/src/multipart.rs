//! `multipart/form-data` encoding of outbound messages.
//!
//! Inbound bodies are read with axum's `Multipart` extractor; this side
//! only writes. Parts are emitted in insertion order: `header`, then
//! `payload` when present.

use crate::domain::request::HandlerResponse;
use bytes::{BufMut, Bytes, BytesMut};
use uuid::Uuid;

pub const HEADER_PART: &str = "header";
pub const PAYLOAD_PART: &str = "payload";

#[derive(Debug, Clone, PartialEq, Eq)]
struct Part {
    name: String,
    content_type: String,
    body: Bytes,
}

/// Multipart body under construction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartBody {
    boundary: String,
    parts: Vec<Part>,
}

impl MultipartBody {
    pub fn new() -> Self {
        Self::with_boundary(format!("ch-gateway-{}", Uuid::new_v4().simple()))
    }

    pub fn with_boundary(boundary: impl Into<String>) -> Self {
        Self {
            boundary: boundary.into(),
            parts: Vec::new(),
        }
    }

    /// Header part plus a JSON payload part when the response has one.
    pub fn from_response(response: &HandlerResponse) -> Result<Self, serde_json::Error> {
        let mut body = Self::new().json_part(HEADER_PART, serde_json::to_vec(&response.header)?);
        if let Some(payload) = &response.payload {
            body = body.json_part(PAYLOAD_PART, serde_json::to_vec(payload)?);
        }
        Ok(body)
    }

    pub fn part(
        mut self,
        name: impl Into<String>,
        content_type: impl Into<String>,
        body: impl Into<Bytes>,
    ) -> Self {
        self.parts.push(Part {
            name: name.into(),
            content_type: content_type.into(),
            body: body.into(),
        });
        self
    }

    pub fn json_part(self, name: impl Into<String>, body: impl Into<Bytes>) -> Self {
        self.part(name, "application/json", body)
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Value of the `Content-Type` header
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    pub fn encode(&self) -> Bytes {
        let mut out = BytesMut::new();
        for part in &self.parts {
            out.put_slice(b"--");
            out.put_slice(self.boundary.as_bytes());
            out.put_slice(b"\r\n");
            out.put_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{}\"\r\n",
                    part.name.replace('"', "%22")
                )
                .as_bytes(),
            );
            out.put_slice(format!("Content-Type: {}\r\n\r\n", part.content_type).as_bytes());
            out.put_slice(&part.body);
            out.put_slice(b"\r\n");
        }
        out.put_slice(b"--");
        out.put_slice(self.boundary.as_bytes());
        out.put_slice(b"--\r\n");
        out.freeze()
    }
}

impl Default for MultipartBody {
    fn default() -> Self {
        Self::new()
    }
}
