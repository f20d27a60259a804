//! HTTP calls to the Clearing House backend.

use crate::domain::error::BackendError;
use crate::strategy::BackendBody;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Header carrying the minted service token
pub const SERVICE_TOKEN_HEADER: &str = "Ch-Service";

/// Raw backend answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendReply {
    pub status: u16,
    pub body: Bytes,
}

/// Executes one POST against the backend
#[async_trait]
pub trait BackendTransport: Send + Sync {
    async fn post_json(
        &self,
        url: &str,
        service_token: &str,
        body: &BackendBody,
    ) -> Result<BackendReply, BackendError>;
}

/// reqwest-backed transport
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::Transport(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl BackendTransport for HttpTransport {
    async fn post_json(
        &self,
        url: &str,
        service_token: &str,
        body: &BackendBody,
    ) -> Result<BackendReply, BackendError> {
        let encoded = serde_json::to_vec(body).map_err(|e| BackendError::Encode(e.to_string()))?;
        let response = self
            .client
            .post(url)
            .header(SERVICE_TOKEN_HEADER, service_token)
            .header(CONTENT_TYPE, "application/json")
            .body(encoded)
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;
        Ok(BackendReply { status, body })
    }
}

/// Sends backend requests and classifies the outcome
#[derive(Clone)]
pub struct BackendSender {
    transport: Arc<dyn BackendTransport>,
}

impl BackendSender {
    pub fn new(transport: Arc<dyn BackendTransport>) -> Self {
        Self { transport }
    }

    /// Body of a successful, non-empty answer.
    pub async fn send(
        &self,
        url: &str,
        service_token: &str,
        body: &BackendBody,
    ) -> Result<Bytes, BackendError> {
        debug!(url = %url, message_id = %body.header.id, "Calling backend");
        let reply = self
            .transport
            .post_json(url, service_token, body)
            .await
            .map_err(|e| {
                warn!(url = %url, error = %e, "Backend unreachable");
                e
            })?;
        classify(reply).map_err(|e| {
            warn!(url = %url, error = %e, "Backend call failed");
            e
        })
    }
}

/// Non-2xx is a status error; a 2xx with a blank body is an empty body.
pub fn classify(reply: BackendReply) -> Result<Bytes, BackendError> {
    if !(200..300).contains(&reply.status) {
        return Err(BackendError::Status(reply.status));
    }
    if reply.body.iter().all(u8::is_ascii_whitespace) {
        return Err(BackendError::EmptyBody);
    }
    Ok(reply.body)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reply(status: u16, body: &'static [u8]) -> BackendReply {
        BackendReply {
            status,
            body: Bytes::from_static(body),
        }
    }

    #[test]
    fn test_classify_success() {
        assert_eq!(
            classify(reply(201, br#"{"pid":"p"}"#)).unwrap(),
            Bytes::from_static(br#"{"pid":"p"}"#)
        );
    }

    #[test]
    fn test_classify_status() {
        assert_eq!(
            classify(reply(500, b"boom")),
            Err(BackendError::Status(500))
        );
        assert_eq!(classify(reply(404, b"")), Err(BackendError::Status(404)));
    }

    #[test]
    fn test_classify_empty_body() {
        assert_eq!(classify(reply(200, b"")), Err(BackendError::EmptyBody));
        assert_eq!(classify(reply(200, b" \n")), Err(BackendError::EmptyBody));
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_transport_error() {
        let transport = HttpTransport::new(Duration::from_millis(500)).unwrap();
        let sender = BackendSender::new(Arc::new(transport));
        let body = crate::strategy::BackendBody::header_only(
            &crate::strategy::test_support::request(
                crate::domain::envelope::MessageType::LogMessage,
                None,
                None,
            ),
        );
        let result = sender.send("http://127.0.0.1:9/messages/log/p", "t", &body).await;
        assert!(matches!(result, Err(BackendError::Transport(_))));
    }
}
