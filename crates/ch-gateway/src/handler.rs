//! Dispatch of validated requests to the backend.

use crate::backend::BackendSender;
use crate::domain::envelope::Correlation;
use crate::domain::error::{BackendError, GatewayError};
use crate::domain::reason::RejectionReason;
use crate::domain::request::{HandlerRequest, HandlerResponse};
use crate::response::ResponseBuilder;
use crate::strategy::{MessageStrategy, StrategyRegistry};
use crate::token::TokenMinter;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Runs strategy selection, token minting, the backend call and response
/// assembly for one validated request.
pub struct MessageHandler {
    registry: Arc<StrategyRegistry>,
    minter: Arc<TokenMinter>,
    sender: BackendSender,
    responses: ResponseBuilder,
    base_url: String,
}

impl MessageHandler {
    pub fn new(
        registry: Arc<StrategyRegistry>,
        minter: Arc<TokenMinter>,
        sender: BackendSender,
        responses: ResponseBuilder,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            registry,
            minter,
            sender,
            responses,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Every outcome is an envelope; `Err` only when not even a rejection
    /// could be built.
    pub async fn handle(&self, request: HandlerRequest) -> Result<HandlerResponse, GatewayError> {
        let message_type = request.envelope.message_type();
        let Some(strategy) = self.registry.find(message_type) else {
            warn!(
                message_id = %request.envelope.id(),
                message_type = %message_type,
                "No strategy for message type"
            );
            return self.reject(RejectionReason::MessageTypeNotSupported, &request);
        };

        match self.dispatch(strategy, &request).await {
            Ok(payload) => {
                info!(
                    message_id = %request.envelope.id(),
                    pid = %request.pid,
                    strategy = strategy.name(),
                    "Message processed"
                );
                match self.responses.processed(&request.envelope, Some(payload)) {
                    Ok(response) => Ok(response),
                    Err(e) => {
                        error!(
                            message_id = %request.envelope.id(),
                            error = %e,
                            "Response assembly failed"
                        );
                        self.reject(RejectionReason::InternalRecipientError, &request)
                    }
                }
            }
            Err(reason) => self.reject(reason, &request),
        }
    }

    async fn dispatch(
        &self,
        strategy: &dyn MessageStrategy,
        request: &HandlerRequest,
    ) -> Result<serde_json::Value, RejectionReason> {
        let message_id = request.envelope.id();

        let service_token = self.minter.mint_service_token(&request.subject).map_err(|e| {
            error!(message_id = %message_id, error = %e, "Service token minting failed");
            RejectionReason::InternalRecipientError
        })?;

        let url = strategy.build_url(&self.base_url, request);
        let body = strategy.build_body(request);

        let bytes = self
            .sender
            .send(&url, &service_token, &body)
            .await
            .map_err(|e| match e {
                BackendError::Status(status) => strategy.reject_status(status),
                other => other.rejection_reason(),
            })?;

        let response = strategy.parse_response(&bytes).map_err(|e| {
            warn!(
                message_id = %message_id,
                strategy = strategy.name(),
                error = %e,
                "Backend response rejected"
            );
            RejectionReason::InternalRecipientError
        })?;

        serde_json::to_value(&response).map_err(|e| {
            error!(message_id = %message_id, error = %e, "Response payload encoding failed");
            RejectionReason::InternalRecipientError
        })
    }

    fn reject(
        &self,
        reason: RejectionReason,
        request: &HandlerRequest,
    ) -> Result<HandlerResponse, GatewayError> {
        self.responses
            .rejection_response(reason, &Correlation::from(&request.envelope))
            .map_err(|e| GatewayError::Internal(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendReply, BackendTransport};
    use crate::domain::config::{IdentityConfig, ServiceTokenConfig};
    use crate::domain::envelope::MessageType;
    use crate::domain::ids::IdGenerator;
    use crate::ports::FixedTimeSource;
    use crate::strategy::test_support::request;
    use crate::strategy::BackendBody;
    use crate::token::{GatewayIdentity, ServiceClaims};
    use async_trait::async_trait;
    use bytes::Bytes;
    use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
    use std::sync::Mutex;

    /// Records calls and answers with a canned reply
    struct CannedTransport {
        reply: Result<BackendReply, BackendError>,
        calls: Mutex<Vec<(String, String, serde_json::Value)>>,
    }

    impl CannedTransport {
        fn new(reply: Result<BackendReply, BackendError>) -> Arc<Self> {
            Arc::new(Self {
                reply,
                calls: Mutex::new(Vec::new()),
            })
        }

        fn ok(status: u16, body: &'static str) -> Arc<Self> {
            Self::new(Ok(BackendReply {
                status,
                body: Bytes::from_static(body.as_bytes()),
            }))
        }
    }

    #[async_trait]
    impl BackendTransport for CannedTransport {
        async fn post_json(
            &self,
            url: &str,
            service_token: &str,
            body: &BackendBody,
        ) -> Result<BackendReply, BackendError> {
            self.calls.lock().unwrap().push((
                url.to_string(),
                service_token.to_string(),
                serde_json::to_value(body).unwrap(),
            ));
            self.reply.clone()
        }
    }

    fn handler(transport: Arc<CannedTransport>) -> MessageHandler {
        let minter = Arc::new(TokenMinter::new(
            &ServiceTokenConfig::default(),
            Arc::new(FixedTimeSource(1_700_000_000)),
        ));
        let identity = Arc::new(GatewayIdentity::new(
            &IdentityConfig::default(),
            Arc::clone(&minter),
            IdGenerator::default(),
        ));
        MessageHandler::new(
            Arc::new(StrategyRegistry::with_defaults(false)),
            minter,
            BackendSender::new(transport),
            ResponseBuilder::new(identity),
            "http://ch:8000/",
        )
    }

    #[tokio::test]
    async fn test_log_round_trip() {
        let transport = CannedTransport::ok(201, r#"{"data": "receipt"}"#);
        let response = handler(Arc::clone(&transport))
            .handle(request(MessageType::LogMessage, Some("Hello World"), None))
            .await
            .unwrap();

        assert_eq!(
            response.header.message_type(),
            MessageType::ProcessedNotification
        );
        assert_eq!(response.header.correlation_message(), Some("urn:msg:7"));
        assert_eq!(response.payload.unwrap()["data"], "receipt");

        let calls = transport.calls.lock().unwrap();
        let (url, token, body) = &calls[0];
        assert_eq!(url, "http://ch:8000/messages/log/p-123");
        assert_eq!(body["payload"], "Hello World");

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.set_audience(&["1"]);
        let claims = decode::<ServiceClaims>(token, &DecodingKey::from_secret(b"123"), &validation)
            .unwrap()
            .claims;
        assert_eq!(claims.client_id, "caller");
        assert_eq!(claims.exp - claims.iat, 30);
    }

    #[tokio::test]
    async fn test_unsupported_type() {
        let transport = CannedTransport::ok(200, "{}");
        let response = handler(Arc::clone(&transport))
            .handle(request(MessageType::ResultMessage, None, None))
            .await
            .unwrap();
        assert_eq!(
            response.header.rejection_reason(),
            Some(RejectionReason::MessageTypeNotSupported)
        );
        assert!(transport.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_backend_failures_become_rejections() {
        let cases = [
            (CannedTransport::ok(500, "oops"), RejectionReason::InternalRecipientError),
            (CannedTransport::ok(404, ""), RejectionReason::NotFound),
            (CannedTransport::ok(200, ""), RejectionReason::InternalRecipientError),
            (CannedTransport::ok(200, "not json"), RejectionReason::InternalRecipientError),
            (
                CannedTransport::new(Err(BackendError::Transport("refused".into()))),
                RejectionReason::InternalRecipientError,
            ),
        ];
        for (transport, expected) in cases {
            let response = handler(transport)
                .handle(request(MessageType::LogMessage, Some("x"), None))
                .await
                .unwrap();
            assert_eq!(response.header.message_type(), MessageType::RejectionMessage);
            assert_eq!(response.header.rejection_reason(), Some(expected));
            assert_eq!(response.header.correlation_message(), Some("urn:msg:7"));
            assert!(response.payload.is_none());
        }
    }

    #[tokio::test]
    async fn test_create_process_returns_pid() {
        let transport = CannedTransport::ok(201, r#"{"pid": "p-123"}"#);
        let response = handler(Arc::clone(&transport))
            .handle(request(MessageType::RequestMessage, Some("{}"), None))
            .await
            .unwrap();
        assert_eq!(response.payload.unwrap(), serde_json::json!({"pid": "p-123"}));
        assert_eq!(
            transport.calls.lock().unwrap()[0].0,
            "http://ch:8000/process/p-123"
        );
    }
}
