//! Outbound envelopes: processed notifications and rejections.

use crate::domain::envelope::{Correlation, Envelope, IssuedAt, MessageType};
use crate::domain::error::{EnvelopeError, TokenError};
use crate::domain::reason::RejectionReason;
use crate::domain::request::HandlerResponse;
use crate::token::GatewayIdentity;
use std::sync::Arc;

/// Failure to assemble an outbound envelope
#[derive(Debug, thiserror::Error)]
pub enum ResponseError {
    #[error(transparent)]
    Token(#[from] TokenError),
    #[error(transparent)]
    Envelope(#[from] EnvelopeError),
}

/// Builds envelopes issued by the gateway
#[derive(Clone)]
pub struct ResponseBuilder {
    identity: Arc<GatewayIdentity>,
}

impl ResponseBuilder {
    pub fn new(identity: Arc<GatewayIdentity>) -> Self {
        Self { identity }
    }

    /// `ids:MessageProcessedNotificationMessage` answering `inbound`.
    pub fn processed(
        &self,
        inbound: &Envelope,
        payload: Option<serde_json::Value>,
    ) -> Result<HandlerResponse, ResponseError> {
        let header = Envelope::builder()
            .id(self.identity.ids().generate("messageProcessedNotificationMessage"))
            .message_type(MessageType::ProcessedNotification)
            .security_token(self.identity.security_token()?)
            .issuer_connector(self.identity.connector_id())
            .sender_agent(self.identity.connector_id())
            .model_version(self.identity.model_version())
            .issued(IssuedAt::now())
            .recipient_connector(inbound.issuer_connector())
            .recipient_agent(inbound.sender_agent())
            .correlation_message(inbound.id())
            .build()?;
        Ok(HandlerResponse { header, payload })
    }

    /// `ids:RejectionMessage`, addressed to whatever `correlation` knows.
    pub fn rejection(
        &self,
        reason: RejectionReason,
        correlation: &Correlation,
    ) -> Result<Envelope, ResponseError> {
        let mut builder = Envelope::builder()
            .id(self.identity.ids().generate("rejectionMessage"))
            .message_type(MessageType::RejectionMessage)
            .issuer_connector(self.identity.connector_id())
            .sender_agent(self.identity.connector_id())
            .model_version(self.identity.model_version())
            .issued(IssuedAt::now())
            .rejection_reason(reason);
        if let Some(issuer) = &correlation.issuer_connector {
            builder = builder.recipient_connector(issuer);
        }
        if let Some(agent) = &correlation.sender_agent {
            builder = builder.recipient_agent(agent);
        }
        if let Some(id) = &correlation.message_id {
            builder = builder.correlation_message(id);
        }
        Ok(builder.build()?)
    }

    pub fn rejection_response(
        &self,
        reason: RejectionReason,
        correlation: &Correlation,
    ) -> Result<HandlerResponse, ResponseError> {
        Ok(HandlerResponse {
            header: self.rejection(reason, correlation)?,
            payload: None,
        })
    }
}
