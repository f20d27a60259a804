//! JSON body the Clearing House backend accepts.

use crate::domain::envelope::{Context, Envelope};
use crate::domain::request::HandlerRequest;
use serde::Serialize;

/// Flat header understood by the backend
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BackendHeader {
    #[serde(rename = "@context")]
    pub context: Context,
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "@type")]
    pub message_type: String,
    #[serde(rename = "securityToken")]
    pub security_token: BackendToken,
    #[serde(rename = "issuerConnector")]
    pub issuer_connector: String,
    #[serde(rename = "modelVersion")]
    pub model_version: String,
    pub issued: String,
    #[serde(rename = "senderAgent")]
    pub sender_agent: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BackendToken {
    #[serde(rename = "@type")]
    pub token_type: String,
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "tokenFormat", skip_serializing_if = "Option::is_none")]
    pub token_format: Option<TokenFormatRef>,
    #[serde(rename = "tokenValue")]
    pub token_value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TokenFormatRef {
    #[serde(rename = "@id")]
    pub id: String,
}

/// Request body of every backend call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BackendBody {
    pub header: BackendHeader,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
}

impl BackendHeader {
    pub fn from_envelope(envelope: &Envelope) -> Self {
        let security_token = match envelope.security_token() {
            Some(token) => BackendToken {
                token_type: token.token_type().to_string(),
                id: token.id().to_string(),
                token_format: Some(TokenFormatRef {
                    id: token.token_format().as_uri().to_string(),
                }),
                token_value: token.token_value().to_string(),
            },
            // validated envelopes always carry one
            None => BackendToken {
                token_type: crate::domain::envelope::DYNAMIC_ATTRIBUTE_TOKEN.to_string(),
                id: String::new(),
                token_format: None,
                token_value: String::new(),
            },
        };

        Self {
            context: envelope.context().clone(),
            id: envelope.id().to_string(),
            message_type: envelope.message_type().wire_name(),
            security_token,
            issuer_connector: envelope.issuer_connector().to_string(),
            model_version: envelope.model_version().to_string(),
            issued: envelope.issued().to_wire(),
            sender_agent: envelope.sender_agent().to_string(),
        }
    }
}

impl BackendBody {
    pub fn with_payload(request: &HandlerRequest) -> Self {
        Self {
            header: BackendHeader::from_envelope(&request.envelope),
            payload: request.payload.clone(),
        }
    }

    pub fn header_only(request: &HandlerRequest) -> Self {
        Self {
            header: BackendHeader::from_envelope(&request.envelope),
            payload: None,
        }
    }
}
