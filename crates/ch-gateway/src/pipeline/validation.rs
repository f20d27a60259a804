//! Ordered validation of inbound multipart messages.
//!
//! | Step | Check                                   | Reason              | HTTP |
//! |------|-----------------------------------------|---------------------|------|
//! | 1    | pid present                             | MALFORMED_MESSAGE   | 400  |
//! | 2    | header present and parseable            | MALFORMED_MESSAGE   | 400  |
//! | 2a   | message type belongs to the route       | MALFORMED_MESSAGE   | 400  |
//! | 3    | required header fields                  | MALFORMED_MESSAGE   | 400  |
//! | 4    | security token present, JWT, non-empty  | NOT_AUTHENTICATED   | 401  |
//! | 5    | payload present on write routes         | MALFORMED_MESSAGE   | 400  |
//! | 6    | token subject, then signature           | NOT_AUTHENTICATED   | 403  |
//! | 7    | paging parameters on the query route    | BAD_PARAMETERS      | 400  |
//!
//! Steps 1, 2 and 2a reject without correlation; later steps address the
//! rejection to whatever the header revealed.

use crate::domain::envelope::{
    Correlation, EnvelopeBuilder, IssuedAt, PartialEnvelope, SecurityToken,
};
use crate::domain::ids::IdGenerator;
use crate::domain::paging::{Paging, PagingQuery};
use crate::domain::reason::RejectionReason;
use crate::domain::request::{HandlerRequest, Route};
use crate::token::{inspect, DatVerifier};
use axum::http::StatusCode;
use bytes::Bytes;
use std::sync::Arc;
use tracing::warn;

/// Raw parts of an inbound request
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub route: Route,
    pub pid: Option<String>,
    pub header: Option<Bytes>,
    pub payload: Option<String>,
    pub paging: PagingQuery,
    /// Query string that could not be decoded at all
    pub paging_error: Option<String>,
}

impl InboundMessage {
    pub fn new(route: Route, pid: Option<String>) -> Self {
        Self {
            route,
            pid,
            header: None,
            payload: None,
            paging: PagingQuery::default(),
            paging_error: None,
        }
    }
}

/// Validation failure, ready to be turned into a rejection envelope
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub reason: RejectionReason,
    pub status: StatusCode,
    pub correlation: Correlation,
    /// Log detail, never sent to the caller
    pub detail: String,
}

impl Rejection {
    pub fn new(
        reason: RejectionReason,
        status: StatusCode,
        correlation: Correlation,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            reason,
            status,
            correlation,
            detail: detail.into(),
        }
    }

    pub fn malformed(correlation: Correlation, detail: impl Into<String>) -> Self {
        Self::new(
            RejectionReason::MalformedMessage,
            StatusCode::BAD_REQUEST,
            correlation,
            detail,
        )
    }

    pub fn bad_parameters(correlation: Correlation, detail: impl Into<String>) -> Self {
        Self::new(
            RejectionReason::BadParameters,
            StatusCode::BAD_REQUEST,
            correlation,
            detail,
        )
    }

    /// Token absent or unusable
    pub fn unauthenticated(correlation: Correlation, detail: impl Into<String>) -> Self {
        Self::new(
            RejectionReason::NotAuthenticated,
            StatusCode::UNAUTHORIZED,
            correlation,
            detail,
        )
    }

    /// Token present but not trusted
    pub fn untrusted(correlation: Correlation, detail: impl Into<String>) -> Self {
        Self::new(
            RejectionReason::NotAuthenticated,
            StatusCode::FORBIDDEN,
            correlation,
            detail,
        )
    }
}

/// Validation pipeline; stateless across requests
pub struct Validator {
    verifier: Arc<dyn DatVerifier>,
    ids: IdGenerator,
}

impl Validator {
    pub fn new(verifier: Arc<dyn DatVerifier>, ids: IdGenerator) -> Self {
        Self { verifier, ids }
    }

    /// Run every check in order; the first failure wins.
    pub async fn validate(&self, inbound: InboundMessage) -> Result<HandlerRequest, Rejection> {
        let route = inbound.route;
        self.run(inbound).await.map_err(|rejection| {
            warn!(
                route = %route,
                reason = %rejection.reason,
                status = rejection.status.as_u16(),
                message_id = rejection.correlation.message_id.as_deref().unwrap_or("-"),
                detail = %rejection.detail,
                "Inbound message rejected"
            );
            rejection
        })
    }

    async fn run(&self, inbound: InboundMessage) -> Result<HandlerRequest, Rejection> {
        // 1. pid
        let pid = match inbound.pid.as_deref().map(str::trim) {
            Some(pid) if !pid.is_empty() => pid.to_string(),
            _ => return Err(Rejection::malformed(Correlation::none(), "missing pid")),
        };

        // 2. header
        let header = inbound
            .header
            .as_ref()
            .ok_or_else(|| Rejection::malformed(Correlation::none(), "missing header part"))?;
        let partial = PartialEnvelope::parse(header)
            .map_err(|e| Rejection::malformed(Correlation::none(), e.to_string()))?;

        // 2a. route ownership
        if let Some(owner) = partial.message_type.and_then(|t| t.route()) {
            if owner != inbound.route {
                return Err(Rejection::malformed(
                    Correlation::none(),
                    format!("message belongs to {}, posted to {}", owner, inbound.route),
                ));
            }
        }

        // 3. required fields
        let correlation = partial.correlation();
        if let Some(field) = partial.first_missing_field() {
            return Err(Rejection::malformed(
                correlation,
                format!("required field `{}` is missing", field),
            ));
        }
        if let Some(raw) = partial.issued.as_deref() {
            IssuedAt::parse(raw)
                .map_err(|e| Rejection::malformed(correlation.clone(), e.to_string()))?;
        }

        // 4. token shape
        let token = self.security_token(&partial, &correlation)?;

        // 5. payload
        let payload = inbound.payload.filter(|p| !p.is_empty());
        if inbound.route.requires_payload() && payload.is_none() {
            return Err(Rejection::malformed(correlation, "missing payload part"));
        }

        let envelope = EnvelopeBuilder::from_partial(&partial, || self.ids.generate("dat"))
            .and_then(|builder| builder.security_token(token.clone()).build())
            .map_err(|e| Rejection::malformed(correlation.clone(), e.to_string()))?;

        // 6. subject, then signature
        let inspected =
            inspect(&token).map_err(|e| Rejection::untrusted(correlation.clone(), e.to_string()))?;
        self.verifier
            .verify(&token, envelope.issuer_connector())
            .await
            .map_err(|e| Rejection::untrusted(correlation.clone(), e.to_string()))?;

        // 7. paging
        let paging = match inbound.route {
            Route::Query => {
                if let Some(error) = inbound.paging_error {
                    return Err(Rejection::bad_parameters(correlation, error));
                }
                Some(
                    Paging::parse(&inbound.paging).map_err(|e| {
                        Rejection::bad_parameters(correlation.clone(), e.to_string())
                    })?,
                )
            }
            _ => None,
        };

        Ok(HandlerRequest {
            pid,
            envelope,
            payload,
            paging,
            subject: inspected.subject,
        })
    }

    fn security_token(
        &self,
        partial: &PartialEnvelope,
        correlation: &Correlation,
    ) -> Result<SecurityToken, Rejection> {
        let raw = partial.security_token.as_ref().ok_or_else(|| {
            Rejection::unauthenticated(correlation.clone(), "missing security token")
        })?;
        let token = SecurityToken::from_partial(raw, || self.ids.generate("dat"))
            .map_err(|e| Rejection::unauthenticated(correlation.clone(), e.to_string()))?;
        if !token.token_format().is_jwt() {
            return Err(Rejection::unauthenticated(
                correlation.clone(),
                format!("unsupported token format {}", token.token_format().as_uri()),
            ));
        }
        Ok(token)
    }
}
