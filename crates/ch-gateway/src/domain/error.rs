//! Gateway error types.
//!
//! Request-scoped errors end up as rejection envelopes; [`GatewayError`]
//! covers startup and serving failures of the process itself.

use crate::domain::reason::RejectionReason;

/// Header could not be turned into an envelope
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EnvelopeError {
    /// Not JSON, or a field of the wrong shape
    #[error("header is not a valid message: {0}")]
    Parse(String),

    /// Required field missing or blank
    #[error("required field `{0}` is missing")]
    MissingField(&'static str),

    /// Timestamp in neither RFC 3339 nor naive ISO form
    #[error("invalid timestamp `{0}`")]
    InvalidTimestamp(String),
}

/// Token inspection, verification and minting errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    /// Not a compact JWS, or claims are not JSON
    #[error("malformed token: {0}")]
    Malformed(String),

    #[error("JWT Token subject is missing")]
    MissingSubject,

    /// Token format other than JWT
    #[error("unsupported token format: {0}")]
    UnsupportedFormat(String),

    /// Signature, expiry or audience check failed
    #[error("token verification failed: {0}")]
    Verification(String),

    /// Service token could not be signed
    #[error("token signing failed: {0}")]
    Signing(String),
}

/// Backend call outcome other than a decodable success
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    /// Connection, timeout or protocol failure
    #[error("backend transport error: {0}")]
    Transport(String),

    /// Non-success HTTP status
    #[error("backend returned HTTP {0}")]
    Status(u16),

    /// Success status without a body
    #[error("backend returned an empty body")]
    EmptyBody,

    /// Body not of the expected shape
    #[error("backend response could not be decoded: {0}")]
    Decode(String),

    /// Request body could not be built
    #[error("backend request could not be encoded: {0}")]
    Encode(String),
}

impl BackendError {
    /// Reason reported to the caller for this failure.
    pub fn rejection_reason(&self) -> RejectionReason {
        match self {
            BackendError::Status(code) => RejectionReason::from_backend_status(*code),
            _ => RejectionReason::InternalRecipientError,
        }
    }
}

/// Process-level errors
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Server socket bind error
    #[error("server bind error: {0}")]
    Bind(String),

    /// Server terminated with an error
    #[error("server error: {0}")]
    Serve(String),

    /// Internal server error
    #[error("internal error: {0}")]
    Internal(String),
}
