//! Rejection reasons carried by `ids:RejectionMessage` envelopes.
//!
//! Each reason serializes as a JSON-LD reference `{"@id": "<uri>"}` where the
//! URI is stable and shared with every other participant of the data space.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Namespace for rejection reason codes
pub const REASON_NAMESPACE: &str = "https://w3id.org/idsa/code/";

/// Closed set of rejection reasons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RejectionReason {
    BadParameters,
    InternalRecipientError,
    MalformedMessage,
    MessageTypeNotSupported,
    MethodNotSupported,
    NotAuthenticated,
    NotAuthorized,
    NotFound,
    TemporarilyNotAvailable,
    TooManyResults,
    VersionNotSupported,
}

impl RejectionReason {
    pub const ALL: [RejectionReason; 11] = [
        RejectionReason::BadParameters,
        RejectionReason::InternalRecipientError,
        RejectionReason::MalformedMessage,
        RejectionReason::MessageTypeNotSupported,
        RejectionReason::MethodNotSupported,
        RejectionReason::NotAuthenticated,
        RejectionReason::NotAuthorized,
        RejectionReason::NotFound,
        RejectionReason::TemporarilyNotAvailable,
        RejectionReason::TooManyResults,
        RejectionReason::VersionNotSupported,
    ];

    /// Upper snake case code, the last segment of the URI
    pub fn code(&self) -> &'static str {
        match self {
            RejectionReason::BadParameters => "BAD_PARAMETERS",
            RejectionReason::InternalRecipientError => "INTERNAL_RECIPIENT_ERROR",
            RejectionReason::MalformedMessage => "MALFORMED_MESSAGE",
            RejectionReason::MessageTypeNotSupported => "MESSAGE_TYPE_NOT_SUPPORTED",
            RejectionReason::MethodNotSupported => "METHOD_NOT_SUPPORTED",
            RejectionReason::NotAuthenticated => "NOT_AUTHENTICATED",
            RejectionReason::NotAuthorized => "NOT_AUTHORIZED",
            RejectionReason::NotFound => "NOT_FOUND",
            RejectionReason::TemporarilyNotAvailable => "TEMPORARILY_NOT_AVAILABLE",
            RejectionReason::TooManyResults => "TOO_MANY_RESULTS",
            RejectionReason::VersionNotSupported => "VERSION_NOT_SUPPORTED",
        }
    }

    pub fn uri(&self) -> String {
        format!("{}{}", REASON_NAMESPACE, self.code())
    }

    /// Resolve a reason from its full URI or bare code
    pub fn from_uri(value: &str) -> Option<Self> {
        let code = value.strip_prefix(REASON_NAMESPACE).unwrap_or(value);
        Self::ALL.iter().copied().find(|r| r.code() == code)
    }

    /// Map a non-success backend HTTP status onto a reason.
    pub fn from_backend_status(status: u16) -> Self {
        match status {
            400 => RejectionReason::BadParameters,
            401 => RejectionReason::NotAuthenticated,
            403 => RejectionReason::NotAuthorized,
            404 => RejectionReason::NotFound,
            405 => RejectionReason::MethodNotSupported,
            413 => RejectionReason::TooManyResults,
            429 | 503 => RejectionReason::TemporarilyNotAvailable,
            _ => RejectionReason::InternalRecipientError,
        }
    }
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Serialize, Deserialize)]
struct ReasonRef {
    #[serde(rename = "@id")]
    id: String,
}

impl Serialize for RejectionReason {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        ReasonRef { id: self.uri() }.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for RejectionReason {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let reference = ReasonRef::deserialize(deserializer)?;
        RejectionReason::from_uri(&reference.id).ok_or_else(|| {
            serde::de::Error::custom(format!("unknown rejection reason: {}", reference.id))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_uri() {
        assert_eq!(
            RejectionReason::MalformedMessage.uri(),
            "https://w3id.org/idsa/code/MALFORMED_MESSAGE"
        );
    }

    #[test]
    fn test_reason_serializes_as_reference() {
        let json = serde_json::to_value(RejectionReason::NotAuthenticated).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"@id": "https://w3id.org/idsa/code/NOT_AUTHENTICATED"})
        );
    }

    #[test]
    fn test_reason_from_uri_accepts_bare_code() {
        for reason in RejectionReason::ALL {
            assert_eq!(RejectionReason::from_uri(&reason.uri()), Some(reason));
            assert_eq!(RejectionReason::from_uri(reason.code()), Some(reason));
        }
        assert_eq!(RejectionReason::from_uri("NOPE"), None);
    }

    #[test]
    fn test_backend_status_mapping() {
        assert_eq!(
            RejectionReason::from_backend_status(500),
            RejectionReason::InternalRecipientError
        );
        assert_eq!(
            RejectionReason::from_backend_status(404),
            RejectionReason::NotFound
        );
        assert_eq!(
            RejectionReason::from_backend_status(503),
            RejectionReason::TemporarilyNotAvailable
        );
        assert_eq!(
            RejectionReason::from_backend_status(418),
            RejectionReason::InternalRecipientError
        );
    }
}
