//! Validated requests and typed backend responses.

use crate::domain::envelope::Envelope;
use crate::domain::paging::Paging;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Inbound route a message was posted to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Log,
    CreateProcess,
    Query,
}

impl Route {
    /// Whether the route requires a payload part
    pub fn requires_payload(&self) -> bool {
        matches!(self, Route::Log | Route::CreateProcess)
    }

    /// Path prefix, shared by the gateway and the backend
    pub fn path(&self) -> &'static str {
        match self {
            Route::Log => "/messages/log",
            Route::CreateProcess => "/process",
            Route::Query => "/messages/query",
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// A request that passed the validation pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerRequest {
    pub pid: String,
    pub envelope: Envelope,
    pub payload: Option<String>,
    pub paging: Option<Paging>,
    /// `sub` claim of the verified caller token
    pub subject: String,
}

/// Outbound header plus optional payload
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerResponse {
    pub header: Envelope,
    pub payload: Option<serde_json::Value>,
}

/// Backend answer to a log request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingResponse {
    pub data: String,
}

/// Backend answer to a query request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    pub date_from: String,
    pub date_to: String,
    pub page: u32,
    pub size: u32,
    pub order: String,
    #[serde(default)]
    pub documents: Vec<serde_json::Value>,
}

/// Backend answer to a create-process request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateProcessResponse {
    pub pid: String,
}

/// Typed backend response, serialized as the outbound payload
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum BackendResponse {
    Logging(LoggingResponse),
    Query(QueryResponse),
    CreateProcess(CreateProcessResponse),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_requirement() {
        assert!(Route::Log.requires_payload());
        assert!(Route::CreateProcess.requires_payload());
        assert!(!Route::Query.requires_payload());
    }

    #[test]
    fn test_backend_response_serializes_untagged() {
        let response = BackendResponse::CreateProcess(CreateProcessResponse {
            pid: "p-123".into(),
        });
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            serde_json::json!({"pid": "p-123"})
        );
    }

    #[test]
    fn test_query_response_defaults_documents() {
        let parsed: QueryResponse = serde_json::from_value(serde_json::json!({
            "date_from": "2024-01-01",
            "date_to": "2024-01-02",
            "page": 1,
            "size": 10,
            "order": "asc"
        }))
        .unwrap();
        assert!(parsed.documents.is_empty());
    }
}
