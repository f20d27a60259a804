//! `ids:LogMessage` → `POST {base}/messages/log/{pid}`

use super::{decode_json, BackendBody, MessageStrategy};
use crate::domain::envelope::MessageType;
use crate::domain::error::BackendError;
use crate::domain::request::{BackendResponse, HandlerRequest, LoggingResponse};

pub struct LogStrategy;

impl MessageStrategy for LogStrategy {
    fn name(&self) -> &'static str {
        "log"
    }

    fn can_handle(&self, message_type: MessageType) -> bool {
        message_type == MessageType::LogMessage
    }

    fn build_url(&self, base_url: &str, request: &HandlerRequest) -> String {
        format!("{}/messages/log/{}", base_url, request.pid)
    }

    fn build_body(&self, request: &HandlerRequest) -> BackendBody {
        BackendBody::with_payload(request)
    }

    fn parse_response(&self, body: &[u8]) -> Result<BackendResponse, BackendError> {
        decode_json::<LoggingResponse>(body).map(BackendResponse::Logging)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::test_support::request;

    #[test]
    fn test_url() {
        let req = request(MessageType::LogMessage, Some("Hello World"), None);
        assert_eq!(
            LogStrategy.build_url("http://ch:8000", &req),
            "http://ch:8000/messages/log/p-123"
        );
    }

    #[test]
    fn test_body_carries_header_and_payload() {
        let req = request(MessageType::LogMessage, Some("Hello World"), None);
        let body = serde_json::to_value(LogStrategy.build_body(&req)).unwrap();

        assert_eq!(body["payload"], "Hello World");
        let header = &body["header"];
        assert_eq!(header["@type"], "ids:LogMessage");
        assert_eq!(header["@id"], "urn:msg:7");
        assert_eq!(header["issuerConnector"], "https://caller.example.com");
        assert_eq!(header["senderAgent"], "https://caller.example.com/agent");
        assert_eq!(header["modelVersion"], "4.1.0");
        assert_eq!(header["issued"], "2024-03-01T12:00:00.000Z");
        assert_eq!(header["@context"]["ids"], "https://w3id.org/idsa/core/");
        assert_eq!(header["securityToken"]["tokenValue"], "h.c.s");
        assert_eq!(header["securityToken"]["tokenFormat"]["@id"], "idsc:JWT");
        assert_eq!(header["securityToken"]["@type"], "ids:DynamicAttributeToken");
    }

    #[test]
    fn test_parse_response() {
        let parsed = LogStrategy
            .parse_response(br#"{"data": "receipt-jws"}"#)
            .unwrap();
        assert_eq!(
            parsed,
            BackendResponse::Logging(LoggingResponse {
                data: "receipt-jws".into()
            })
        );
        assert!(matches!(
            LogStrategy.parse_response(br#"{"pid": "x"}"#),
            Err(BackendError::Decode(_))
        ));
    }
}
