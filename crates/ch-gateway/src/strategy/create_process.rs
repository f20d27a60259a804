//! `ids:RequestMessage` → `POST {base}/process/{pid}`

use super::{decode_json, BackendBody, MessageStrategy};
use crate::domain::envelope::MessageType;
use crate::domain::error::BackendError;
use crate::domain::request::{BackendResponse, CreateProcessResponse, HandlerRequest};

pub struct CreateProcessStrategy;

impl MessageStrategy for CreateProcessStrategy {
    fn name(&self) -> &'static str {
        "create-process"
    }

    fn can_handle(&self, message_type: MessageType) -> bool {
        message_type == MessageType::RequestMessage
    }

    fn build_url(&self, base_url: &str, request: &HandlerRequest) -> String {
        format!("{}/process/{}", base_url, request.pid)
    }

    fn build_body(&self, request: &HandlerRequest) -> BackendBody {
        BackendBody::with_payload(request)
    }

    fn parse_response(&self, body: &[u8]) -> Result<BackendResponse, BackendError> {
        decode_json::<CreateProcessResponse>(body).map(BackendResponse::CreateProcess)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::test_support::request;

    #[test]
    fn test_url_and_body() {
        let req = request(
            MessageType::RequestMessage,
            Some(r#"{"owners": ["https://other"]}"#),
            None,
        );
        assert_eq!(
            CreateProcessStrategy.build_url("http://ch", &req),
            "http://ch/process/p-123"
        );
        let body = serde_json::to_value(CreateProcessStrategy.build_body(&req)).unwrap();
        assert_eq!(body["header"]["@type"], "ids:RequestMessage");
        assert_eq!(body["payload"], r#"{"owners": ["https://other"]}"#);
    }

    #[test]
    fn test_parse_pid() {
        let parsed = CreateProcessStrategy
            .parse_response(br#"{"pid": "p-123"}"#)
            .unwrap();
        assert_eq!(
            parsed,
            BackendResponse::CreateProcess(CreateProcessResponse {
                pid: "p-123".into()
            })
        );
    }
}
