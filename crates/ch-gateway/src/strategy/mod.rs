//! Dispatch and translation strategies.
//!
//! Each strategy owns one message type: how to address the backend, what
//! body to send and how to read the answer. The registry picks the first
//! strategy that accepts a type, so new strategies plug in without touching
//! the dispatch code.

pub mod body;
pub mod create_process;
pub mod log;
pub mod query;

pub use body::{BackendBody, BackendHeader, BackendToken};
pub use create_process::CreateProcessStrategy;
pub use log::LogStrategy;
pub use query::QueryStrategy;

use crate::domain::envelope::MessageType;
use crate::domain::error::BackendError;
use crate::domain::reason::RejectionReason;
use crate::domain::request::{BackendResponse, HandlerRequest};
use serde::de::DeserializeOwned;

/// Translation between a message type and a backend endpoint
pub trait MessageStrategy: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &'static str;

    fn can_handle(&self, message_type: MessageType) -> bool;

    /// Absolute backend URL for `request`.
    fn build_url(&self, base_url: &str, request: &HandlerRequest) -> String;

    fn build_body(&self, request: &HandlerRequest) -> BackendBody;

    /// Decode a successful backend answer.
    fn parse_response(&self, body: &[u8]) -> Result<BackendResponse, BackendError>;

    /// Reason reported for a non-success backend status.
    fn reject_status(&self, status: u16) -> RejectionReason {
        RejectionReason::from_backend_status(status)
    }
}

/// Ordered set of strategies
#[derive(Default)]
pub struct StrategyRegistry {
    strategies: Vec<Box<dyn MessageStrategy>>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Log, create-process and query strategies.
    pub fn with_defaults(legacy_page_param: bool) -> Self {
        Self::new()
            .register(LogStrategy)
            .register(CreateProcessStrategy)
            .register(QueryStrategy::new(legacy_page_param))
    }

    pub fn register(mut self, strategy: impl MessageStrategy + 'static) -> Self {
        self.strategies.push(Box::new(strategy));
        self
    }

    /// First strategy accepting `message_type`.
    pub fn find(&self, message_type: MessageType) -> Option<&dyn MessageStrategy> {
        self.strategies
            .iter()
            .find(|s| s.can_handle(message_type))
            .map(|s| s.as_ref())
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }
}

pub(crate) fn decode_json<T: DeserializeOwned>(body: &[u8]) -> Result<T, BackendError> {
    serde_json::from_slice(body).map_err(|e| BackendError::Decode(e.to_string()))
}
