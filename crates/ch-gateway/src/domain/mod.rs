//! Domain types for the gateway.
//!
//! Envelopes, requests, paging, rejection reasons, configuration and errors.
//! Nothing in here performs I/O.

pub mod config;
pub mod envelope;
pub mod error;
pub mod ids;
pub mod paging;
pub mod reason;
pub mod request;

// Re-exports for convenience
pub use config::{ConfigError, Environment, GatewayConfig, LimitsConfig};
pub use envelope::{
    Context, Correlation, Envelope, EnvelopeBuilder, IssuedAt, MessageType, PartialEnvelope,
    SecurityToken, TokenFormat,
};
pub use error::{BackendError, EnvelopeError, GatewayError, TokenError};
pub use ids::IdGenerator;
pub use paging::{Paging, PagingQuery, Sort};
pub use reason::RejectionReason;
pub use request::{
    BackendResponse, CreateProcessResponse, HandlerRequest, HandlerResponse, LoggingResponse,
    QueryResponse, Route,
};
