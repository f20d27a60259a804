//! Inbound validation pipeline.

pub mod validation;

pub use validation::{InboundMessage, Rejection, Validator};
