//! Middleware stack for the gateway.
//!
//! Layer order: Request → Tracing → RequestLimit → Handler

pub mod limits;
pub mod tracing;

pub use self::limits::RequestLimitLayer;
pub use self::tracing::TracingLayer;
