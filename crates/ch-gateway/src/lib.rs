// Allow missing docs for internal items in development
#![allow(missing_docs)]

//! Clearing House Gateway - multipart front door of the Clearing House.
//!
//! Accepts IDS multipart messages from connectors, validates their headers
//! and caller tokens, and forwards them as JSON to the Clearing House backend.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────────┐
//! │                        CLEARING HOUSE GATEWAY                                │
//! ├─────────────────────────────────────────────────────────────────────────────┤
//! │  POST /messages/log/:pid   POST /process/:pid   POST /messages/query/:pid   │
//! │                       │                                                     │
//! │  ┌────────────────────┴───────────────────────┐                            │
//! │  │   Middleware: Tracing → RequestLimit        │                            │
//! │  └────────────────────┬───────────────────────┘                            │
//! │                       │  header / payload parts                             │
//! │  ┌────────────────────┴───────────────────────┐                            │
//! │  │   Validator (header, pid, paging, DAT)      │──▶ RejectionMessage        │
//! │  └────────────────────┬───────────────────────┘                            │
//! │                       │  HandlerRequest                                     │
//! │  ┌────────────────────┴───────────────────────┐                            │
//! │  │   MessageHandler → StrategyRegistry         │                            │
//! │  │   (log / create-process / query)            │                            │
//! │  └────────────────────┬───────────────────────┘                            │
//! │                       │  JSON + Ch-Service token                            │
//! └───────────────────────┼─────────────────────────────────────────────────────┘
//!                         ▼
//!                Clearing House backend
//! ```
//!
//! Every response is a multipart body with a `header` part and, on success,
//! a `payload` part. Validation failures answer 400/401/403; everything after
//! validation answers 201 with the outcome carried in the header.
//!
//! # Usage
//!
//! ```ignore
//! use ch_gateway::{GatewayConfig, GatewayService};
//!
//! let config = GatewayConfig::from_env()?;
//! GatewayService::new(config)?.serve().await?;
//! ```

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod backend;
pub mod domain;
pub mod handler;
pub mod middleware;
pub mod multipart;
pub mod pipeline;
pub mod ports;
pub mod response;
pub mod service;
pub mod strategy;
pub mod telemetry;
pub mod token;

// Re-exports for public API
pub use domain::config::GatewayConfig;
pub use domain::envelope::{Envelope, MessageType};
pub use domain::error::{BackendError, GatewayError, TokenError};
pub use domain::reason::RejectionReason;
pub use handler::MessageHandler;
pub use multipart::MultipartBody;
pub use service::GatewayService;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
