//! Token bridge.
//!
//! ```text
//! caller DAT ──▶ inspect (structural, `sub`) ──▶ DatVerifier (signature)
//!                                │
//!                                ▼
//!                 TokenMinter ──▶ Ch-Service token (aud, iss, client_id, iat, exp)
//! ```
//!
//! The two inbound steps stay separate so either can be exercised alone.

pub mod identity;
pub mod inspect;
pub mod mint;
pub mod verify;

pub use identity::GatewayIdentity;
pub use inspect::{decode_claims, inspect, inspect_value, InspectedToken};
pub use mint::{IdentityClaims, ServiceClaims, TokenMinter, IDENTITY_AUDIENCE};
pub use verify::{verifier_from_config, DatVerifier, SharedSecretVerifier, StructuralOnlyVerifier};
