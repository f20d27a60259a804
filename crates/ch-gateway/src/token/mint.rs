//! Minting of HS256 tokens for backend calls and gateway responses.

use crate::domain::config::ServiceTokenConfig;
use crate::domain::error::TokenError;
use crate::ports::TimeSource;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Audience of gateway identity tokens
pub const IDENTITY_AUDIENCE: &str = "idsc:IDS_CONNECTORS_ALL";

/// Claims of the `Ch-Service` token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceClaims {
    pub aud: String,
    pub iss: String,
    /// Subject of the verified caller token
    pub client_id: String,
    pub iat: u64,
    pub exp: u64,
}

/// Claims of the token the gateway presents in its own responses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityClaims {
    pub sub: String,
    pub iss: String,
    pub aud: String,
    pub iat: u64,
    pub nbf: u64,
    pub exp: u64,
}

/// Signs service and identity tokens with a shared secret
pub struct TokenMinter {
    audience: String,
    issuer: String,
    ttl_secs: u64,
    key: EncodingKey,
    clock: Arc<dyn TimeSource>,
}

impl TokenMinter {
    pub fn new(config: &ServiceTokenConfig, clock: Arc<dyn TimeSource>) -> Self {
        Self {
            audience: config.audience.clone(),
            issuer: config.issuer.clone(),
            ttl_secs: config.ttl.as_secs(),
            key: EncodingKey::from_secret(config.secret.as_bytes()),
            clock,
        }
    }

    /// Claims for a service token on behalf of `subject`.
    pub fn service_claims(&self, subject: &str) -> Result<ServiceClaims, TokenError> {
        let iat = self.clock.now();
        Ok(ServiceClaims {
            aud: self.audience.clone(),
            iss: self.issuer.clone(),
            client_id: subject.to_string(),
            iat,
            exp: self.expiry(iat)?,
        })
    }

    pub fn mint_service_token(&self, subject: &str) -> Result<String, TokenError> {
        self.sign(&self.service_claims(subject)?)
    }

    /// Token identifying the gateway connector itself.
    pub fn mint_identity_token(&self, connector_id: &str) -> Result<String, TokenError> {
        let iat = self.clock.now();
        self.sign(&IdentityClaims {
            sub: connector_id.to_string(),
            iss: connector_id.to_string(),
            aud: IDENTITY_AUDIENCE.to_string(),
            iat,
            nbf: iat,
            exp: self.expiry(iat)?,
        })
    }

    fn expiry(&self, iat: u64) -> Result<u64, TokenError> {
        iat.checked_add(self.ttl_secs).ok_or_else(|| {
            TokenError::Signing(format!("token lifetime of {}s overflows exp", self.ttl_secs))
        })
    }

    fn sign<T: Serialize>(&self, claims: &T) -> Result<String, TokenError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }
}
