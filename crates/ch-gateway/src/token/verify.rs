//! Delegated verification of caller tokens.

use crate::domain::config::DatConfig;
use crate::domain::envelope::SecurityToken;
use crate::domain::error::TokenError;
use async_trait::async_trait;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use std::sync::Arc;
use tracing::{debug, warn};

/// Cryptographic check of a caller token
#[async_trait]
pub trait DatVerifier: Send + Sync {
    /// Verify `token`, presented on behalf of `issuer_connector`.
    async fn verify(&self, token: &SecurityToken, issuer_connector: &str)
        -> Result<(), TokenError>;
}

/// HS256 signature, expiry and optional audience check
pub struct SharedSecretVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl SharedSecretVerifier {
    pub fn new(secret: &str, audience: Option<&str>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        match audience {
            Some(aud) => validation.set_audience(&[aud]),
            None => validation.validate_aud = false,
        }
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }
}

#[async_trait]
impl DatVerifier for SharedSecretVerifier {
    async fn verify(
        &self,
        token: &SecurityToken,
        issuer_connector: &str,
    ) -> Result<(), TokenError> {
        decode::<serde_json::Value>(token.token_value(), &self.key, &self.validation)
            .map(|_| debug!(issuer = %issuer_connector, "caller token verified"))
            .map_err(|e| TokenError::Verification(e.to_string()))
    }
}

/// Accepts every structurally valid token. Development only.
#[derive(Debug, Default)]
pub struct StructuralOnlyVerifier;

#[async_trait]
impl DatVerifier for StructuralOnlyVerifier {
    async fn verify(
        &self,
        _token: &SecurityToken,
        issuer_connector: &str,
    ) -> Result<(), TokenError> {
        warn!(issuer = %issuer_connector, "caller token accepted without signature check");
        Ok(())
    }
}

/// Verifier selected by configuration
pub fn verifier_from_config(config: &DatConfig) -> Arc<dyn DatVerifier> {
    match &config.secret {
        Some(secret) => Arc::new(SharedSecretVerifier::new(
            secret,
            config.audience.as_deref(),
        )),
        None => Arc::new(StructuralOnlyVerifier),
    }
}
