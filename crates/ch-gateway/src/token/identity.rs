//! Identity the gateway presents on outbound envelopes.

use crate::domain::config::IdentityConfig;
use crate::domain::envelope::SecurityToken;
use crate::domain::error::TokenError;
use crate::domain::ids::IdGenerator;
use crate::token::mint::TokenMinter;
use std::sync::Arc;

/// Connector id, model version and response token source
pub struct GatewayIdentity {
    connector_id: String,
    model_version: String,
    static_token: Option<String>,
    minter: Arc<TokenMinter>,
    ids: IdGenerator,
}

impl GatewayIdentity {
    pub fn new(config: &IdentityConfig, minter: Arc<TokenMinter>, ids: IdGenerator) -> Self {
        Self {
            connector_id: config.connector_id.clone(),
            model_version: config.model_version.clone(),
            static_token: config.identity_token.clone(),
            minter,
            ids,
        }
    }

    pub fn connector_id(&self) -> &str {
        &self.connector_id
    }

    pub fn model_version(&self) -> &str {
        &self.model_version
    }

    pub fn ids(&self) -> &IdGenerator {
        &self.ids
    }

    /// Configured static token, or a freshly minted identity token.
    pub fn security_token(&self) -> Result<SecurityToken, TokenError> {
        let value = match &self.static_token {
            Some(token) => token.clone(),
            None => self.minter.mint_identity_token(&self.connector_id)?,
        };
        Ok(SecurityToken::jwt(self.ids.generate("dat"), value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::config::ServiceTokenConfig;
    use crate::ports::FixedTimeSource;
    use crate::token::inspect::inspect_value;

    fn minter() -> Arc<TokenMinter> {
        Arc::new(TokenMinter::new(
            &ServiceTokenConfig::default(),
            Arc::new(FixedTimeSource(1_700_000_000)),
        ))
    }

    #[test]
    fn test_minted_identity_token_names_connector() {
        let identity = GatewayIdentity::new(&IdentityConfig::default(), minter(), IdGenerator::default());
        let token = identity.security_token().unwrap();
        assert!(token.token_format().is_jwt());
        assert!(token.id().starts_with("https://w3id.org/idsa/autogen/dat/"));
        let inspected = inspect_value(token.token_value()).unwrap();
        assert_eq!(inspected.subject, identity.connector_id());
    }

    #[test]
    fn test_static_token_wins() {
        let config = IdentityConfig {
            identity_token: Some("static.identity.token".into()),
            ..IdentityConfig::default()
        };
        let identity = GatewayIdentity::new(&config, minter(), IdGenerator::default());
        assert_eq!(
            identity.security_token().unwrap().token_value(),
            "static.identity.token"
        );
    }
}
