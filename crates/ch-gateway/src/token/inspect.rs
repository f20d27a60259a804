//! Structural inspection of caller tokens.
//!
//! Decodes the claims segment of a compact JWS without checking the
//! signature. Cryptographic checks live in [`super::verify`].

use crate::domain::envelope::SecurityToken;
use crate::domain::error::TokenError;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde_json::{Map, Value};

/// Claims read from an unverified token
#[derive(Debug, Clone, PartialEq)]
pub struct InspectedToken {
    pub subject: String,
    pub claims: Map<String, Value>,
}

/// Check the token format and read its subject.
pub fn inspect(token: &SecurityToken) -> Result<InspectedToken, TokenError> {
    if !token.token_format().is_jwt() {
        return Err(TokenError::UnsupportedFormat(
            token.token_format().as_uri().to_string(),
        ));
    }
    inspect_value(token.token_value())
}

/// Decode the claims of a compact JWS and require a `sub` claim.
pub fn inspect_value(token_value: &str) -> Result<InspectedToken, TokenError> {
    let claims = decode_claims(token_value)?;
    let subject = claims
        .get("sub")
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .ok_or(TokenError::MissingSubject)?
        .to_string();
    Ok(InspectedToken { subject, claims })
}

/// Claims object of a compact JWS, signature ignored.
pub fn decode_claims(token_value: &str) -> Result<Map<String, Value>, TokenError> {
    let segments: Vec<&str> = token_value.trim().split('.').collect();
    if segments.len() != 3 || segments.iter().take(2).any(|s| s.is_empty()) {
        return Err(TokenError::Malformed(format!(
            "expected 3 segments, found {}",
            segments.len()
        )));
    }

    let raw = URL_SAFE_NO_PAD
        .decode(segments[1].trim_end_matches('='))
        .map_err(|e| TokenError::Malformed(format!("claims are not base64url: {}", e)))?;

    match serde_json::from_slice::<Value>(&raw) {
        Ok(Value::Object(claims)) => Ok(claims),
        Ok(_) => Err(TokenError::Malformed("claims are not a JSON object".into())),
        Err(e) => Err(TokenError::Malformed(format!("claims are not JSON: {}", e))),
    }
}


#[cfg(test)]
mod tests {
    use super::test_tokens::unsigned;
    use super::*;
    use serde_json::json;

    #[test]
    fn test_subject_is_extracted() {
        let token = unsigned(json!({"sub": "connector-a", "scope": "ids_connector_attributes"}));
        let inspected = inspect_value(&token).unwrap();
        assert_eq!(inspected.subject, "connector-a");
        assert_eq!(
            inspected.claims.get("scope"),
            Some(&json!("ids_connector_attributes"))
        );
    }

    #[test]
    fn test_missing_subject() {
        let token = unsigned(json!({"iss": "daps"}));
        assert_eq!(inspect_value(&token), Err(TokenError::MissingSubject));
    }

    #[test]
    fn test_inspection_is_idempotent() {
        let token = unsigned(json!({"sub": "connector-b"}));
        assert_eq!(inspect_value(&token), inspect_value(&token));
    }

    #[test]
    fn test_malformed_tokens() {
        for bad in ["", "abc", "a.b", "a..c", "a.!!!.c"] {
            assert!(
                matches!(inspect_value(bad), Err(TokenError::Malformed(_))),
                "{bad:?} should be malformed"
            );
        }
        let not_object = format!("x.{}.y", URL_SAFE_NO_PAD.encode("[1,2]"));
        assert!(matches!(
            inspect_value(&not_object),
            Err(TokenError::Malformed(_))
        ));
    }

    #[test]
    fn test_non_jwt_format_rejected() {
        let partial = crate::domain::envelope::PartialSecurityToken {
            token_format: Some("idsc:OTHER".into()),
            token_value: Some(unsigned(json!({"sub": "x"}))),
            ..Default::default()
        };
        let token = SecurityToken::from_partial(&partial, || "urn:t".into()).unwrap();
        assert!(matches!(
            inspect(&token),
            Err(TokenError::UnsupportedFormat(_))
        ));
    }
}
