//! Request and response bodies for the secret endpoints.
//!
//! Bodies carrying secret material or passphrases deliberately have no
//! `Debug` impl so they cannot end up in logs.

use serde::{Deserialize, Serialize};
use vanish_core::{SecretKey, Timestamp};

/// Body of `POST /secret`.
#[derive(Clone, Serialize, Deserialize)]
pub struct CreateSecretRequest {
    pub secret: String,
    #[serde(default)]
    pub passphrase: Option<String>,
    /// Lifetime in seconds, materialized to an absolute expiration.
    #[serde(default)]
    pub ttl_seconds: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateSecretResponse {
    pub secret_key: SecretKey,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<Timestamp>,
    #[serde(default)]
    pub warnings: Vec<String>,
}

/// Body of a successful `GET /secret/{key}`.
#[derive(Clone, Serialize, Deserialize)]
pub struct RetrieveSecretResponse {
    pub secret: String,
}

/// Optional body of `DELETE /secret/{key}`.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct DeleteSecretRequest {
    #[serde(default)]
    pub passphrase: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteSecretResponse {
    pub status: String,
}

impl DeleteSecretResponse {
    pub fn deleted() -> Self {
        Self {
            status: "deleted".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_request_optional_fields() -> Result<(), serde_json::Error> {
        let req: CreateSecretRequest = serde_json::from_str(r#"{"secret":"Meow"}"#)?;
        assert_eq!(req.secret, "Meow");
        assert!(req.passphrase.is_none());
        assert!(req.ttl_seconds.is_none());

        let req: CreateSecretRequest =
            serde_json::from_str(r#"{"secret":"Meow","passphrase":"pw","ttl_seconds":300}"#)?;
        assert_eq!(req.passphrase.as_deref(), Some("pw"));
        assert_eq!(req.ttl_seconds, Some(300));
        Ok(())
    }

    #[test]
    fn test_create_response_omits_missing_expiry() -> Result<(), serde_json::Error> {
        let resp = CreateSecretResponse {
            secret_key: SecretKey::generate(),
            expires_at: None,
            warnings: vec![],
        };
        let json = serde_json::to_value(&resp)?;
        assert!(json.get("expires_at").is_none());
        assert!(json["warnings"].as_array().is_some_and(|w| w.is_empty()));
        assert_eq!(json["secret_key"], resp.secret_key.to_string());
        Ok(())
    }
}
