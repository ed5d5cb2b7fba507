//! Auth token issuing and validation
//!
//! Tokens are HS256 JWTs carrying the user id plus issue and expiry times.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::AuthConfig;

/// Token claims
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub user_id: i64,
    /// Issued at (unix seconds)
    pub iat: i64,
    /// Expires at (unix seconds)
    pub exp: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("Token expired")]
    Expired,

    #[error("Invalid token")]
    Invalid,

    #[error("Failed to issue token: {0}")]
    Issue(String),
}

/// JWT token manager
pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl_seconds: i64,
}

impl JwtManager {
    pub fn new(secret: &str, ttl_seconds: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl_seconds,
        }
    }

    /// Build from configuration. Without a configured secret a random one is
    /// generated, so tokens do not survive a restart.
    pub fn from_config(config: &AuthConfig) -> Self {
        if config.jwt_secret.is_empty() {
            tracing::warn!(
                "No JWT secret configured; generated a random one. Sessions will not survive a restart."
            );
            let secret = format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple());
            Self::new(&secret, config.token_ttl_seconds)
        } else {
            Self::new(&config.jwt_secret, config.token_ttl_seconds)
        }
    }

    /// Token lifetime in seconds, also used as the cookie Max-Age
    pub fn ttl_seconds(&self) -> i64 {
        self.ttl_seconds
    }

    pub fn issue(&self, user_id: i64) -> Result<String, TokenError> {
        let now = Utc::now();
        let claims = Claims {
            user_id,
            iat: now.timestamp(),
            exp: (now + Duration::seconds(self.ttl_seconds)).timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Issue(e.to_string()))
    }

    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_issue_and_verify() {
        let manager = JwtManager::new("secret", 86400);
        let token = manager.issue(7).unwrap();
        let claims = manager.verify(&token).unwrap();
        assert_eq!(claims.user_id, 7);
        assert_eq!(claims.exp - claims.iat, 86400);
    }

    #[test]
    fn test_wrong_secret_is_invalid() {
        let token = JwtManager::new("one", 60).issue(1).unwrap();
        assert!(matches!(
            JwtManager::new("two", 60).verify(&token),
            Err(TokenError::Invalid)
        ));
    }

    #[test]
    fn test_expired_token() {
        let manager = JwtManager::new("secret", -3600);
        let token = manager.issue(1).unwrap();
        assert!(matches!(manager.verify(&token), Err(TokenError::Expired)));
    }

    #[test]
    fn test_garbage_is_invalid() {
        let manager = JwtManager::new("secret", 60);
        assert!(matches!(manager.verify("not.a.jwt"), Err(TokenError::Invalid)));
        assert!(matches!(manager.verify(""), Err(TokenError::Invalid)));
    }

    #[test]
    fn test_random_secret_when_unconfigured() {
        let config = AuthConfig {
            jwt_secret: String::new(),
            ..Default::default()
        };
        let a = JwtManager::from_config(&config);
        let b = JwtManager::from_config(&config);
        let token = a.issue(3).unwrap();
        assert!(a.verify(&token).is_ok());
        assert!(b.verify(&token).is_err());
    }

    #[test]
    fn test_claims_use_user_id_key() {
        let claims = Claims { user_id: 5, iat: 1, exp: 2 };
        let json = serde_json::to_value(&claims).unwrap();
        assert_eq!(json["userId"], 5);
    }

    proptest! {
        #[test]
        fn any_user_id_round_trips(id in 1i64..i64::MAX) {
            let manager = JwtManager::new("prop-secret", 300);
            let token = manager.issue(id).unwrap();
            prop_assert_eq!(manager.verify(&token).unwrap().user_id, id);
        }
    }
}
