//! Signed HS256 access/refresh tokens.

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub iat: i64,
    pub exp: i64,
    /// Unique per issued token, so two tokens minted in the same second still differ.
    pub jti: String,
}

#[derive(Debug, Error, PartialEq)]
pub enum TokenError {
    #[error("token expired")]
    Expired,
    #[error("invalid token signature")]
    InvalidSignature,
    #[error("malformed token: {0}")]
    Malformed(String),
    #[error("token encoding failed: {0}")]
    Encoding(String),
}

/// Sign a token for `user_id` valid for `ttl`.
pub fn sign(user_id: Uuid, secret: &str, ttl: Duration) -> Result<String, TokenError> {
    let now = Utc::now();
    let claims = Claims {
        sub: user_id,
        iat: now.timestamp(),
        exp: (now + ttl).timestamp(),
        jti: Uuid::new_v4().to_string(),
    };
    encode(&Header::new(Algorithm::HS256), &claims, &EncodingKey::from_secret(secret.as_bytes()))
        .map_err(|e| TokenError::Encoding(e.to_string()))
}

/// Check signature and expiry; returns the embedded claims.
pub fn verify(token: &str, secret: &str) -> Result<Claims, TokenError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            ErrorKind::InvalidSignature => TokenError::InvalidSignature,
            _ => TokenError::Malformed(e.to_string()),
        })
}

/// Secrets and lifetimes for both token kinds.
#[derive(Clone)]
pub struct TokenIssuer {
    access_secret: String,
    refresh_secret: String,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenIssuer {
    pub fn new(access_secret: impl Into<String>, refresh_secret: impl Into<String>, access_ttl: Duration, refresh_ttl: Duration) -> Self {
        Self {
            access_secret: access_secret.into(),
            refresh_secret: refresh_secret.into(),
            access_ttl,
            refresh_ttl,
        }
    }

    pub fn from_config(cfg: &configs::AuthConfig) -> Self {
        Self::new(
            cfg.access_token_secret.clone(),
            cfg.refresh_token_secret.clone(),
            Duration::minutes(cfg.access_token_ttl_mins),
            Duration::days(cfg.refresh_token_ttl_days),
        )
    }

    pub fn issue_access_token(&self, user_id: Uuid) -> Result<String, TokenError> {
        sign(user_id, &self.access_secret, self.access_ttl)
    }

    pub fn issue_refresh_token(&self, user_id: Uuid) -> Result<String, TokenError> {
        sign(user_id, &self.refresh_secret, self.refresh_ttl)
    }

    pub fn verify_access(&self, token: &str) -> Result<Claims, TokenError> {
        verify(token, &self.access_secret)
    }

    pub fn verify_refresh(&self, token: &str) -> Result<Claims, TokenError> {
        verify(token, &self.refresh_secret)
    }

    pub fn access_ttl(&self) -> Duration { self.access_ttl }

    pub fn refresh_ttl(&self) -> Duration { self.refresh_ttl }
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issuer() -> TokenIssuer {
        TokenIssuer::new("access-secret", "refresh-secret", Duration::minutes(15), Duration::days(7))
    }

    #[test]
    fn access_token_round_trip_embeds_user() {
        let id = Uuid::new_v4();
        let t = issuer().issue_access_token(id).unwrap();
        let claims = issuer().verify_access(&t).unwrap();
        assert_eq!(claims.sub, id);
        assert_eq!(claims.exp - claims.iat, 15 * 60);
    }

    #[test]
    fn refresh_token_does_not_verify_as_access() {
        let t = issuer().issue_refresh_token(Uuid::new_v4()).unwrap();
        assert_eq!(issuer().verify_access(&t), Err(TokenError::InvalidSignature));
        assert!(issuer().verify_refresh(&t).is_ok());
    }

    #[test]
    fn expired_token_is_reported_as_expired() {
        let t = sign(Uuid::new_v4(), "s", Duration::minutes(-5)).unwrap();
        assert_eq!(verify(&t, "s"), Err(TokenError::Expired));
    }

    #[test]
    fn garbage_is_malformed() {
        assert!(matches!(verify("not.a.jwt", "s"), Err(TokenError::Malformed(_))));
    }

    #[test]
    fn tokens_issued_back_to_back_differ() {
        let id = Uuid::new_v4();
        assert_ne!(issuer().issue_refresh_token(id).unwrap(), issuer().issue_refresh_token(id).unwrap());
    }
}
