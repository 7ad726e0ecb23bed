//! Stateless HS256 access tokens binding a username to its global role.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::db::GlobalRole;

/// Minimum HMAC key length for HS256.
pub const MIN_SECRET_LEN: usize = 32;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // username
    pub role: GlobalRole,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("JWT secret must be at least {MIN_SECRET_LEN} bytes")]
    WeakSecret,
    #[error("invalid / expired token")]
    Invalid(#[source] jsonwebtoken::errors::Error),
    #[error("token encoding failed")]
    Encode(#[source] jsonwebtoken::errors::Error),
}

#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &[u8], ttl_secs: i64) -> Result<Self, TokenError> {
        if secret.len() < MIN_SECRET_LEN {
            return Err(TokenError::WeakSecret);
        }
        Ok(TokenService {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl: Duration::seconds(ttl_secs),
        })
    }

    /// Lifetime of freshly issued tokens, in seconds.
    pub fn ttl_secs(&self) -> i64 {
        self.ttl.num_seconds()
    }

    pub fn issue(&self, username: &str, role: GlobalRole) -> Result<String, TokenError> {
        let now = Utc::now();
        let claims = Claims {
            sub: username.to_owned(),
            role,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding).map_err(TokenError::Encode)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        decode::<Claims>(token, &self.decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(TokenError::Invalid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"0123456789abcdef0123456789abcdef";

    #[test]
    fn issue_then_verify() {
        let svc = TokenService::new(SECRET, 60).unwrap();
        let token = svc.issue("alice", GlobalRole::Admin).unwrap();
        let claims = svc.verify(&token).unwrap();
        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.role, GlobalRole::Admin);
        assert_eq!(claims.exp - claims.iat, 60);
    }

    #[test]
    fn short_secret_rejected() {
        assert!(matches!(
            TokenService::new(b"short", 60),
            Err(TokenError::WeakSecret)
        ));
    }

    #[test]
    fn expired_token_rejected() {
        // well past the default 60s validation leeway
        let svc = TokenService::new(SECRET, -3_600).unwrap();
        let token = svc.issue("bob", GlobalRole::User).unwrap();
        assert!(matches!(svc.verify(&token), Err(TokenError::Invalid(_))));
    }

    #[test]
    fn foreign_signature_rejected() {
        let ours = TokenService::new(SECRET, 60).unwrap();
        let theirs = TokenService::new(b"ffffffffffffffffffffffffffffffff", 60).unwrap();
        let token = theirs.issue("mallory", GlobalRole::Admin).unwrap();
        assert!(ours.verify(&token).is_err());
    }
}
