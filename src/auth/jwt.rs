//! Bearer token signing and verification (HS256).

use crate::auth::Role;
use crate::error::AppError;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    #[serde(rename = "userId")]
    pub user_id: i64,
    pub username: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    expires_in: Duration,
}

impl JwtKeys {
    pub fn new(secret: &[u8], expires_in: Duration) -> Self {
        JwtKeys {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            expires_in,
        }
    }

    /// Issue a token for the user, expiring after the configured lifetime.
    pub fn sign(&self, user_id: i64, username: &str, role: Role) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = Claims {
            user_id,
            username: username.to_string(),
            role,
            iat: now.timestamp(),
            exp: (now + self.expires_in).timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| AppError::Internal(format!("token signing failed: {e}")))
    }

    /// Decode and validate a token; expiry and signature failures both come
    /// back as 401 with distinct messages.
    pub fn verify(&self, token: &str) -> Result<Claims, AppError> {
        decode::<Claims>(token, &self.decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    AppError::Unauthorized("Token expired".into())
                }
                _ => AppError::Unauthorized("Invalid token".into()),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(expires_in: Duration) -> JwtKeys {
        JwtKeys::new(b"test-secret", expires_in)
    }

    #[test]
    fn sign_verify_round_trip() {
        let keys = keys(Duration::hours(1));
        let token = keys.sign(42, "alice", Role::Admin).unwrap();
        let claims = keys.verify(&token).unwrap();
        assert_eq!(claims.user_id, 42);
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.role, Role::Admin);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn claims_serialize_with_camel_case_user_id() {
        let claims = Claims {
            user_id: 7,
            username: "bob".into(),
            role: Role::User,
            iat: 0,
            exp: 1,
        };
        let v = serde_json::to_value(&claims).unwrap();
        assert_eq!(v["userId"], 7);
        assert_eq!(v["role"], "user");
    }

    #[test]
    fn expired_token_is_rejected() {
        // jsonwebtoken's default validation allows 60s leeway, so back-date
        // well past it.
        let keys = keys(Duration::seconds(-300));
        let token = keys.sign(1, "alice", Role::User).unwrap();
        let err = keys.verify(&token).unwrap_err();
        assert_eq!(err.to_string(), "Token expired");
    }

    #[test]
    fn tampered_token_is_rejected() {
        let keys = keys(Duration::hours(1));
        let other = JwtKeys::new(b"other-secret", Duration::hours(1));
        let token = other.sign(1, "alice", Role::User).unwrap();
        let err = keys.verify(&token).unwrap_err();
        assert_eq!(err.to_string(), "Invalid token");
    }
}
