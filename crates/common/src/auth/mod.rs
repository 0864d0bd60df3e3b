//! Authentication and authorization utilities
//!
//! Provides:
//! - Access token generation and validation
//! - Emailed confirmation codes
//! - Role-based permission policies

pub mod confirmation;
pub mod policy;

pub use confirmation::ConfirmationCodes;
pub use policy::{Actor, Decision};

use crate::db::models::User;
use crate::errors::{AppError, Result};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// `token_type` carried by every token this service issues
pub const ACCESS_TOKEN_TYPE: &str = "access";

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject (user ID)
    pub sub: String,

    pub username: String,

    pub token_type: String,

    /// Unique token ID
    pub jti: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl AccessClaims {
    /// The user id in `sub`
    pub fn user_id(&self) -> Result<i32> {
        self.sub.parse().map_err(|_| AppError::InvalidToken)
    }
}

/// JWT token manager
pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiration_secs: i64,
}

impl JwtManager {
    /// Create a new JWT manager with the given secret
    pub fn new(secret: &str, expiration_secs: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            expiration_secs: expiration_secs as i64,
        }
    }

    /// Issue an access token for a user
    pub fn generate_token(&self, user: &User) -> Result<String> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.expiration_secs);

        let claims = AccessClaims {
            sub: user.id.to_string(),
            username: user.username.clone(),
            token_type: ACCESS_TOKEN_TYPE.to_string(),
            jti: Uuid::new_v4().simple().to_string(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(|e| AppError::Internal {
            message: format!("Failed to generate token: {}", e),
        })
    }

    /// Validate and decode an access token
    pub fn validate_token(&self, token: &str) -> Result<AccessClaims> {
        let claims = decode::<AccessClaims>(token, &self.decoding_key, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AppError::ExpiredToken,
                _ => AppError::InvalidToken,
            })?;

        if claims.token_type != ACCESS_TOKEN_TYPE {
            return Err(AppError::InvalidToken);
        }
        Ok(claims)
    }
}

/// Extract the token from an `Authorization: Bearer ...` header value
pub fn extract_bearer(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{AuthState, Role};

    pub(crate) fn sample_user() -> User {
        User {
            id: 7,
            username: "critic".to_string(),
            email: "critic@example.com".to_string(),
            role: Role::User,
            bio: None,
            first_name: String::new(),
            last_name: String::new(),
            is_staff: false,
            auth_state: AuthState::Pending,
            last_login: None,
            date_joined: Utc::now(),
        }
    }

    #[test]
    fn test_extract_bearer() {
        assert_eq!(extract_bearer("Bearer abc.def"), Some("abc.def"));
        assert_eq!(extract_bearer("Bearer "), None);
        assert_eq!(extract_bearer("abc.def"), None);
        assert_eq!(extract_bearer("Basic abc"), None);
    }

    #[test]
    fn test_jwt_roundtrip() {
        let manager = JwtManager::new("test_secret", 3600);
        let user = sample_user();

        let token = manager.generate_token(&user).unwrap();
        let claims = manager.validate_token(&token).unwrap();

        assert_eq!(claims.user_id().unwrap(), 7);
        assert_eq!(claims.username, "critic");
        assert_eq!(claims.token_type, ACCESS_TOKEN_TYPE);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_tokens_are_unique() {
        let manager = JwtManager::new("test_secret", 3600);
        let user = sample_user();
        let a = manager.validate_token(&manager.generate_token(&user).unwrap()).unwrap();
        let b = manager.validate_token(&manager.generate_token(&user).unwrap()).unwrap();
        assert_ne!(a.jti, b.jti);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let issuer = JwtManager::new("one", 3600);
        let other = JwtManager::new("two", 3600);
        let token = issuer.generate_token(&sample_user()).unwrap();

        assert!(matches!(other.validate_token(&token), Err(AppError::InvalidToken)));
        assert!(matches!(other.validate_token("garbage"), Err(AppError::InvalidToken)));
    }

    #[test]
    fn test_expired_token() {
        let manager = JwtManager {
            expiration_secs: -3600,
            ..JwtManager::new("test_secret", 0)
        };
        let token = manager.generate_token(&sample_user()).unwrap();
        assert!(matches!(manager.validate_token(&token), Err(AppError::ExpiredToken)));
    }
}
