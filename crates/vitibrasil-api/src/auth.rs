//! Bearer-token authorization gate.
//!
//! The data routes only need to know whether a caller is allowed and who it
//! is. [`Authorizer`] is that seam; [`JwtAuthorizer`] verifies HS256 tokens
//! and can mint them for operators.

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Default lifetime of minted tokens.
pub const DEFAULT_TOKEN_TTL_MINUTES: i64 = 30;

/// Validated caller identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub subject: String,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Missing bearer token")]
    Missing,

    #[error("Token expired")]
    Expired,

    #[error("Invalid token: {0}")]
    Invalid(String),

    #[error("Failed to issue token: {0}")]
    Issue(String),
}

/// Decides whether a credential may call the data routes.
pub trait Authorizer: Send + Sync {
    fn authorize(&self, credential: &str) -> Result<Identity, AuthError>;
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    exp: i64,
    iat: i64,
}

/// HS256 JWT verification and issuance with a shared secret.
pub struct JwtAuthorizer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl JwtAuthorizer {
    pub fn from_secret(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Mint a token for `subject` valid for `ttl`.
    pub fn issue(&self, subject: &str, ttl: Duration) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            sub: subject.to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AuthError::Issue(e.to_string()))
    }
}

impl Authorizer for JwtAuthorizer {
    fn authorize(&self, credential: &str) -> Result<Identity, AuthError> {
        let data = decode::<Claims>(credential, &self.decoding, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => AuthError::Invalid(e.to_string()),
            }
        })?;
        Ok(Identity {
            subject: data.claims.sub,
        })
    }
}

/// Pull the token out of an `Authorization: Bearer <token>` value.
pub fn bearer_token(header: Option<&str>) -> Result<&str, AuthError> {
    header
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::Missing)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_then_authorize() {
        let auth = JwtAuthorizer::from_secret(b"unit-test-secret");
        let token = auth.issue("analyst", Duration::minutes(5)).unwrap();
        let identity = auth.authorize(&token).unwrap();
        assert_eq!(identity.subject, "analyst");
    }

    #[test]
    fn test_expired_token() {
        let auth = JwtAuthorizer::from_secret(b"unit-test-secret");
        let token = auth.issue("analyst", Duration::minutes(-5)).unwrap();
        assert_eq!(auth.authorize(&token), Err(AuthError::Expired));
    }

    #[test]
    fn test_wrong_secret() {
        let token = JwtAuthorizer::from_secret(b"one")
            .issue("analyst", Duration::minutes(5))
            .unwrap();
        let err = JwtAuthorizer::from_secret(b"two").authorize(&token).unwrap_err();
        assert!(matches!(err, AuthError::Invalid(_)));
    }

    #[test]
    fn test_bearer_parsing() {
        assert_eq!(bearer_token(Some("Bearer abc")), Ok("abc"));
        assert_eq!(bearer_token(Some("Basic abc")), Err(AuthError::Missing));
        assert_eq!(bearer_token(Some("Bearer ")), Err(AuthError::Missing));
        assert_eq!(bearer_token(None), Err(AuthError::Missing));
    }
}
