//! Identity resolution
//!
//! Tokens are issued by the external user/auth service (HS256, shared
//! secret). Endpoints trust only the identity decoded here.

pub mod middleware;

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::error::{PaymentError, PaymentResult};
use crate::payment::UserId;

/// Acting role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Reviewer,
    Admin,
}

impl Role {
    /// Reviewers and admins may decide manual payments and withdrawals
    pub fn can_review(&self) -> bool {
        matches!(self, Role::Reviewer | Role::Admin)
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

/// JWT Claims structure
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String, // Subject (user_id as string)
    #[serde(default)]
    pub role: Role,
    pub exp: usize,
    pub iat: usize,
}

/// Resolved caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub user_id: UserId,
    pub role: Role,
}

impl Identity {
    pub fn user(user_id: UserId) -> Self {
        Self {
            user_id,
            role: Role::User,
        }
    }

    pub fn reviewer(user_id: UserId) -> Self {
        Self {
            user_id,
            role: Role::Reviewer,
        }
    }

    pub fn admin(user_id: UserId) -> Self {
        Self {
            user_id,
            role: Role::Admin,
        }
    }

    pub fn require_reviewer(&self) -> PaymentResult<()> {
        if self.role.can_review() {
            Ok(())
        } else {
            Err(PaymentError::Forbidden("reviewer role required".into()))
        }
    }

    pub fn require_admin(&self) -> PaymentResult<()> {
        if self.role.is_admin() {
            Ok(())
        } else {
            Err(PaymentError::Forbidden("admin role required".into()))
        }
    }
}

impl TryFrom<Claims> for Identity {
    type Error = PaymentError;

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        let user_id = claims
            .sub
            .parse::<UserId>()
            .map_err(|_| PaymentError::Unauthorized)?;
        Ok(Self {
            user_id,
            role: claims.role,
        })
    }
}

/// HS256 token verification against the auth service secret
pub struct TokenVerifier {
    decoding_key: DecodingKey,
    encoding_key: EncodingKey,
}

impl TokenVerifier {
    pub fn new(secret: &str) -> PaymentResult<Self> {
        if secret.len() < 16 {
            return Err(PaymentError::Configuration(
                "jwt secret must be at least 16 bytes".into(),
            ));
        }
        Ok(Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
        })
    }

    /// Verify JWT token and resolve the identity
    pub fn verify(&self, token: &str) -> PaymentResult<Identity> {
        let validation = Validation::new(Algorithm::HS256);
        let token_data = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|_| PaymentError::Unauthorized)?;
        Identity::try_from(token_data.claims)
    }

    /// Issue a token (local tooling and tests; production tokens come from the auth service)
    pub fn issue(&self, identity: Identity, ttl: Duration) -> PaymentResult<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: identity.user_id.to_string(),
            role: identity.role,
            exp: (now + ttl).timestamp() as usize,
            iat: now.timestamp() as usize,
        };
        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| PaymentError::Configuration(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-0123456789";

    #[test]
    fn test_issue_and_verify() {
        let verifier = TokenVerifier::new(SECRET).unwrap();
        let token = verifier
            .issue(Identity::reviewer(42), Duration::hours(1))
            .unwrap();
        let identity = verifier.verify(&token).unwrap();
        assert_eq!(identity, Identity::reviewer(42));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let a = TokenVerifier::new(SECRET).unwrap();
        let b = TokenVerifier::new("another-secret-0123456789").unwrap();
        let token = a.issue(Identity::user(1), Duration::hours(1)).unwrap();
        assert_eq!(b.verify(&token), Err(PaymentError::Unauthorized));
    }

    #[test]
    fn test_expired_rejected() {
        let verifier = TokenVerifier::new(SECRET).unwrap();
        let token = verifier
            .issue(Identity::user(1), Duration::hours(-2))
            .unwrap();
        assert_eq!(verifier.verify(&token), Err(PaymentError::Unauthorized));
    }

    #[test]
    fn test_short_secret_rejected() {
        assert!(TokenVerifier::new("short").is_err());
    }

    #[test]
    fn test_roles() {
        assert!(Identity::admin(1).require_reviewer().is_ok());
        assert!(Identity::reviewer(1).require_admin().is_err());
        assert!(Identity::user(1).require_reviewer().is_err());
    }
}
