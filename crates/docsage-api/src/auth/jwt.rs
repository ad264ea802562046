//! HS256 session tokens.

use crate::auth::models::SessionClaims;
use chrono::{Duration, Utc};
use docsage_core::models::{Membership, User};
use docsage_core::AppError;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiry_hours: i64,
}

impl JwtService {
    pub fn new(secret: &str, expiry_hours: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            expiry_hours,
        }
    }

    /// Issue a session token carrying the identity and the claims resolved
    /// from the given membership.
    pub fn issue(&self, user: &User, membership: &Membership) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = SessionClaims {
            sub: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            organization_id: membership.organization_id,
            role: membership.role,
            iat: now.timestamp(),
            exp: (now + Duration::hours(self.expiry_hours)).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("Failed to sign session token: {}", e)))
    }

    /// Verify a session token and return its claims.
    pub fn verify(&self, token: &str) -> Result<SessionClaims, AppError> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<SessionClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| AppError::Unauthorized(format!("Invalid session token: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docsage_core::models::MembershipRole;
    use uuid::Uuid;

    fn fixtures() -> (User, Membership) {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            password_hash: "hash".to_string(),
            created_at: now,
            updated_at: now,
        };
        let membership = Membership {
            id: Uuid::new_v4(),
            user_id: user.id,
            organization_id: Uuid::new_v4(),
            role: MembershipRole::Admin,
            is_owner: true,
            created_at: now,
        };
        (user, membership)
    }

    #[test]
    fn issued_token_round_trips() {
        let (user, membership) = fixtures();
        let service = JwtService::new("test-secret", 24);
        let token = service.issue(&user, &membership).unwrap();
        let claims = service.verify(&token).unwrap();
        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.email, user.email);
        assert_eq!(claims.organization_id, membership.organization_id);
        assert_eq!(claims.role, MembershipRole::Admin);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let (user, membership) = fixtures();
        let token = JwtService::new("secret-a", 24).issue(&user, &membership).unwrap();
        let err = JwtService::new("secret-b", 24).verify(&token).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[test]
    fn garbage_token_is_rejected() {
        let service = JwtService::new("test-secret", 24);
        assert!(service.verify("not-a-token").is_err());
    }
}
