use crate::error::ErrorResponse;
use axum::extract::FromRequestParts;
use axum::http::{request::Parts, StatusCode};
use axum::Json;
use docsage_core::models::MembershipRole;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// JWT claims embedded in a session token.
///
/// Organization and role are resolved once at login from the user's primary
/// membership and stay fixed for the token lifetime; role changes apply at the
/// next login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: Uuid, // user_id
    pub email: String,
    pub name: String,
    pub organization_id: Uuid,
    pub role: MembershipRole,
    pub iat: i64,
    pub exp: i64,
}

/// Caller identity extracted from the session token and stored in request
/// extensions by the auth middleware.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub user_id: Uuid,
    pub email: String,
    pub name: String,
    pub organization_id: Uuid,
    pub role: MembershipRole,
}

impl From<SessionClaims> for SessionContext {
    fn from(claims: SessionClaims) -> Self {
        Self {
            user_id: claims.sub,
            email: claims.email,
            name: claims.name,
            organization_id: claims.organization_id,
            role: claims.role,
        }
    }
}

impl SessionContext {
    pub fn is_admin(&self) -> bool {
        self.role == MembershipRole::Admin
    }
}

// Implement FromRequestParts for SessionContext to work with Multipart
// Extension cannot be used with Multipart, so we extract directly from request parts
impl<S> FromRequestParts<S> for SessionContext
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ErrorResponse>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SessionContext>()
            .cloned()
            .ok_or_else(|| {
                (
                    StatusCode::UNAUTHORIZED,
                    Json(ErrorResponse {
                        error: "Missing session context".to_string(),
                        details: None,
                        code: "MISSING_SESSION_CONTEXT".to_string(),
                        recoverable: false,
                        suggested_action: Some("Check authentication token".to_string()),
                    }),
                )
            })
    }
}
