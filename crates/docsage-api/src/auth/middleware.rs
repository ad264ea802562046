//! Bearer-token authentication middleware.
//!
//! Verifies the `Authorization: Bearer` header and stores a [`SessionContext`]
//! in request extensions. Requests without a valid session are rejected before
//! any store access.

use crate::auth::jwt::JwtService;
use crate::auth::models::SessionContext;
use crate::error::HttpAppError;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use docsage_core::AppError;
use std::sync::Arc;

#[derive(Clone)]
pub struct AuthState {
    pub jwt: JwtService,
}

pub async fn auth_middleware(
    State(auth_state): State<Arc<AuthState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = match request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
    {
        Some(token) => token,
        None => {
            return HttpAppError(AppError::Unauthorized(
                "Missing or malformed Authorization header".to_string(),
            ))
            .into_response();
        }
    };

    let claims = match auth_state.jwt.verify(token) {
        Ok(claims) => claims,
        Err(err) => return HttpAppError(err).into_response(),
    };

    request
        .extensions_mut()
        .insert(SessionContext::from(claims));
    next.run(request).await
}
