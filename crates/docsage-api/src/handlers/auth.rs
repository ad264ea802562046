//! Signup and login handlers.

use crate::auth::password::{hash_password, verify_password};
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use docsage_core::models::{
    LoginRequest, LoginResponse, SignupRequest, SignupResponse, SignupUser,
};
use docsage_core::validation::validate_signup;
use docsage_core::AppError;
use std::sync::Arc;

#[utoipa::path(
    post,
    path = "/api/v0/auth/signup",
    tag = "auth",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Account created", body = SignupResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 409, description = "Email already registered", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, request), fields(operation = "signup"))]
pub async fn signup(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SignupRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    validate_signup(&request)?;

    let email = request.email.trim().to_string();
    let password_hash = hash_password(request.password.clone(), state.config.bcrypt_cost).await?;

    let outcome = state
        .signup_repository
        .register_user(request.name.trim(), &email, &password_hash)
        .await?;

    tracing::info!(
        user_id = %outcome.user.id,
        organization_id = %outcome.organization.id,
        is_first_user = outcome.is_first_user,
        "User registered"
    );

    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            user: SignupUser {
                id: outcome.user.id,
                name: outcome.user.name,
                email: outcome.user.email,
                role: outcome.role,
                is_first_user: outcome.is_first_user,
            },
            organization_id: outcome.organization.id,
        }),
    ))
}

#[utoipa::path(
    post,
    path = "/api/v0/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session token issued", body = LoginResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, request), fields(operation = "login"))]
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let user = state
        .user_repository
        .find_by_email(request.email.trim())
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    let valid = verify_password(request.password, user.password_hash.clone()).await?;
    if !valid {
        return Err(AppError::InvalidCredentials.into());
    }

    // Claims are fixed here for the token lifetime; a role change applies at
    // the next login.
    let membership = state
        .user_repository
        .primary_membership(user.id)
        .await?
        .ok_or_else(|| {
            AppError::Unauthorized("Account has no organization membership".to_string())
        })?;

    let token = state.jwt.issue(&user, &membership)?;

    Ok(Json(LoginResponse {
        token,
        user_id: user.id,
        email: user.email,
        name: user.name,
        organization_id: membership.organization_id,
        role: membership.role,
    }))
}
