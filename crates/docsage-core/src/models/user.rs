use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use utoipa::ToSchema;
use uuid::Uuid;

/// User entity. The password credential is stored as an opaque bcrypt hash and
/// never leaves the database layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Membership role within an organization.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "member_role", rename_all = "UPPERCASE")
)]
#[serde(rename_all = "UPPERCASE")]
pub enum MembershipRole {
    Admin,
    Member,
}

impl Display for MembershipRole {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            MembershipRole::Admin => write!(f, "ADMIN"),
            MembershipRole::Member => write!(f, "MEMBER"),
        }
    }
}

/// Membership linking one user to one organization.
///
/// `is_owner` and `role == Admin` hold together exactly when this membership was
/// created in the same atomic operation that created its organization.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Membership {
    pub id: Uuid,
    pub user_id: Uuid,
    pub organization_id: Uuid,
    pub role: MembershipRole,
    pub is_owner: bool,
    pub created_at: DateTime<Utc>,
}

/// Signup request body.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// User fields returned from signup.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SignupUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: MembershipRole,
    pub is_first_user: bool,
}

/// Signup response body.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SignupResponse {
    pub user: SignupUser,
    pub organization_id: Uuid,
}

/// Login request body.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Authenticated identity returned from login alongside the session token.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
    pub user_id: Uuid,
    pub email: String,
    pub name: String,
    pub organization_id: Uuid,
    pub role: MembershipRole,
}
