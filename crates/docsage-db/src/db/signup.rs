//! Tenant bootstrap: atomic signup.
//!
//! The first-ever successful signup creates the default organization and an
//! ADMIN/owner membership; every later signup joins that organization as a
//! MEMBER. The decision is serialized at the data layer by the
//! `organization_bootstrap` singleton marker: whichever transaction inserts the
//! marker first wins, any concurrent signup blocks on that insert and then
//! retries as a member. Application code never decides the race by itself.

use chrono::Utc;
use docsage_core::models::{Membership, MembershipRole, Organization, User};
use docsage_core::AppError;
use sqlx::PgPool;
use uuid::Uuid;

const DEFAULT_ORG_NAME: &str = "My Company";
const DEFAULT_ORG_SLUG: &str = "my-company";

const BOOTSTRAP_MARKER_PKEY: &str = "organization_bootstrap_pkey";
const USERS_EMAIL_KEY: &str = "users_email_key";

/// Result of a successful signup.
#[derive(Debug, Clone)]
pub struct SignupOutcome {
    pub user: User,
    pub organization: Organization,
    pub membership: Membership,
    pub role: MembershipRole,
    pub is_first_user: bool,
}

/// Extract the violated constraint name from a Postgres unique violation.
fn unique_violation(err: &sqlx::Error) -> Option<&str> {
    match err {
        sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => db.constraint(),
        _ => None,
    }
}

#[derive(Clone)]
pub struct SignupRepository {
    pool: PgPool,
}

impl SignupRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Register a new user, creating the organization on the first-ever signup.
    ///
    /// All writes (organization, user, membership) commit or fail together.
    /// Fails with [`AppError::DuplicateAccount`] if the email is taken.
    #[tracing::instrument(skip(self, password_hash), fields(db.operation = "register_user"))]
    pub async fn register_user(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<SignupOutcome, AppError> {
        // A concurrent first signup can lose the marker insert; the loser's
        // transaction rolls back and a single retry observes the committed
        // marker and joins as MEMBER.
        for attempt in 0..2 {
            match self.try_register(name, email, password_hash).await {
                Err(AppError::Database(err))
                    if unique_violation(&err) == Some(BOOTSTRAP_MARKER_PKEY) && attempt == 0 =>
                {
                    tracing::debug!(email, "lost bootstrap race, retrying as member");
                    continue;
                }
                other => return other,
            }
        }
        Err(AppError::Internal(
            "Bootstrap marker conflict persisted across retry".to_string(),
        ))
    }

    async fn try_register(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<SignupOutcome, AppError> {
        let mut tx = self.pool.begin().await?;
        let now = Utc::now();

        let existing: Option<Uuid> =
            sqlx::query_scalar("SELECT organization_id FROM organization_bootstrap")
                .fetch_optional(&mut *tx)
                .await?;

        let (organization, role, is_first_user) = match existing {
            Some(org_id) => {
                let organization = sqlx::query_as::<_, Organization>(
                    "SELECT id, name, slug, contact_email, created_at, updated_at \
                     FROM organizations WHERE id = $1",
                )
                .bind(org_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| {
                    AppError::Internal(
                        "Bootstrap marker references a missing organization".to_string(),
                    )
                })?;
                (organization, MembershipRole::Member, false)
            }
            None => {
                let organization = Organization {
                    id: Uuid::new_v4(),
                    name: DEFAULT_ORG_NAME.to_string(),
                    slug: DEFAULT_ORG_SLUG.to_string(),
                    contact_email: email.to_string(),
                    created_at: now,
                    updated_at: now,
                };
                sqlx::query(
                    "INSERT INTO organizations (id, name, slug, contact_email, created_at, updated_at) \
                     VALUES ($1, $2, $3, $4, $5, $6)",
                )
                .bind(organization.id)
                .bind(&organization.name)
                .bind(&organization.slug)
                .bind(&organization.contact_email)
                .bind(organization.created_at)
                .bind(organization.updated_at)
                .execute(&mut *tx)
                .await?;

                // The serialization point: blocks behind a concurrent winner,
                // then fails with a unique violation handled by the caller.
                sqlx::query(
                    "INSERT INTO organization_bootstrap (lock, organization_id) VALUES (true, $1)",
                )
                .bind(organization.id)
                .execute(&mut *tx)
                .await?;

                (organization, MembershipRole::Admin, true)
            }
        };

        let user = User {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            created_at: now,
            updated_at: now,
        };
        sqlx::query(
            "INSERT INTO users (id, name, email, password_hash, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if unique_violation(&e) == Some(USERS_EMAIL_KEY) {
                AppError::DuplicateAccount
            } else {
                AppError::Database(e)
            }
        })?;

        let membership = Membership {
            id: Uuid::new_v4(),
            user_id: user.id,
            organization_id: organization.id,
            role,
            is_owner: is_first_user,
            created_at: now,
        };
        sqlx::query(
            "INSERT INTO memberships (id, user_id, organization_id, role, is_owner, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(membership.id)
        .bind(membership.user_id)
        .bind(membership.organization_id)
        .bind(membership.role)
        .bind(membership.is_owner)
        .bind(membership.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(SignupOutcome {
            user,
            organization,
            membership,
            role,
            is_first_user,
        })
    }
}
