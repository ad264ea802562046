//! Integration tests against a real Postgres.
//!
//! These need a scratch database and are ignored by default. Run with:
//! `DATABASE_URL=postgres://localhost/docsage_test cargo test -p docsage-db -- --ignored --test-threads=1`
//!
//! Tests truncate all tables, so point DATABASE_URL at a throwaway database.

use docsage_core::models::{MembershipRole, MessageRole};
use docsage_core::AppError;
use docsage_db::{ConversationRepository, SignupRepository};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::path::Path;
use uuid::Uuid;

async fn setup_pool() -> PgPool {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for db tests");
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&url)
        .await
        .expect("connect to test database");

    let migrations_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../migrations");
    sqlx::migrate::Migrator::new(migrations_dir)
        .await
        .expect("load migrations")
        .run(&pool)
        .await
        .expect("run migrations");

    sqlx::query(
        "TRUNCATE organization_bootstrap, memberships, messages, conversations, users, organizations CASCADE",
    )
    .execute(&pool)
    .await
    .expect("truncate tables");

    pool
}

fn email(prefix: &str) -> String {
    format!("{}-{}@example.com", prefix, Uuid::new_v4())
}

#[tokio::test]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn first_signup_bootstraps_organization_later_signups_join() {
    let pool = setup_pool().await;
    let signup = SignupRepository::new(pool.clone());

    let first = signup
        .register_user("Ada", &email("ada"), "hash-a")
        .await
        .expect("first signup");
    assert!(first.is_first_user);
    assert_eq!(first.role, MembershipRole::Admin);
    assert!(first.membership.is_owner);

    let second = signup
        .register_user("Grace", &email("grace"), "hash-g")
        .await
        .expect("second signup");
    assert!(!second.is_first_user);
    assert_eq!(second.role, MembershipRole::Member);
    assert!(!second.membership.is_owner);
    assert_eq!(second.organization.id, first.organization.id);

    let org_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM organizations")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(org_count, 1);
}

#[tokio::test]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn duplicate_email_is_rejected() {
    let pool = setup_pool().await;
    let signup = SignupRepository::new(pool.clone());

    let addr = email("dup");
    signup
        .register_user("First", &addr, "hash-1")
        .await
        .expect("first registration");
    let err = signup
        .register_user("Second", &addr, "hash-2")
        .await
        .expect_err("duplicate must fail");
    assert!(matches!(err, AppError::DuplicateAccount));
}

#[tokio::test]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn concurrent_first_signups_create_exactly_one_organization() {
    let pool = setup_pool().await;

    let mut handles = Vec::new();
    for i in 0..8 {
        let signup = SignupRepository::new(pool.clone());
        handles.push(tokio::spawn(async move {
            signup
                .register_user(&format!("user-{}", i), &email("race"), "hash")
                .await
        }));
    }

    let mut outcomes = Vec::new();
    for handle in handles {
        outcomes.push(handle.await.unwrap().expect("signup should succeed"));
    }

    let org_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM organizations")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(org_count, 1, "bootstrap race produced multiple organizations");

    let owners = outcomes.iter().filter(|o| o.is_first_user).count();
    assert_eq!(owners, 1, "exactly one signup may win the bootstrap");

    let org_id = outcomes[0].organization.id;
    assert!(outcomes.iter().all(|o| o.organization.id == org_id));
    assert!(outcomes
        .iter()
        .filter(|o| !o.is_first_user)
        .all(|o| o.role == MembershipRole::Member));
}

#[tokio::test]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn transcript_lifecycle_and_ownership() {
    let pool = setup_pool().await;
    let signup = SignupRepository::new(pool.clone());
    let conversations = ConversationRepository::new(pool.clone());

    let alice = signup
        .register_user("Alice", &email("alice"), "hash")
        .await
        .unwrap();
    let bob = signup
        .register_user("Bob", &email("bob"), "hash")
        .await
        .unwrap();

    let long_question = "What does the onboarding handbook say about remote work equipment?";
    let id = conversations
        .create(
            alice.user.id,
            long_question,
            "It lists a laptop and a monitor.",
            Some(&["handbook.pdf".to_string()]),
            None,
        )
        .await
        .unwrap();

    // Title is the first user message truncated to 50 chars with an ellipsis
    let (conversation, messages) = conversations.get(alice.user.id, id).await.unwrap();
    assert_eq!(
        conversation.title,
        format!("{}...", &long_question[..50])
    );
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, MessageRole::User);
    assert_eq!(messages[1].role, MessageRole::Assistant);
    assert_eq!(
        messages[0].attachments.as_deref(),
        Some(&["handbook.pdf".to_string()][..])
    );

    conversations
        .append_turn(alice.user.id, id, "Anything about travel?", "Yes, section 4.", None, None)
        .await
        .unwrap();
    let (_, messages) = conversations.get(alice.user.id, id).await.unwrap();
    assert_eq!(messages.len(), 4);
    assert_eq!(messages[2].role, MessageRole::User);
    assert_eq!(messages[3].role, MessageRole::Assistant);

    // Another user sees NotFound everywhere, and nothing is written
    let err = conversations.get(bob.user.id, id).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    let err = conversations
        .append_turn(bob.user.id, id, "hijack", "answer", None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    let err = conversations.delete(bob.user.id, id).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    let (_, messages) = conversations.get(alice.user.id, id).await.unwrap();
    assert_eq!(messages.len(), 4, "failed foreign writes must not persist");

    // Rename persists for the owner
    conversations
        .rename(alice.user.id, id, "Onboarding questions")
        .await
        .unwrap();
    let (conversation, _) = conversations.get(alice.user.id, id).await.unwrap();
    assert_eq!(conversation.title, "Onboarding questions");

    // Delete cascades messages
    conversations.delete(alice.user.id, id).await.unwrap();
    let err = conversations.get(alice.user.id, id).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    let orphan_count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM messages WHERE conversation_id = $1")
            .bind(id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(orphan_count, 0);
}

#[tokio::test]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn reservation_is_id_only_until_first_turn() {
    let pool = setup_pool().await;
    let signup = SignupRepository::new(pool.clone());
    let conversations = ConversationRepository::new(pool.clone());

    let alice = signup
        .register_user("Alice", &email("alice"), "hash")
        .await
        .unwrap();

    let id = conversations
        .reserve(alice.user.id, "Attached documents")
        .await
        .unwrap();
    let (_, messages) = conversations.get(alice.user.id, id).await.unwrap();
    assert!(messages.is_empty(), "reservation must not write a placeholder message");

    conversations
        .append_turn(alice.user.id, id, "What is in the attachment?", "A budget table.", None, None)
        .await
        .unwrap();
    let (_, messages) = conversations.get(alice.user.id, id).await.unwrap();
    assert_eq!(messages.len(), 2);

    let users_list = conversations.list(alice.user.id).await.unwrap();
    assert_eq!(users_list.len(), 1);

    // Another user's listing stays empty
    let bob = signup
        .register_user("Bob", &email("bob"), "hash")
        .await
        .unwrap();
    assert!(conversations.list(bob.user.id).await.unwrap().is_empty());
}
