//! Docsage database layer.
//!
//! Postgres repositories for tenant bootstrap, users, and conversations.
//! Schema lives in the workspace `migrations/` directory and is applied by the
//! API at startup.

pub mod db;

pub use db::conversation::ConversationRepository;
pub use db::signup::{SignupOutcome, SignupRepository};
pub use db::user::UserRepository;
