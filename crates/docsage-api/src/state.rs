//! Application state shared across handlers.

use crate::auth::JwtService;
use crate::retrieval::HttpRetrievalGateway;
use docsage_core::Config;
use docsage_db::{ConversationRepository, SignupRepository, UserRepository};
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    pub jwt: JwtService,
    pub signup_repository: SignupRepository,
    pub user_repository: UserRepository,
    pub conversation_repository: ConversationRepository,
    pub engine: Arc<HttpRetrievalGateway>,
}

impl AppState {
    pub fn new(
        pool: PgPool,
        config: Config,
        engine: Arc<HttpRetrievalGateway>,
    ) -> Self {
        let jwt = JwtService::new(&config.jwt_secret, config.jwt_expiry_hours);
        Self {
            signup_repository: SignupRepository::new(pool.clone()),
            user_repository: UserRepository::new(pool.clone()),
            conversation_repository: ConversationRepository::new(pool.clone()),
            pool,
            config,
            jwt,
            engine,
        }
    }
}
