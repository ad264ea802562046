//! Application setup and initialization.

pub mod database;
pub mod routes;
pub mod server;

use crate::retrieval::HttpRetrievalGateway;
use crate::state::AppState;
use anyhow::Result;
use axum::Router;
use docsage_core::Config;
use std::sync::Arc;

/// Initialize the application: database, engine client, state, routes.
pub async fn initialize_app(config: &Config) -> Result<Router> {
    let pool = database::setup_database(config).await?;

    let engine = Arc::new(HttpRetrievalGateway::new(
        &config.retrieval_engine_url,
        config.ask_timeout_seconds,
    )?);

    let state = Arc::new(AppState::new(pool, config.clone(), engine));

    routes::setup_routes(config, state)
}
