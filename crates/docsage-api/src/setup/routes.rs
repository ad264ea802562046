//! Route configuration and setup

use crate::auth::middleware::AuthState;
use crate::constants::API_PREFIX;
use crate::handlers;
use crate::state::AppState;
use axum::{
    http::{HeaderValue, Method},
    routing::{delete, get, patch, post},
    Router,
};
use docsage_core::Config;
use std::sync::Arc;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

/// Setup all application routes
pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Result<Router<()>, anyhow::Error> {
    let cors = setup_cors(config)?;

    let auth_state = Arc::new(AuthState {
        jwt: state.jwt.clone(),
    });

    let public_routes = public_routes(state.clone());

    // State is applied in protected_routes() for handlers with Multipart to work
    let protected_routes = protected_routes(state.clone()).layer(
        axum::middleware::from_fn_with_state(
            auth_state,
            crate::auth::middleware::auth_middleware,
        ),
    );

    // Body limit leaves headroom over the largest accepted document for
    // multipart framing overhead.
    let body_limit = state.config.max_document_size_bytes + 1024 * 1024;

    // Server-level concurrency limit to protect against resource exhaustion under extreme load
    let http_concurrency_limit = std::env::var("HTTP_CONCURRENCY_LIMIT")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(10_000)
        .max(1);

    let app = public_routes
        .merge(protected_routes)
        .layer(ConcurrencyLimitLayer::new(http_concurrency_limit))
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    Ok(app)
}

/// Setup CORS configuration
fn setup_cors(config: &Config) -> Result<CorsLayer, anyhow::Error> {
    let cors = if config.cors_origins.contains(&"*".to_string()) {
        tracing::warn!("CORS configured to allow all origins - not recommended for production");
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers(Any)
    } else {
        let origins: Result<Vec<HeaderValue>, _> =
            config.cors_origins.iter().map(|o| o.parse()).collect();

        CorsLayer::new()
            .allow_origin(origins.unwrap_or_default())
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers(Any)
    };
    Ok(cors)
}

/// Public routes (no authentication required)
fn public_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/health",
            get({
                let state = state.clone();
                move || async { handlers::health::health_check(state).await }
            }),
        )
        .route(
            "/live",
            get({
                let state = state.clone();
                move || async { handlers::health::liveness_check(state).await }
            }),
        )
        .route(
            "/api/openapi.json",
            get(|| async { axum::Json(crate::api_doc::get_openapi_spec()) }),
        )
        .route(
            &format!("{}/auth/signup", API_PREFIX),
            post(handlers::auth::signup),
        )
        .route(
            &format!("{}/auth/login", API_PREFIX),
            post(handlers::auth::login),
        )
        .with_state(state)
}

/// Protected routes (require authentication).
fn protected_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route(&format!("{}/chat", API_PREFIX), post(handlers::chat::ask))
        .route(
            &format!("{}/conversations", API_PREFIX),
            get(handlers::conversations::list_conversations)
                .post(handlers::conversations::save_turn),
        )
        .route(
            &format!("{}/conversations/reserve", API_PREFIX),
            post(handlers::conversations::reserve_conversation),
        )
        .route(
            &format!("{}/conversations/{{id}}", API_PREFIX),
            get(handlers::conversations::get_conversation)
                .delete(handlers::conversations::delete_conversation),
        )
        .route(
            &format!("{}/conversations/{{id}}/rename", API_PREFIX),
            patch(handlers::conversations::rename_conversation),
        )
        .route(
            &format!("{}/documents", API_PREFIX),
            post(handlers::documents::upload_document).get(handlers::documents::list_documents),
        )
        .route(
            &format!("{}/documents/{{filename}}", API_PREFIX),
            delete(handlers::documents::delete_document),
        )
        .with_state(state)
}
