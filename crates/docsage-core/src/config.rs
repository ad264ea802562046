//! Configuration module
//!
//! This module provides configuration for the API and client, loaded from
//! environment variables (with `.env` support via dotenvy). Settings cover the
//! database, authentication, the retrieval engine, and the HTTP server.

use std::env;

// Common constants
const MAX_CONNECTIONS: u32 = 20;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const JWT_EXPIRY_HOURS: i64 = 24;
const ASK_TIMEOUT_SECS: u64 = 60;
const BCRYPT_COST: u32 = 12;
const MAX_DOCUMENT_SIZE_MB: usize = 50;

/// Application configuration loaded from the environment.
#[derive(Clone, Debug)]
pub struct Config {
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    pub jwt_secret: String,
    pub jwt_expiry_hours: i64,
    pub bcrypt_cost: u32,
    /// Base URL of the external retrieval/QA engine.
    pub retrieval_engine_url: String,
    /// Bound on a single ask call; expiry yields a TimedOut error, not an upstream error.
    pub ask_timeout_seconds: u64,
    pub max_document_size_bytes: usize,
    pub document_allowed_extensions: Vec<String>,
    pub environment: String,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let cors_origins_str = env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string());
        let is_production =
            environment.to_lowercase() == "production" || environment.to_lowercase() == "prod";
        if is_production && cors_origins_str.trim() == "*" {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }

        let cors_origins: Vec<String> = cors_origins_str
            .split(',')
            .map(|s| s.trim().to_string())
            .collect();

        let max_document_size_mb = env::var("MAX_DOCUMENT_SIZE_MB")
            .unwrap_or_else(|_| MAX_DOCUMENT_SIZE_MB.to_string())
            .parse::<usize>()
            .unwrap_or(MAX_DOCUMENT_SIZE_MB);

        let document_allowed_extensions = env::var("DOCUMENT_ALLOWED_EXTENSIONS")
            .unwrap_or_else(|_| "pdf".to_string())
            .split(',')
            .map(|s| s.trim().to_lowercase())
            .collect();

        Ok(Self {
            server_port: env::var("PORT")
                .unwrap_or_else(|_| "4000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            cors_origins,
            database_url: env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?,
            db_max_connections: env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| MAX_CONNECTIONS.to_string())
                .parse()
                .unwrap_or(MAX_CONNECTIONS),
            db_timeout_seconds: env::var("DB_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| CONNECTION_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(CONNECTION_TIMEOUT_SECS),
            jwt_secret: env::var("JWT_SECRET")
                .map_err(|_| anyhow::anyhow!("JWT_SECRET must be set for authentication"))?,
            jwt_expiry_hours: env::var("JWT_EXPIRY_HOURS")
                .unwrap_or_else(|_| JWT_EXPIRY_HOURS.to_string())
                .parse()
                .unwrap_or(JWT_EXPIRY_HOURS),
            bcrypt_cost: env::var("BCRYPT_COST")
                .unwrap_or_else(|_| BCRYPT_COST.to_string())
                .parse()
                .unwrap_or(BCRYPT_COST),
            retrieval_engine_url: env::var("RETRIEVAL_ENGINE_URL")
                .unwrap_or_else(|_| "http://localhost:8000".to_string()),
            ask_timeout_seconds: env::var("ASK_TIMEOUT_SECS")
                .unwrap_or_else(|_| ASK_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(ASK_TIMEOUT_SECS),
            max_document_size_bytes: max_document_size_mb * 1024 * 1024,
            document_allowed_extensions,
            environment,
        })
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn production_detection() {
        let mut config = Config {
            server_port: 4000,
            cors_origins: vec!["https://app.example.com".to_string()],
            database_url: "postgres://localhost/docsage".to_string(),
            db_max_connections: MAX_CONNECTIONS,
            db_timeout_seconds: CONNECTION_TIMEOUT_SECS,
            jwt_secret: "secret".to_string(),
            jwt_expiry_hours: JWT_EXPIRY_HOURS,
            bcrypt_cost: BCRYPT_COST,
            retrieval_engine_url: "http://localhost:8000".to_string(),
            ask_timeout_seconds: ASK_TIMEOUT_SECS,
            max_document_size_bytes: MAX_DOCUMENT_SIZE_MB * 1024 * 1024,
            document_allowed_extensions: vec!["pdf".to_string()],
            environment: "development".to_string(),
        };
        assert!(!config.is_production());
        config.environment = "Production".to_string();
        assert!(config.is_production());
    }
}
