//! Shared HTTP client for the Docsage API.
//!
//! Provides a minimal client with Bearer-token auth, generic request helpers,
//! typed domain methods ([`api`]), and the per-turn orchestration saga
//! ([`session`]) that front ends drive one conversational turn through.

pub mod api;
pub mod session;

use anyhow::{Context, Result};
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Authentication strategy for the API.
#[derive(Clone, Debug)]
pub enum Auth {
    /// `Authorization: Bearer {token}`
    Bearer(String),
    /// No auth header; only signup/login succeed.
    None,
}

/// API version prefix (e.g. "/api/v0"). Set DOCSAGE_API_VERSION to match the server.
pub fn api_prefix() -> String {
    let version = std::env::var("DOCSAGE_API_VERSION").unwrap_or_else(|_| "v0".to_string());
    format!("/api/{}", version)
}

/// HTTP client for the Docsage API with configurable auth.
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    auth: Auth,
}

impl ApiClient {
    pub fn new(base_url: String, auth: Auth) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(90))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth,
        })
    }

    /// Create a client from the environment: DOCSAGE_API_URL (or API_URL) and
    /// DOCSAGE_TOKEN (or JWT_TOKEN) for the Bearer token.
    pub fn from_env() -> Result<Self> {
        let base_url = std::env::var("DOCSAGE_API_URL")
            .or_else(|_| std::env::var("API_URL"))
            .unwrap_or_else(|_| "http://localhost:4000".to_string());

        let token = std::env::var("DOCSAGE_TOKEN")
            .or_else(|_| std::env::var("JWT_TOKEN"))
            .context("Missing token. Set DOCSAGE_TOKEN or JWT_TOKEN")?;

        Self::new(base_url, Auth::Bearer(token))
    }

    /// Create an unauthenticated client, for signup/login.
    pub fn unauthenticated(base_url: String) -> Result<Self> {
        Self::new(base_url, Auth::None)
    }

    /// Replace the auth token, typically after login.
    pub fn with_token(mut self, token: String) -> Self {
        self.auth = Auth::Bearer(token);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn apply_auth(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth {
            Auth::Bearer(token) => request.header("Authorization", format!("Bearer {}", token)),
            Auth::None => request,
        }
    }

    async fn handle<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(anyhow::anyhow!(
                "API request failed with status {}: {}",
                status,
                error_text
            ));
        }

        let body: T = response
            .json()
            .await
            .context("Failed to parse response as JSON")?;

        Ok(body)
    }

    /// GET request with optional query parameters. Deserializes JSON response.
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let url = self.build_url(path);
        let mut request = self.client.get(&url);
        request = self.apply_auth(request);

        if !query.is_empty() {
            request = request.query(query);
        }

        let response = request.send().await.context("Failed to send request")?;
        self.handle(response).await
    }

    /// POST JSON body and deserialize response.
    pub async fn post_json<T: DeserializeOwned, B: serde::Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let url = self.build_url(path);
        let request = self.client.post(&url).json(body);
        let request = self.apply_auth(request);

        let response = request.send().await.context("Failed to send request")?;
        self.handle(response).await
    }

    /// PATCH JSON body. Returns Ok(()) on success.
    pub async fn patch_json<B: serde::Serialize>(&self, path: &str, body: &B) -> Result<()> {
        let url = self.build_url(path);
        let request = self.client.patch(&url).json(body);
        let request = self.apply_auth(request);

        let response = request.send().await.context("Failed to send request")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(anyhow::anyhow!(
                "API request failed with status {}: {}",
                status,
                error_text
            ));
        }

        Ok(())
    }

    /// POST multipart form with query parameters and deserialize response.
    pub async fn post_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        form: reqwest::multipart::Form,
    ) -> Result<T> {
        let url = self.build_url(path);
        let mut request = self.client.post(&url).multipart(form);
        request = self.apply_auth(request);

        if !query.is_empty() {
            request = request.query(query);
        }

        let response = request.send().await.context("Failed to send request")?;
        self.handle(response).await
    }

    /// DELETE request. Returns the JSON body on success.
    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.build_url(path);
        let request = self.client.delete(&url);
        let request = self.apply_auth(request);

        let response = request.send().await.context("Failed to send request")?;
        self.handle(response).await
    }

    /// DELETE request discarding the body. Returns Ok(()) on success.
    pub async fn delete_no_content(&self, path: &str) -> Result<()> {
        let url = self.build_url(path);
        let request = self.client.delete(&url);
        let request = self.apply_auth(request);

        let response = request.send().await.context("Failed to send request")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(anyhow::anyhow!(
                "API request failed with status {}: {}",
                status,
                error_text
            ));
        }

        Ok(())
    }

    /// Raw client for custom requests. Caller must apply auth via build_url and headers.
    pub fn client(&self) -> &Client {
        &self.client
    }
}

// Re-export orchestration types and domain models for convenience.
pub use api::ConversationList;
pub use docsage_core::models::{
    ChatHistoryEntry, ChatResponse, ConversationSummary, LoginResponse, RetrievalSource,
    SaveTurnRequest, SaveTurnResponse, SignupResponse, TranscriptResponse,
};
pub use session::{
    ChatBackend, SessionOrchestrator, StagedAttachment, TurnError, TurnOutcome, TurnPhase,
};
