//! Retrieval engine client.
//!
//! The engine is an opaque external collaborator: it answers questions over
//! indexed documents and owns document storage/indexing. This module provides
//! the [`RetrievalGateway`] seam used by the chat handler plus the document
//! proxy calls used by the documents handlers. Upstream failures propagate
//! with their status; a request that exceeds the configured bound becomes a
//! distinct `TimedOut` error.

use async_trait::async_trait;
use docsage_core::models::{ChatHistoryEntry, ChatResponse, MembershipRole};
use docsage_core::AppError;
use serde::Serialize;
use std::time::Duration;
use uuid::Uuid;

/// One question dispatch: the text plus the caller identity and the bounded
/// trailing-context window, all injected server-side.
#[derive(Debug, Clone, Serialize)]
pub struct AskRequest {
    pub question: String,
    pub user_id: Uuid,
    pub organization_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<Uuid>,
    pub history: Vec<ChatHistoryEntry>,
}

/// Question-answering seam over the external engine.
#[async_trait]
pub trait RetrievalGateway: Send + Sync {
    async fn ask(&self, request: AskRequest) -> Result<ChatResponse, AppError>;
}

/// Scope a document belongs to. Organization documents are shared across the
/// tenant; personal documents may additionally be linked to one conversation.
#[derive(Debug, Clone)]
pub enum DocumentScope {
    Personal {
        user_id: Uuid,
        conversation_id: Option<Uuid>,
    },
    Organization {
        organization_id: Uuid,
    },
}

/// HTTP client for the retrieval engine.
#[derive(Clone)]
pub struct HttpRetrievalGateway {
    client: reqwest::Client,
    base_url: String,
    ask_timeout_seconds: u64,
}

impl HttpRetrievalGateway {
    pub fn new(base_url: &str, ask_timeout_seconds: u64) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(ask_timeout_seconds))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build engine client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            ask_timeout_seconds,
        })
    }

    fn map_send_error(&self, err: reqwest::Error) -> AppError {
        if err.is_timeout() {
            AppError::TimedOut(self.ask_timeout_seconds)
        } else {
            AppError::Upstream {
                status: 502,
                message: format!("Retrieval engine unreachable: {}", err),
            }
        }
    }

    async fn check(&self, response: reqwest::Response) -> Result<reqwest::Response, AppError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());
        Err(AppError::Upstream {
            status: status.as_u16(),
            message,
        })
    }

    /// Upload a document to the engine, tagged with its scope.
    pub async fn upload_document(
        &self,
        scope: DocumentScope,
        filename: String,
        content: Vec<u8>,
    ) -> Result<serde_json::Value, AppError> {
        let mut query: Vec<(&str, String)> = Vec::new();
        match scope {
            DocumentScope::Personal {
                user_id,
                conversation_id,
            } => {
                query.push(("user_id", user_id.to_string()));
                if let Some(cid) = conversation_id {
                    query.push(("conversation_id", cid.to_string()));
                }
            }
            DocumentScope::Organization { organization_id } => {
                query.push(("organization_id", organization_id.to_string()));
            }
        }

        let form = reqwest::multipart::Form::new().part(
            "file",
            reqwest::multipart::Part::bytes(content).file_name(filename),
        );

        let response = self
            .client
            .post(format!("{}/api/documents/upload", self.base_url))
            .query(&query)
            .multipart(form)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;
        let response = self.check(response).await?;
        response.json().await.map_err(|e| AppError::Upstream {
            status: 502,
            message: format!("Invalid engine response: {}", e),
        })
    }

    /// List documents visible to a user within an organization.
    pub async fn list_documents(
        &self,
        user_id: Uuid,
        organization_id: Uuid,
    ) -> Result<serde_json::Value, AppError> {
        let response = self
            .client
            .get(format!("{}/api/documents/documents", self.base_url))
            .query(&[
                ("user_id", user_id.to_string()),
                ("organization_id", organization_id.to_string()),
            ])
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;
        let response = self.check(response).await?;
        response.json().await.map_err(|e| AppError::Upstream {
            status: 502,
            message: format!("Invalid engine response: {}", e),
        })
    }

    /// Delete a document by filename. The engine enforces the permission gate:
    /// organization documents require ADMIN, personal documents their owner.
    pub async fn delete_document(
        &self,
        filename: &str,
        user_id: Uuid,
        role: MembershipRole,
    ) -> Result<serde_json::Value, AppError> {
        let response = self
            .client
            .delete(format!("{}/api/documents/{}", self.base_url, filename))
            .query(&[
                ("user_id", user_id.to_string()),
                ("role", role.to_string()),
            ])
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;
        let response = self.check(response).await?;
        response.json().await.map_err(|e| AppError::Upstream {
            status: 502,
            message: format!("Invalid engine response: {}", e),
        })
    }
}

#[async_trait]
impl RetrievalGateway for HttpRetrievalGateway {
    async fn ask(&self, request: AskRequest) -> Result<ChatResponse, AppError> {
        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;
        let response = self.check(response).await?;
        response.json().await.map_err(|e| AppError::Upstream {
            status: 502,
            message: format!("Invalid engine response: {}", e),
        })
    }
}
