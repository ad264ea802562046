//! Domain methods for the Docsage API client.
//!
//! Request/response types are re-exported from `docsage_core::models` where
//! possible; wrapper types matching API handler shapes are defined here.

use crate::{api_prefix, ApiClient};
use anyhow::Result;
use docsage_core::models::{
    ChatHistoryEntry, ChatRequest, ChatResponse, ConversationSummary, LoginRequest, LoginResponse,
    SaveTurnRequest, SaveTurnResponse, SignupRequest, SignupResponse, TranscriptResponse,
};
use uuid::Uuid;

/// Conversation list response. Matches API handler shape.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct ConversationList {
    pub conversations: Vec<ConversationSummary>,
}

#[derive(serde::Serialize)]
struct ReserveRequest<'a> {
    title: &'a str,
}

#[derive(serde::Serialize)]
struct RenameRequest<'a> {
    title: &'a str,
}

impl ApiClient {
    /// Register a new account. The first signup in a deployment creates the
    /// organization and becomes its administrator.
    pub async fn signup(&self, name: &str, email: &str, password: &str) -> Result<SignupResponse> {
        let body = SignupRequest {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        };
        self.post_json(&format!("{}/auth/signup", api_prefix()), &body)
            .await
    }

    /// Exchange credentials for a session token.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse> {
        let body = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        self.post_json(&format!("{}/auth/login", api_prefix()), &body)
            .await
    }

    /// List the caller's conversations, most recently updated first.
    pub async fn list_conversations(&self) -> Result<Vec<ConversationSummary>> {
        let response: ConversationList = self
            .get(&format!("{}/conversations", api_prefix()), &[])
            .await?;
        Ok(response.conversations)
    }

    /// Fetch one conversation with its full transcript.
    pub async fn get_conversation(&self, id: Uuid) -> Result<TranscriptResponse> {
        self.get(&format!("{}/conversations/{}", api_prefix(), id), &[])
            .await
    }

    /// Persist one turn: appends to an existing conversation when
    /// `conversation_id` is set, otherwise creates a new one.
    pub async fn save_turn(&self, request: &SaveTurnRequest) -> Result<SaveTurnResponse> {
        self.post_json(&format!("{}/conversations", api_prefix()), request)
            .await
    }

    /// Reserve an empty conversation id so attachments can be tagged before
    /// the first answer exists.
    pub async fn reserve_conversation(&self, title: &str) -> Result<SaveTurnResponse> {
        self.post_json(
            &format!("{}/conversations/reserve", api_prefix()),
            &ReserveRequest { title },
        )
        .await
    }

    /// Rename a conversation.
    pub async fn rename_conversation(&self, id: Uuid, title: &str) -> Result<()> {
        self.patch_json(
            &format!("{}/conversations/{}/rename", api_prefix(), id),
            &RenameRequest { title },
        )
        .await
    }

    /// Delete a conversation and all its messages.
    pub async fn delete_conversation(&self, id: Uuid) -> Result<()> {
        self.delete_no_content(&format!("{}/conversations/{}", api_prefix(), id))
            .await
    }

    /// Ask a question. Identity and organization come from the session token
    /// server-side; only the question, conversation id, and trailing history
    /// travel in the body.
    pub async fn ask(
        &self,
        question: &str,
        conversation_id: Option<Uuid>,
        history: Vec<ChatHistoryEntry>,
    ) -> Result<ChatResponse> {
        let body = ChatRequest {
            question: question.to_string(),
            conversation_id,
            history,
        };
        self.post_json(&format!("{}/chat", api_prefix()), &body)
            .await
    }

    /// Upload a document for indexing. `organization_wide` shares it across
    /// the tenant; otherwise it is personal and may be linked to a
    /// conversation.
    pub async fn upload_document(
        &self,
        filename: &str,
        content: Vec<u8>,
        organization_wide: bool,
        conversation_id: Option<Uuid>,
    ) -> Result<serde_json::Value> {
        let mut query: Vec<(&str, String)> =
            vec![("organization_wide", organization_wide.to_string())];
        if let Some(id) = conversation_id {
            query.push(("conversation_id", id.to_string()));
        }

        let form = reqwest::multipart::Form::new().part(
            "file",
            reqwest::multipart::Part::bytes(content).file_name(filename.to_string()),
        );

        self.post_multipart(&format!("{}/documents", api_prefix()), &query, form)
            .await
    }

    /// List documents visible to the caller.
    pub async fn list_documents(&self) -> Result<serde_json::Value> {
        self.get(&format!("{}/documents", api_prefix()), &[]).await
    }

    /// Delete a document by filename.
    pub async fn delete_document(&self, filename: &str) -> Result<serde_json::Value> {
        self.delete(&format!(
            "{}/documents/{}",
            api_prefix(),
            urlencoding::encode(filename)
        ))
        .await
    }
}
