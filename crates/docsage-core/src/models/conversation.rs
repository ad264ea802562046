use crate::models::chat::RetrievalSource;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use utoipa::ToSchema;
use uuid::Uuid;

/// Maximum title length derived from the first user message.
pub const TITLE_MAX_CHARS: usize = 50;

/// Conversation entity owning an ordered, append-only sequence of messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Conversation {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Conversation summary for list views (no messages).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ConversationSummary {
    pub id: Uuid,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Message author role.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "message_role", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

impl Display for MessageRole {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
        }
    }
}

/// One message in a transcript. Messages are produced in user/assistant pairs
/// within a turn; a completed turn never leaves an unpaired user message.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub role: MessageRole,
    pub content: String,
    /// Attachment filenames on user messages, if any were staged for this turn.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachments: Option<Vec<String>>,
    /// Retrieval sources on assistant messages.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<RetrievalSource>>,
    pub created_at: DateTime<Utc>,
}

/// Create-or-append request: with `conversation_id` appends a turn, without it
/// creates a new conversation titled from the first user message.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SaveTurnRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<Uuid>,
    pub user_message: String,
    pub assistant_message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachments: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<RetrievalSource>>,
}

/// Response from create-or-append.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SaveTurnResponse {
    pub conversation_id: Uuid,
}

/// Full transcript of one conversation, ordered by creation time.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TranscriptResponse {
    pub id: Uuid,
    pub title: String,
    pub messages: Vec<Message>,
}

/// Derive a conversation title from the first user message: truncated to
/// [`TITLE_MAX_CHARS`] characters with an ellipsis suffix when truncated.
pub fn conversation_title(first_user_message: &str) -> String {
    let trimmed = first_user_message.trim();
    let mut chars = trimmed.chars();
    let head: String = chars.by_ref().take(TITLE_MAX_CHARS).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_title_is_unchanged() {
        assert_eq!(conversation_title("What is our leave policy?"), "What is our leave policy?");
    }

    #[test]
    fn long_title_is_truncated_with_ellipsis() {
        let question = "a".repeat(80);
        let title = conversation_title(&question);
        assert_eq!(title, format!("{}...", "a".repeat(50)));
    }

    #[test]
    fn exactly_fifty_chars_gets_no_ellipsis() {
        let question = "b".repeat(50);
        assert_eq!(conversation_title(&question), question);
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        // 60 multibyte characters; byte-index slicing would panic here
        let question = "é".repeat(60);
        let title = conversation_title(&question);
        assert_eq!(title.chars().count(), 53); // 50 + "..."
        assert!(title.ends_with("..."));
    }
}
