use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Trailing-context window passed to the retrieval engine: 3 turns (6 messages).
/// Older history is dropped outright, never summarized.
pub const HISTORY_WINDOW: usize = 6;

/// One prior message in the trailing-context window.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct ChatHistoryEntry {
    pub role: String,
    pub content: String,
}

/// Chat submission. Identity and organization are never part of this body;
/// the server injects them from the session.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChatRequest {
    pub question: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<Uuid>,
    #[serde(default)]
    pub history: Vec<ChatHistoryEntry>,
}

/// A retrieval source cited by the engine for an answer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct RetrievalSource {
    pub filename: String,
    pub chunk_index: i32,
    pub similarity: f64,
}

/// Answer from the retrieval engine.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChatResponse {
    pub answer: String,
    #[serde(default)]
    pub sources: Vec<RetrievalSource>,
    #[serde(default)]
    pub confidence: f64,
}

/// Clamp a history slice to the trailing [`HISTORY_WINDOW`] entries.
pub fn clamp_history(history: &[ChatHistoryEntry]) -> &[ChatHistoryEntry] {
    let start = history.len().saturating_sub(HISTORY_WINDOW);
    &history[start..]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(i: usize) -> ChatHistoryEntry {
        ChatHistoryEntry {
            role: if i % 2 == 0 { "user" } else { "assistant" }.to_string(),
            content: format!("message {}", i),
        }
    }

    #[test]
    fn short_history_passes_through() {
        let history: Vec<_> = (0..4).map(entry).collect();
        assert_eq!(clamp_history(&history).len(), 4);
    }

    #[test]
    fn long_history_keeps_most_recent_window() {
        let history: Vec<_> = (0..10).map(entry).collect();
        let clamped = clamp_history(&history);
        assert_eq!(clamped.len(), HISTORY_WINDOW);
        assert_eq!(clamped[0].content, "message 4");
        assert_eq!(clamped[5].content, "message 9");
    }

    #[test]
    fn empty_history_stays_empty() {
        assert!(clamp_history(&[]).is_empty());
    }
}
