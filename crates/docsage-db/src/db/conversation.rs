//! Conversation store: owner-scoped CRUD over conversations and their ordered
//! messages.
//!
//! Every query filters by the owning user id; a conversation that exists but
//! belongs to someone else is indistinguishable from one that does not exist.
//! Messages are append-only and a turn always lands as a user/assistant pair
//! inside one transaction.

use chrono::{DateTime, Utc};
use docsage_core::models::{
    conversation_title, Conversation, ConversationSummary, Message, MessageRole, RetrievalSource,
};
use docsage_core::AppError;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

/// Raw message row; attachments/sources come back as jsonb.
#[derive(sqlx::FromRow)]
struct MessageRow {
    id: Uuid,
    conversation_id: Uuid,
    role: MessageRole,
    content: String,
    attachments: Option<serde_json::Value>,
    sources: Option<serde_json::Value>,
    created_at: DateTime<Utc>,
}

impl MessageRow {
    fn into_message(self) -> Result<Message, AppError> {
        let attachments = self
            .attachments
            .map(serde_json::from_value::<Vec<String>>)
            .transpose()?;
        let sources = self
            .sources
            .map(serde_json::from_value::<Vec<RetrievalSource>>)
            .transpose()?;
        Ok(Message {
            id: self.id,
            conversation_id: self.conversation_id,
            role: self.role,
            content: self.content,
            attachments,
            sources,
            created_at: self.created_at,
        })
    }
}

#[derive(Clone)]
pub struct ConversationRepository {
    pool: PgPool,
}

impl ConversationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// List conversation summaries for a user, most recently updated first.
    #[tracing::instrument(skip(self), fields(db.table = "conversations", db.operation = "select"))]
    pub async fn list(&self, user_id: Uuid) -> Result<Vec<ConversationSummary>, AppError> {
        let summaries = sqlx::query_as::<_, ConversationSummary>(
            "SELECT id, title, created_at, updated_at \
             FROM conversations WHERE user_id = $1 \
             ORDER BY updated_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(summaries)
    }

    /// Fetch a conversation with its full transcript, ordered by creation time.
    ///
    /// Fails with `NotFound` when the conversation is absent or owned by
    /// another user.
    #[tracing::instrument(skip(self), fields(db.table = "conversations", db.operation = "select", db.record_id = %conversation_id))]
    pub async fn get(
        &self,
        user_id: Uuid,
        conversation_id: Uuid,
    ) -> Result<(Conversation, Vec<Message>), AppError> {
        let conversation = sqlx::query_as::<_, Conversation>(
            "SELECT id, user_id, title, created_at, updated_at \
             FROM conversations WHERE id = $1 AND user_id = $2",
        )
        .bind(conversation_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Conversation not found".to_string()))?;

        let rows = sqlx::query_as::<_, MessageRow>(
            "SELECT id, conversation_id, role, content, attachments, sources, created_at \
             FROM messages WHERE conversation_id = $1 \
             ORDER BY created_at ASC, seq ASC",
        )
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await?;

        let messages = rows
            .into_iter()
            .map(MessageRow::into_message)
            .collect::<Result<Vec<_>, _>>()?;

        Ok((conversation, messages))
    }

    /// Create a conversation from its first turn. The title is derived from the
    /// first user message.
    #[tracing::instrument(skip_all, fields(db.table = "conversations", db.operation = "insert"))]
    pub async fn create(
        &self,
        user_id: Uuid,
        user_message: &str,
        assistant_message: &str,
        attachments: Option<&[String]>,
        sources: Option<&[RetrievalSource]>,
    ) -> Result<Uuid, AppError> {
        let mut tx = self.pool.begin().await?;
        let now = Utc::now();
        let conversation_id = Uuid::new_v4();

        sqlx::query(
            "INSERT INTO conversations (id, user_id, title, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $4)",
        )
        .bind(conversation_id)
        .bind(user_id)
        .bind(conversation_title(user_message))
        .bind(now)
        .execute(&mut *tx)
        .await?;

        insert_turn(
            &mut tx,
            conversation_id,
            user_message,
            assistant_message,
            attachments,
            sources,
            now,
        )
        .await?;

        tx.commit().await?;
        Ok(conversation_id)
    }

    /// Reserve a conversation id with zero messages.
    ///
    /// Used when attachments must be tagged with a conversation id before the
    /// first answer exists. No placeholder message is written; the first
    /// `append_turn` finalizes the record.
    #[tracing::instrument(skip(self, title), fields(db.table = "conversations", db.operation = "insert"))]
    pub async fn reserve(&self, user_id: Uuid, title: &str) -> Result<Uuid, AppError> {
        let conversation_id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO conversations (id, user_id, title, created_at, updated_at) \
             VALUES ($1, $2, $3, now(), now())",
        )
        .bind(conversation_id)
        .bind(user_id)
        .bind(conversation_title(title))
        .execute(&self.pool)
        .await?;
        Ok(conversation_id)
    }

    /// Append one turn (user message followed by assistant message) and bump
    /// `updated_at`. All-or-nothing: the pair commits together or not at all.
    #[tracing::instrument(skip_all, fields(db.table = "messages", db.operation = "insert", db.record_id = %conversation_id))]
    pub async fn append_turn(
        &self,
        user_id: Uuid,
        conversation_id: Uuid,
        user_message: &str,
        assistant_message: &str,
        attachments: Option<&[String]>,
        sources: Option<&[RetrievalSource]>,
    ) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        let now = Utc::now();

        // Ownership check and recency bump in one statement
        let owned: Option<Uuid> = sqlx::query_scalar(
            "UPDATE conversations SET updated_at = $3 \
             WHERE id = $1 AND user_id = $2 RETURNING id",
        )
        .bind(conversation_id)
        .bind(user_id)
        .bind(now)
        .fetch_optional(&mut *tx)
        .await?;
        if owned.is_none() {
            return Err(AppError::NotFound("Conversation not found".to_string()));
        }

        insert_turn(
            &mut tx,
            conversation_id,
            user_message,
            assistant_message,
            attachments,
            sources,
            now,
        )
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Rename a conversation. The title must already be validated and trimmed.
    #[tracing::instrument(skip(self, title), fields(db.table = "conversations", db.operation = "update", db.record_id = %conversation_id))]
    pub async fn rename(
        &self,
        user_id: Uuid,
        conversation_id: Uuid,
        title: &str,
    ) -> Result<(), AppError> {
        let result = sqlx::query(
            "UPDATE conversations SET title = $3, updated_at = now() \
             WHERE id = $1 AND user_id = $2",
        )
        .bind(conversation_id)
        .bind(user_id)
        .bind(title)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Conversation not found".to_string()));
        }
        Ok(())
    }

    /// Delete a conversation; messages cascade at the schema level.
    #[tracing::instrument(skip(self), fields(db.table = "conversations", db.operation = "delete", db.record_id = %conversation_id))]
    pub async fn delete(&self, user_id: Uuid, conversation_id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM conversations WHERE id = $1 AND user_id = $2")
            .bind(conversation_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Conversation not found".to_string()));
        }
        Ok(())
    }
}

/// Insert the user/assistant pair for one turn. Caller owns the transaction.
async fn insert_turn(
    tx: &mut Transaction<'_, Postgres>,
    conversation_id: Uuid,
    user_message: &str,
    assistant_message: &str,
    attachments: Option<&[String]>,
    sources: Option<&[RetrievalSource]>,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    let attachments_json = attachments.map(serde_json::to_value).transpose()?;
    let sources_json = sources.map(serde_json::to_value).transpose()?;

    sqlx::query(
        "INSERT INTO messages (id, conversation_id, role, content, attachments, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(Uuid::new_v4())
    .bind(conversation_id)
    .bind(MessageRole::User)
    .bind(user_message)
    .bind(attachments_json)
    .bind(now)
    .execute(&mut **tx)
    .await?;

    sqlx::query(
        "INSERT INTO messages (id, conversation_id, role, content, sources, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(Uuid::new_v4())
    .bind(conversation_id)
    .bind(MessageRole::Assistant)
    .bind(assistant_message)
    .bind(sources_json)
    .bind(now)
    .execute(&mut **tx)
    .await?;

    Ok(())
}
