//! Conversation handlers: list, transcript, create-or-append, reserve, rename,
//! delete.
//!
//! Every operation is scoped to the session's user; a conversation owned by
//! someone else answers `NotFound`, indistinguishable from one that does not
//! exist.

use crate::auth::models::SessionContext;
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use docsage_core::models::{
    ConversationSummary, SaveTurnRequest, SaveTurnResponse, TranscriptResponse,
};
use docsage_core::validation::validate_title;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Serialize, ToSchema)]
pub struct ConversationListResponse {
    pub conversations: Vec<ConversationSummary>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ReserveRequest {
    /// Title seed, normally the pending first user message.
    pub title: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RenameRequest {
    pub title: String,
}

#[utoipa::path(
    get,
    path = "/api/v0/conversations",
    tag = "conversations",
    responses(
        (status = 200, description = "Conversation summaries, most recently updated first", body = ConversationListResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(user_id = %session.user_id, operation = "list_conversations"))]
pub async fn list_conversations(
    State(state): State<Arc<AppState>>,
    session: SessionContext,
) -> Result<impl IntoResponse, HttpAppError> {
    let conversations = state.conversation_repository.list(session.user_id).await?;
    Ok(Json(ConversationListResponse { conversations }))
}

#[utoipa::path(
    get,
    path = "/api/v0/conversations/{id}",
    tag = "conversations",
    params(("id" = Uuid, Path, description = "Conversation ID")),
    responses(
        (status = 200, description = "Full transcript", body = TranscriptResponse),
        (status = 404, description = "Conversation not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(user_id = %session.user_id, conversation_id = %id, operation = "get_conversation"))]
pub async fn get_conversation(
    State(state): State<Arc<AppState>>,
    session: SessionContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let (conversation, messages) = state
        .conversation_repository
        .get(session.user_id, id)
        .await?;
    Ok(Json(TranscriptResponse {
        id: conversation.id,
        title: conversation.title,
        messages,
    }))
}

#[utoipa::path(
    post,
    path = "/api/v0/conversations",
    tag = "conversations",
    request_body = SaveTurnRequest,
    responses(
        (status = 200, description = "Turn persisted", body = SaveTurnResponse),
        (status = 404, description = "Conversation not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, request), fields(user_id = %session.user_id, operation = "save_turn"))]
pub async fn save_turn(
    State(state): State<Arc<AppState>>,
    session: SessionContext,
    Json(request): Json<SaveTurnRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let attachments = request.attachments.as_deref();
    let sources = request.sources.as_deref();

    let conversation_id = match request.conversation_id {
        Some(id) => {
            state
                .conversation_repository
                .append_turn(
                    session.user_id,
                    id,
                    &request.user_message,
                    &request.assistant_message,
                    attachments,
                    sources,
                )
                .await?;
            id
        }
        None => {
            state
                .conversation_repository
                .create(
                    session.user_id,
                    &request.user_message,
                    &request.assistant_message,
                    attachments,
                    sources,
                )
                .await?
        }
    };

    Ok(Json(SaveTurnResponse { conversation_id }))
}

#[utoipa::path(
    post,
    path = "/api/v0/conversations/reserve",
    tag = "conversations",
    request_body = ReserveRequest,
    responses(
        (status = 201, description = "Conversation id reserved", body = SaveTurnResponse)
    )
)]
#[tracing::instrument(skip(state, request), fields(user_id = %session.user_id, operation = "reserve_conversation"))]
pub async fn reserve_conversation(
    State(state): State<Arc<AppState>>,
    session: SessionContext,
    Json(request): Json<ReserveRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let title = validate_title(&request.title)?;
    let conversation_id = state
        .conversation_repository
        .reserve(session.user_id, &title)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(SaveTurnResponse { conversation_id }),
    ))
}

#[utoipa::path(
    patch,
    path = "/api/v0/conversations/{id}/rename",
    tag = "conversations",
    params(("id" = Uuid, Path, description = "Conversation ID")),
    request_body = RenameRequest,
    responses(
        (status = 204, description = "Renamed"),
        (status = 400, description = "Empty title", body = ErrorResponse),
        (status = 404, description = "Conversation not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, request), fields(user_id = %session.user_id, conversation_id = %id, operation = "rename_conversation"))]
pub async fn rename_conversation(
    State(state): State<Arc<AppState>>,
    session: SessionContext,
    Path(id): Path<Uuid>,
    Json(request): Json<RenameRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let title = validate_title(&request.title)?;
    state
        .conversation_repository
        .rename(session.user_id, id, &title)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    delete,
    path = "/api/v0/conversations/{id}",
    tag = "conversations",
    params(("id" = Uuid, Path, description = "Conversation ID")),
    responses(
        (status = 204, description = "Deleted, messages cascaded"),
        (status = 404, description = "Conversation not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(user_id = %session.user_id, conversation_id = %id, operation = "delete_conversation"))]
pub async fn delete_conversation(
    State(state): State<Arc<AppState>>,
    session: SessionContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    state
        .conversation_repository
        .delete(session.user_id, id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
