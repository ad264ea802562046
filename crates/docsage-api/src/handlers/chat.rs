//! Question dispatch handler.
//!
//! The handler never trusts identity fields from the request body: the user
//! and organization ids sent to the engine come from the verified session,
//! and the trailing history is clamped server-side.

use crate::auth::models::SessionContext;
use crate::error::{ErrorResponse, HttpAppError};
use crate::retrieval::{AskRequest, RetrievalGateway};
use crate::state::AppState;
use axum::{extract::State, response::IntoResponse, Json};
use docsage_core::models::{clamp_history, ChatRequest, ChatResponse};
use docsage_core::AppError;
use std::sync::Arc;

#[utoipa::path(
    post,
    path = "/api/v0/chat",
    tag = "chat",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Answer with supporting sources", body = ChatResponse),
        (status = 400, description = "Empty question", body = ErrorResponse),
        (status = 502, description = "Retrieval engine error", body = ErrorResponse),
        (status = 504, description = "Retrieval engine timed out", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, request), fields(user_id = %session.user_id, organization_id = %session.organization_id, operation = "ask"))]
pub async fn ask(
    State(state): State<Arc<AppState>>,
    session: SessionContext,
    Json(request): Json<ChatRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let question = request.question.trim();
    if question.is_empty() {
        return Err(AppError::Validation("Question must not be empty".to_string()).into());
    }

    let history = clamp_history(&request.history).to_vec();

    let answer = state
        .engine
        .ask(AskRequest {
            question: question.to_string(),
            user_id: session.user_id,
            organization_id: session.organization_id,
            conversation_id: request.conversation_id,
            history,
        })
        .await?;

    Ok(Json(answer))
}
