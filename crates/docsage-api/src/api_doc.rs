//! OpenAPI documentation assembled from the handler annotations.
//! Served as JSON at `/api/openapi.json`.

use utoipa::OpenApi;

use crate::error;
use crate::handlers;
use docsage_core::models;

/// Returns the OpenAPI spec for the running service.
pub fn get_openapi_spec() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Docsage API",
        version = "0.1.0",
        description = "Multi-tenant document question answering: signup/login, conversation transcripts, chat, and document indexing proxied to the retrieval engine. All endpoints are versioned under /api/v0/."
    ),
    paths(
        // Auth
        handlers::auth::signup,
        handlers::auth::login,
        // Chat
        handlers::chat::ask,
        // Conversations
        handlers::conversations::list_conversations,
        handlers::conversations::get_conversation,
        handlers::conversations::save_turn,
        handlers::conversations::reserve_conversation,
        handlers::conversations::rename_conversation,
        handlers::conversations::delete_conversation,
        // Documents
        handlers::documents::upload_document,
        handlers::documents::list_documents,
        handlers::documents::delete_document,
    ),
    components(
        schemas(
            // Auth models
            models::SignupRequest,
            models::SignupUser,
            models::SignupResponse,
            models::LoginRequest,
            models::LoginResponse,
            models::MembershipRole,
            // Conversation models
            models::ConversationSummary,
            models::Message,
            models::MessageRole,
            models::SaveTurnRequest,
            models::SaveTurnResponse,
            models::TranscriptResponse,
            handlers::conversations::ConversationListResponse,
            handlers::conversations::ReserveRequest,
            handlers::conversations::RenameRequest,
            // Chat models
            models::ChatRequest,
            models::ChatHistoryEntry,
            models::ChatResponse,
            models::RetrievalSource,
            // Error
            error::ErrorResponse,
        )
    ),
    tags(
        (name = "auth", description = "Signup and credential login"),
        (name = "conversations", description = "Owner-scoped conversation transcripts"),
        (name = "chat", description = "Question answering over indexed documents"),
        (name = "documents", description = "Document upload, listing, and deletion, proxied to the retrieval engine")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_covers_every_mounted_api_route() {
        let spec = get_openapi_spec();
        for path in [
            "/api/v0/auth/signup",
            "/api/v0/auth/login",
            "/api/v0/chat",
            "/api/v0/conversations",
            "/api/v0/conversations/reserve",
            "/api/v0/conversations/{id}",
            "/api/v0/conversations/{id}/rename",
            "/api/v0/documents",
            "/api/v0/documents/{filename}",
        ] {
            assert!(
                spec.paths.paths.contains_key(path),
                "missing path in OpenAPI spec: {}",
                path
            );
        }
    }
}
