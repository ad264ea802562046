//! Document proxy handlers.
//!
//! Document bytes and indexing live in the retrieval engine; this service
//! validates uploads (size, extension), stamps the session's identity onto
//! each call, and passes engine responses through unchanged. The engine
//! enforces the deletion permission gate; a 403 from it propagates as-is.

use crate::auth::models::SessionContext;
use crate::error::{ErrorResponse, HttpAppError};
use crate::retrieval::DocumentScope;
use crate::state::AppState;
use axum::{
    extract::{Multipart, Path, Query, State},
    response::IntoResponse,
    Json,
};
use docsage_core::AppError;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    /// When true the document is indexed organization-wide instead of for the
    /// uploading user only.
    #[serde(default)]
    pub organization_wide: bool,
    /// Optional conversation to link a personal document to.
    pub conversation_id: Option<Uuid>,
}

/// Read the single "file" field out of a multipart form.
async fn extract_multipart_file(mut multipart: Multipart) -> Result<(Vec<u8>, String), AppError> {
    let mut file_data: Option<Vec<u8>> = None;
    let mut filename: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Failed to read multipart: {}", e)))?
    {
        let field_name = field.name().map(|s| s.to_string()).unwrap_or_default();

        if field_name == "file" {
            if file_data.is_some() {
                return Err(AppError::Validation(
                    "Multiple file fields are not allowed; send exactly one field named 'file'"
                        .to_string(),
                ));
            }
            filename = field.file_name().map(|s: &str| s.to_string());
            let data = field
                .bytes()
                .await
                .map_err(|e| AppError::Validation(format!("Failed to read file data: {}", e)))?;
            file_data = Some(data.to_vec());
        }
    }

    let file_data =
        file_data.ok_or_else(|| AppError::Validation("No file provided".to_string()))?;
    let filename = filename.ok_or_else(|| AppError::Validation("Missing filename".to_string()))?;

    Ok((file_data, filename))
}

fn validate_file_size(file_size: usize, max_size: usize) -> Result<(), AppError> {
    if file_size > max_size {
        return Err(AppError::PayloadTooLarge(format!(
            "File size exceeds maximum allowed size of {} MB",
            max_size / 1024 / 1024
        )));
    }
    Ok(())
}

fn validate_file_extension(filename: &str, allowed_extensions: &[String]) -> Result<(), AppError> {
    let extension = filename.rsplit('.').next().unwrap_or("").to_lowercase();
    if !allowed_extensions.contains(&extension) {
        return Err(AppError::Validation(format!(
            "Invalid file extension. Allowed extensions: {}",
            allowed_extensions.join(", ")
        )));
    }
    Ok(())
}

/// Strip any path components and suspicious characters from the client-supplied
/// filename before it travels to the engine.
fn sanitize_filename(filename: &str) -> Result<String, AppError> {
    const MAX_FILENAME_LENGTH: usize = 255;

    // Checked on the raw input: a parent-dir component would be erased by
    // file_name() below and slip through.
    if filename.contains("..") {
        return Err(AppError::Validation(
            "Filename contains invalid path traversal".to_string(),
        ));
    }

    let path = std::path::Path::new(filename);
    let filename_only = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(filename);

    let sanitized: String = filename_only
        .chars()
        .take(MAX_FILENAME_LENGTH)
        .map(|c| {
            if c.is_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if sanitized.trim().is_empty() || sanitized.len() < 3 {
        return Err(AppError::Validation("Filename is too short".to_string()));
    }

    Ok(sanitized)
}

#[utoipa::path(
    post,
    path = "/api/v0/documents",
    tag = "documents",
    params(
        ("organization_wide" = Option<bool>, Query, description = "Index for the whole organization instead of the uploading user"),
        ("conversation_id" = Option<Uuid>, Query, description = "Conversation to link a personal document to")
    ),
    request_body(content = inline(Object), content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Document accepted for indexing"),
        (status = 400, description = "Invalid file", body = ErrorResponse),
        (status = 413, description = "File too large", body = ErrorResponse),
        (status = 502, description = "Retrieval engine error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, multipart), fields(user_id = %session.user_id, operation = "upload_document"))]
pub async fn upload_document(
    State(state): State<Arc<AppState>>,
    session: SessionContext,
    Query(query): Query<UploadQuery>,
    multipart: Multipart,
) -> Result<impl IntoResponse, HttpAppError> {
    let (content, raw_filename) = extract_multipart_file(multipart).await?;

    validate_file_size(content.len(), state.config.max_document_size_bytes)?;
    let filename = sanitize_filename(&raw_filename)?;
    validate_file_extension(&filename, &state.config.document_allowed_extensions)?;

    let scope = if query.organization_wide {
        DocumentScope::Organization {
            organization_id: session.organization_id,
        }
    } else {
        DocumentScope::Personal {
            user_id: session.user_id,
            conversation_id: query.conversation_id,
        }
    };

    tracing::info!(
        filename = %filename,
        size_bytes = content.len(),
        organization_wide = query.organization_wide,
        "Forwarding document to retrieval engine"
    );

    let body = state.engine.upload_document(scope, filename, content).await?;
    Ok(Json(body))
}

#[utoipa::path(
    get,
    path = "/api/v0/documents",
    tag = "documents",
    responses(
        (status = 200, description = "Documents visible to the caller"),
        (status = 502, description = "Retrieval engine error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(user_id = %session.user_id, operation = "list_documents"))]
pub async fn list_documents(
    State(state): State<Arc<AppState>>,
    session: SessionContext,
) -> Result<impl IntoResponse, HttpAppError> {
    let body = state
        .engine
        .list_documents(session.user_id, session.organization_id)
        .await?;
    Ok(Json(body))
}

#[utoipa::path(
    delete,
    path = "/api/v0/documents/{filename}",
    tag = "documents",
    params(("filename" = String, Path, description = "Document filename")),
    responses(
        (status = 200, description = "Document removed"),
        (status = 403, description = "Deletion not permitted for this role", body = ErrorResponse),
        (status = 502, description = "Retrieval engine error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(user_id = %session.user_id, operation = "delete_document"))]
pub async fn delete_document(
    State(state): State<Arc<AppState>>,
    session: SessionContext,
    Path(filename): Path<String>,
) -> Result<impl IntoResponse, HttpAppError> {
    let filename = sanitize_filename(&filename)?;
    let body = state
        .engine
        .delete_document(&filename, session.user_id, session.role)
        .await?;
    Ok(Json(body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_filename_rejects_path_traversal() {
        assert!(sanitize_filename("..").is_err());
        assert!(sanitize_filename("foo/../bar").is_err());
        assert!(sanitize_filename("../../etc/passwd").is_err());
    }

    #[test]
    fn sanitize_filename_strips_directories() {
        assert_eq!(sanitize_filename("/tmp/report.pdf").unwrap(), "report.pdf");
        assert_eq!(sanitize_filename("notes (1).pdf").unwrap(), "notes__1_.pdf");
    }

    #[test]
    fn oversized_file_is_rejected() {
        assert!(validate_file_size(10, 100).is_ok());
        let err = validate_file_size(101, 100).unwrap_err();
        assert!(matches!(err, AppError::PayloadTooLarge(_)));
    }

    #[test]
    fn extension_allowlist_is_case_insensitive() {
        let allowed = vec!["pdf".to_string()];
        assert!(validate_file_extension("report.PDF", &allowed).is_ok());
        assert!(validate_file_extension("report.docx", &allowed).is_err());
    }
}
