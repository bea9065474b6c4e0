//! Transcript management endpoints

use axum::{
    extract::{multipart::MultipartRejection, Multipart, Query, State},
    response::Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ApiError, ApiResult};
use crate::vector_store::TranscriptPage;
use crate::AppState;

pub const DEFAULT_PAGE_SIZE: u32 = 100;
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Deserialize)]
pub struct ListParams {
    #[serde(default)]
    pub limit: Option<String>,
    #[serde(default)]
    pub after: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteParams {
    #[serde(default)]
    pub file_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub success: bool,
    pub file_id: String,
    pub file_name: String,
    pub vector_store_file: Value,
    pub message: String,
}

fn page_size(raw: Option<&str>) -> ApiResult<u32> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(DEFAULT_PAGE_SIZE),
        Some(s) => s
            .parse::<u32>()
            .map(|n| n.clamp(1, MAX_PAGE_SIZE))
            .map_err(|_| ApiError::BadRequest(format!("Invalid limit: {}", s))),
    }
}

/// Uploads must look like plain text by name or by declared MIME type
pub fn is_text_upload(filename: &str, content_type: Option<&str>) -> bool {
    filename.to_lowercase().ends_with(".txt")
        || content_type.map(|ct| ct.contains("text")).unwrap_or(false)
}

pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<TranscriptPage>> {
    let limit = page_size(params.limit.as_deref())?;
    let after = params.after.as_deref().filter(|s| !s.is_empty());

    let page = state
        .vector_store
        .list_files(limit, after)
        .await
        .map_err(|e| e.into_api_error("Failed to list transcripts"))?;

    tracing::debug!(count = page.files.len(), has_more = page.has_more, "listed transcripts");
    Ok(Json(page))
}

pub async fn delete(
    State(state): State<AppState>,
    Query(params): Query<DeleteParams>,
) -> ApiResult<Json<DeleteResponse>> {
    state
        .vector_store
        .ensure_configured()
        .map_err(|e| e.into_api_error("Failed to delete transcript"))?;

    let file_id = params
        .file_id
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("File ID is required".into()))?;

    state
        .vector_store
        .delete_file(&file_id)
        .await
        .map_err(|e| e.into_api_error("Failed to delete transcript"))?;

    Ok(Json(DeleteResponse {
        success: true,
        message: "File deleted successfully".into(),
    }))
}

pub async fn upload(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<UploadResponse>> {
    state
        .vector_store
        .ensure_configured()
        .map_err(|e| e.into_api_error("Failed to upload transcript"))?;

    let mut multipart = multipart.map_err(|e| {
        ApiError::BadRequest(format!("Expected multipart form data: {}", e.body_text()))
    })?;

    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid upload: {}", e.body_text())))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let Some(filename) = field.file_name().map(str::to_string) else {
            continue;
        };
        let content_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Invalid upload: {}", e.body_text())))?;
        upload = Some((filename, content_type, bytes));
        break;
    }

    let (filename, content_type, bytes) =
        upload.ok_or_else(|| ApiError::BadRequest("No file provided".into()))?;

    if !is_text_upload(&filename, content_type.as_deref()) {
        return Err(ApiError::BadRequest("Only text files are allowed".into()));
    }

    let content_type = content_type.unwrap_or_else(|| "text/plain".to_string());
    tracing::info!(%filename, %content_type, size = bytes.len(), "uploading transcript");

    let uploaded = state
        .vector_store
        .upload_file(&filename, &content_type, bytes.to_vec())
        .await
        .map_err(|e| e.into_api_error("Failed to upload transcript"))?;

    Ok(Json(UploadResponse {
        success: true,
        file_id: uploaded.file_id,
        file_name: filename,
        vector_store_file: uploaded.vector_store_file,
        message: "Transcript uploaded successfully".into(),
    }))
}
