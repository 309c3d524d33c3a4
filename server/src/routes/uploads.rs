use crate::error::{AppError, AppResult};
use crate::state::AppState;
use crate::uploads::UploadStore;
use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    routing::post,
    Json, Router,
};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    status: &'static str,
    message: &'static str,
    file_id: String,
    filename: String,
}

/// POST /upload_file
///
/// Expects the file in the multipart field `target_file`.
async fn upload_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<Json<UploadResponse>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        if field.name() != Some("target_file") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        if filename.is_empty() {
            return Err(AppError::BadRequest("No selected file".into()));
        }
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?;

        let store = UploadStore::new(&state.config.upload_dir);
        let file_id = store
            .save(&filename, &data)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to store upload: {e}")))?;
        tracing::info!(%file_id, %filename, "file uploaded");

        return Ok(Json(UploadResponse {
            status: "success",
            message: "File uploaded successfully",
            file_id,
            filename,
        }));
    }
    Err(AppError::BadRequest("No file part".into()))
}

pub fn router(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/upload_file", post(upload_file))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
}
