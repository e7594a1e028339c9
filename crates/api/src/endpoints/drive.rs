//! Drive endpoints for listing images.

use axum::{
    Router,
    extract::{DefaultBodyLimit, Multipart, State},
    routing::post,
};
use resource_common::{
    AppError, AppResult, UploadedFile, detect_image, generate_storage_key, is_allowed_image,
};
use serde::Serialize;
use tracing::info;

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// Room for the multipart framing around the file.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Uploaded file response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub url: String,
    pub key: String,
    pub size: u64,
    #[serde(rename = "type")]
    pub content_type: String,
    pub md5: String,
}

impl From<UploadedFile> for UploadResponse {
    fn from(file: UploadedFile) -> Self {
        Self {
            url: file.url,
            key: file.key,
            size: file.size,
            content_type: file.content_type,
            md5: file.md5,
        }
    }
}

/// Upload an image via multipart form; the `file` field is required.
async fn upload_file(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<ApiResponse<UploadResponse>> {
    let mut file_data = None;
    let mut content_type = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        content_type = field.content_type().map(ToString::to_string);
        file_data = Some(
            field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(e.to_string()))?,
        );
    }

    let data = file_data.ok_or_else(|| AppError::BadRequest("No file provided".to_string()))?;
    let content_type = content_type.unwrap_or_else(|| "application/octet-stream".to_string());

    if !is_allowed_image(&content_type) {
        return Err(AppError::Validation(format!(
            "Unsupported file type: {content_type}"
        )));
    }
    if data.is_empty() {
        return Err(AppError::Validation("File is empty".to_string()));
    }
    if data.len() > state.max_upload_bytes {
        return Err(AppError::Validation(format!(
            "File exceeds {} bytes",
            state.max_upload_bytes
        )));
    }

    // The declared type must agree with the bytes; the client file name is ignored.
    let kind = detect_image(&data)
        .filter(|kind| kind.content_type == content_type)
        .ok_or_else(|| {
            AppError::Validation(format!("File contents are not a valid {content_type}"))
        })?;

    let key = generate_storage_key(&user.id, kind);
    let file = state.storage.upload(&key, &data, kind.content_type).await?;
    info!(user_id = %user.id, key = %file.key, size = file.size, "Image uploaded");

    Ok(ApiResponse::created(file.into()))
}

/// Create drive router. `max_upload_bytes` bounds the request body.
pub fn router(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/upload", post(upload_file))
        .layer(DefaultBodyLimit::max(max_upload_bytes + MULTIPART_OVERHEAD))
}
