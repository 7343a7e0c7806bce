use crate::core::health::{diagnostics, DiagnosticsReport};
use crate::domain::model::{AnalyzeResponse, ImageUpload};
use crate::server::AppState;
use crate::utils::error::{CoinError, Result};
use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        Multipart, State,
    },
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

/// Multipart field that carries the coin image.
pub const UPLOAD_FIELD: &str = "file";

/// Handler for `GET /`
pub async fn root() -> Json<Value> {
    Json(json!({ "message": "Coin Identifier API is running" }))
}

/// Handler for `GET /test`. Always answers 200; failures land inside the report.
pub async fn test_database(State(state): State<AppState>) -> Json<DiagnosticsReport> {
    Json(diagnostics(state.analysis.store(), &state.database).await)
}

/// Handler for `POST /api/analyze`
pub async fn analyze(
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<AnalyzeResponse>> {
    let multipart = multipart.map_err(|rejection| CoinError::InvalidUploadError {
        status: rejection.status().as_u16(),
        message: rejection.body_text(),
    })?;
    let upload = read_upload(multipart, state.max_upload_bytes).await?;
    let response = state.analysis.analyze(upload).await?;
    Ok(Json(response))
}

async fn read_upload(mut multipart: Multipart, limit: usize) -> Result<ImageUpload> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| upload_error(e, limit))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let filename = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.map_err(|e| upload_error(e, limit))?;

        return Ok(ImageUpload {
            filename,
            content_type,
            bytes: bytes.to_vec(),
        });
    }

    Err(CoinError::missing_upload_field(UPLOAD_FIELD))
}

// 超過上傳大小限制時狀態碼為 413
fn upload_error(err: MultipartError, limit: usize) -> CoinError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return CoinError::upload_too_large(limit);
    }
    CoinError::InvalidUploadError {
        status: err.status().as_u16(),
        message: err.body_text(),
    }
}
