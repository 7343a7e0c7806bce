use crate::utils::error::CoinError;
use axum::{
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Renders every failure as `{ "detail": "..." }` with the mapped status code.
impl IntoResponse for CoinError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let detail = self.detail();

        if self.is_upstream() {
            tracing::error!("❌ Vision API call failed ({}): {}", status, detail);
        } else if status.is_server_error() {
            tracing::error!("❌ Request failed ({}): {}", status, detail);
        } else {
            tracing::warn!("Request rejected ({}): {}", status, detail);
        }

        (status, Json(json!({ "detail": detail }))).into_response()
    }
}
