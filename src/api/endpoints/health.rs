//! Health check endpoint.

use axum::Json;

use crate::api::types::HealthResponse;

/// `GET /health`: liveness check. Does not touch the OCR engine.
pub async fn check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: crate::config::APP_VERSION.to_string(),
    })
}
