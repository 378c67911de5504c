use axum::{
    Json,
    http::{StatusCode, Uri},
    response::IntoResponse,
};
use serde_json::json;
use tracing::info;

use super::error_responses::ErrorResponse;

pub async fn not_found(uri: Uri) -> impl IntoResponse {
    info!(path = %uri.path(), "booking router: no route matched");
    ErrorResponse::new(StatusCode::NOT_FOUND, "not_found", "Route not found")
}

pub async fn health_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({ "status": "ok", "service": env!("CARGO_PKG_NAME") })),
    )
}
