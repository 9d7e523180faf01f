//! 헬스 체크 endpoint.

use axum::{http::StatusCode, response::IntoResponse};

/// 간단한 헬스 체크 (liveness probe용).
///
/// GET /health
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}
