//! API 에러 응답.
//!
//! 모든 에러는 같은 JSON 형식으로 렌더링됩니다.
//!
//! ```json
//! {
//!   "code": "NOT_FOUND",
//!   "message": "stocks not found. try later",
//!   "timestamp": 1738300800
//! }
//! ```

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use fetcher_data::DataError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;

/// 에러 응답 본문.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    /// 에러 코드 (예: "INVALID_INPUT", "NOT_FOUND")
    pub code: String,
    /// 사람이 읽을 수 있는 에러 메시지
    pub message: String,
    /// 에러 발생 시각 (Unix timestamp)
    pub timestamp: i64,
}

impl ApiErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

/// 조회 API 에러.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("ticker is required")]
    MissingTicker,

    #[error("unsupported format: {0}")]
    InvalidFormat(String),

    #[error("stocks not found. try later")]
    NotFound,

    #[error("storage error: {0}")]
    Storage(#[from] DataError),

    #[error("encoding error: {0}")]
    Encode(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingTicker | Self::InvalidFormat(_) => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Storage(_) | Self::Encode(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingTicker | Self::InvalidFormat(_) => "INVALID_INPUT",
            Self::NotFound => "NOT_FOUND",
            Self::Storage(_) => "DB_ERROR",
            Self::Encode(_) => "ENCODE_ERROR",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error = %self, "조회 요청 처리 실패");
        }
        let body = ApiErrorResponse::new(self.code(), self.to_string());
        (status, Json(body)).into_response()
    }
}

/// API 핸들러 Result 타입 별칭.
pub type ApiResult<T> = Result<T, ApiError>;
