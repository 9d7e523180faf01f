//! 수집된 일봉 조회 API.
//!
//! # 모듈 구성
//!
//! - [`state`]: 핸들러 공유 상태 (AppState)
//! - [`routes`]: `/get`, `/health` 엔드포인트
//! - [`error`]: 에러 응답

pub mod error;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiErrorResponse, ApiResult};
pub use routes::create_router;
pub use state::AppState;
