//! API 라우트.
//!
//! # 라우트 구조
//!
//! - `/health` - 헬스 체크 (liveness)
//! - `/get` - 티커별 일봉 조회 (CSV/JSON)

pub mod health;
pub mod stocks;

use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub use health::health_check;
pub use stocks::{get_stocks, post_stocks, ExportFormat, StocksQuery, StocksResponse};

/// 라우터를 생성합니다. 시작 시 한 번만 만들어 서버에 넘깁니다.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/get", get(get_stocks).post(post_stocks))
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}
