//! 핸들러 공유 상태.

use std::sync::Arc;

use fetcher_data::StockStore;

/// 애플리케이션 공유 상태.
///
/// 라우터 생성 시 한 번 만들어져 Axum의 State extractor로 주입됩니다.
#[derive(Clone)]
pub struct AppState {
    /// 일봉 조회 저장소
    pub store: Arc<dyn StockStore>,
}

impl AppState {
    pub fn new(store: Arc<dyn StockStore>) -> Self {
        Self { store }
    }
}
