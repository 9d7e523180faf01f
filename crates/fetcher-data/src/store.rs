//! 저장소 인터페이스.

use async_trait::async_trait;
use fetcher_core::{FetcherState, Stock, Ticker, TickerDetails};

use crate::error::Result;

/// 수집 데이터 저장소.
///
/// 엔티티 삽입은 자연 키 충돌 시 아무것도 하지 않으며, 실제로 삽입된 행 수를 반환합니다.
#[async_trait]
pub trait StockStore: Send + Sync {
    async fn upsert_tickers(&self, tickers: &[Ticker]) -> Result<u64>;

    async fn upsert_ticker_details(&self, details: &[TickerDetails]) -> Result<u64>;

    async fn upsert_stocks(&self, stocks: &[Stock]) -> Result<u64>;

    /// 크롤 상태를 새 행으로 추가합니다 (기존 행은 수정하지 않음).
    async fn insert_fetcher_state(&self, state: &FetcherState) -> Result<()>;

    /// 가장 최근에 생성된 크롤 상태.
    async fn latest_fetcher_state(&self) -> Result<Option<FetcherState>>;

    /// 티커의 일봉을 시간 오름차순으로 조회합니다.
    async fn query_stocks(&self, ticker_id: &str) -> Result<Vec<Stock>>;
}
