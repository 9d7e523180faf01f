//! 크롤 상태 저장과 재개 슬롯.
//!
//! `fetcher_state` 테이블은 추가 전용이며 가장 최근 행만 유효합니다.
//! 저장은 패스가 끝났을 때와 프로세스 종료 시에 일어납니다.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use fetcher_core::{FetcherState, RequestState};
use fetcher_data::StockStore;
use tracing::{debug, info};

use crate::Result;

/// 크롤 상태 저장소.
#[derive(Clone)]
pub struct CrawlStateStore {
    store: Arc<dyn StockStore>,
    freshness: chrono::Duration,
}

impl CrawlStateStore {
    pub fn new(store: Arc<dyn StockStore>, freshness: chrono::Duration) -> Self {
        Self { store, freshness }
    }

    /// 가장 최근 상태를 읽습니다.
    ///
    /// 저장된 상태가 없으면 빈 상태와 `false`를 반환합니다.
    pub async fn load(&self) -> Result<(FetcherState, bool)> {
        match self.store.latest_fetcher_state().await? {
            Some(state) => {
                info!(
                    state_id = ?state.state_id,
                    created_at = %state.created_at,
                    finished = state.finished,
                    "크롤 상태 로드"
                );
                Ok((state, true))
            }
            None => {
                info!("저장된 크롤 상태 없음, 새로 시작");
                Ok((FetcherState::new(Utc::now()), false))
            }
        }
    }

    /// 상태를 새 행으로 추가합니다.
    pub async fn save(&self, state: &FetcherState) -> Result<()> {
        self.store.insert_fetcher_state(state).await?;
        debug!(finished = state.finished, created_at = %state.created_at, "크롤 상태 저장");
        Ok(())
    }

    /// 완료 표시가 있고 아직 최신 기간 안인지.
    pub fn has_recently_completed(&self, state: &FetcherState, now: DateTime<Utc>) -> bool {
        state.is_recently_completed(now, self.freshness)
    }
}

/// 리소스 종류별 재개 슬롯.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResumeSlots {
    pub tickers: RequestState,
    pub details: RequestState,
    pub stocks: RequestState,
}

impl ResumeSlots {
    /// 저장된 상태의 URL로 슬롯을 채웁니다.
    pub fn from_state(state: &FetcherState) -> Self {
        Self {
            tickers: RequestState::cached(state.ticker_req_url.clone()),
            details: RequestState::cached(state.ticker_details_req_url.clone()),
            stocks: RequestState::cached(state.stock_req_url.clone()),
        }
    }

    /// 슬롯의 URL을 상태에 반영합니다.
    pub fn apply_to(&self, state: &mut FetcherState) {
        state.ticker_req_url.clone_from(&self.tickers.request_url);
        state.ticker_details_req_url.clone_from(&self.details.request_url);
        state.stock_req_url.clone_from(&self.stocks.request_url);
    }

    /// 슬롯 URL을 담은 새 상태.
    pub fn to_state(&self, now: DateTime<Utc>, finished: bool) -> FetcherState {
        let mut state = FetcherState::new(now);
        self.apply_to(&mut state);
        state.finished = finished;
        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use fetcher_data::MemoryStore;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 9, 30, 0).unwrap()
    }

    fn checkpoint() -> CrawlStateStore {
        CrawlStateStore::new(Arc::new(MemoryStore::new()), Duration::hours(24))
    }

    #[tokio::test]
    async fn test_load_without_rows_returns_fresh_state() {
        let (state, found) = checkpoint().load().await.unwrap();
        assert!(!found);
        assert!(!state.finished);
        assert!(state.ticker_req_url.is_empty());
    }

    #[tokio::test]
    async fn test_save_then_load_round_trip() {
        let checkpoint = checkpoint();
        let mut saved = FetcherState::new(t0());
        saved.ticker_req_url = "https://api.polygon.io/v3/reference/tickers?active=true&order=asc&cursor=abc".into();
        saved.ticker_details_req_url = "https://api.polygon.io/v3/reference/tickers/AAPL".into();
        saved.stock_req_url = "https://api.polygon.io/v2/aggs/ticker/AAPL/range/1/day/2023-06-01/2024-06-01".into();
        saved.finished = true;

        checkpoint.save(&saved).await.unwrap();
        let (loaded, found) = checkpoint.load().await.unwrap();

        assert!(found);
        assert_eq!(loaded.ticker_req_url, saved.ticker_req_url);
        assert_eq!(loaded.ticker_details_req_url, saved.ticker_details_req_url);
        assert_eq!(loaded.stock_req_url, saved.stock_req_url);
        assert_eq!(loaded.created_at, saved.created_at);
        assert!(loaded.finished);
    }

    #[tokio::test]
    async fn test_recently_completed_with_simulated_clock() {
        let checkpoint = checkpoint();
        let mut saved = FetcherState::new(t0());
        saved.finished = true;
        checkpoint.save(&saved).await.unwrap();

        let (loaded, _) = checkpoint.load().await.unwrap();
        assert!(checkpoint.has_recently_completed(&loaded, t0()));
        assert!(checkpoint.has_recently_completed(&loaded, t0() + Duration::hours(23)));
        assert!(!checkpoint.has_recently_completed(&loaded, t0() + Duration::hours(24)));
    }

    #[tokio::test]
    async fn test_unfinished_state_is_never_recent() {
        let checkpoint = checkpoint();
        checkpoint.save(&FetcherState::new(t0())).await.unwrap();

        let (loaded, _) = checkpoint.load().await.unwrap();
        assert!(!checkpoint.has_recently_completed(&loaded, t0()));
    }

    #[test]
    fn test_slots_round_trip_through_state() {
        let mut state = FetcherState::new(t0());
        state.ticker_req_url = "list".into();
        state.stock_req_url = "bars".into();

        let slots = ResumeSlots::from_state(&state);
        assert!(slots.tickers.is_pending());
        assert!(!slots.details.is_pending());

        let restored = slots.to_state(t0(), false);
        assert_eq!(restored.ticker_req_url, "list");
        assert_eq!(restored.ticker_details_req_url, "");
        assert_eq!(restored.stock_req_url, "bars");
    }
}
