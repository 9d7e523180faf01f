//! 티커별 상세/일봉 수집.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use fetcher_data::BatchedStorage;
use fetcher_provider::polygon::schema::TickerResult;
use fetcher_provider::PolygonClient;
use tokio::sync::watch;
use tracing::{debug, warn};

use super::checkpoint::ResumeSlots;
use super::orchestrator::CrawlSnapshot;
use super::ticker_walk::TickerVisitor;
use crate::error::CollectorError;
use crate::stats::PassStats;
use crate::Result;

/// 일봉 조회 구간 (`now - window` ~ `now`, 일 단위).
pub fn date_range(now: DateTime<Utc>, window: chrono::Duration) -> (NaiveDate, NaiveDate) {
    ((now - window).date_naive(), now.date_naive())
}

/// 한 패스 동안 티커마다 상세와 일봉을 가져와 저장합니다.
///
/// 요청 URL은 재개 슬롯을 거쳐 정해지며, 정해진 URL은 곧바로 스냅샷에 반영됩니다.
/// 중지 플래그가 켜지면 다음 페이지나 티커로 넘어가지 않고 `CollectorError::Cancelled`를
/// 반환합니다. 진행 중인 요청과 저장은 끝까지 마칩니다.
pub struct TickerFetcher<'a> {
    client: &'a PolygonClient,
    storage: &'a BatchedStorage,
    slots: &'a mut ResumeSlots,
    snapshot: &'a watch::Sender<CrawlSnapshot>,
    window: chrono::Duration,
    stats: &'a mut PassStats,
    stop: Option<&'a watch::Receiver<bool>>,
}

impl<'a> TickerFetcher<'a> {
    pub fn new(
        client: &'a PolygonClient,
        storage: &'a BatchedStorage,
        slots: &'a mut ResumeSlots,
        snapshot: &'a watch::Sender<CrawlSnapshot>,
        window: chrono::Duration,
        stats: &'a mut PassStats,
    ) -> Self {
        Self {
            client,
            storage,
            slots,
            snapshot,
            window,
            stats,
            stop: None,
        }
    }

    /// 중지 플래그를 연결합니다.
    pub fn with_stop(mut self, stop: Option<&'a watch::Receiver<bool>>) -> Self {
        self.stop = stop;
        self
    }

    fn ensure_running(&self) -> Result<()> {
        match self.stop {
            Some(stop) if *stop.borrow() => Err(CollectorError::Cancelled),
            _ => Ok(()),
        }
    }

    /// 티커 상세를 가져와 저장합니다.
    pub async fn fetch_details(&mut self, ticker_id: &str) -> Result<()> {
        let fresh = self.client.endpoints().ticker_details_url(ticker_id);
        let url = self
            .slots
            .details
            .resolve(fresh.clone(), |cached| cached == fresh);
        self.publish();

        let details = self.client.ticker_details(&url).await?;
        self.storage.put_ticker_details(details).await?;
        self.stats.details += 1;
        Ok(())
    }

    /// 일봉을 가져와 저장합니다. 조회 결과가 없으면 건너뜁니다.
    pub async fn fetch_prices(&mut self, ticker_id: &str) -> Result<()> {
        let (from, to) = date_range(Utc::now(), self.window);
        let fresh = self.client.endpoints().stocks_url(ticker_id, from, to);
        let endpoints = self.client.endpoints();
        let url = self
            .slots
            .stocks
            .resolve(fresh, |cached| endpoints.is_stocks_url_for(cached, ticker_id));
        self.publish();

        let stocks = self.client.stocks(&url, ticker_id).await?;
        if stocks.is_empty() {
            warn!(ticker = %ticker_id, "일봉 없음, 건너뜀");
            self.stats.empty += 1;
            return Ok(());
        }

        debug!(ticker = %ticker_id, bars = stocks.len(), "일봉 수신");
        self.stats.bars += stocks.len();
        self.storage.put_stocks(stocks).await?;
        Ok(())
    }

    fn publish(&self) {
        let slots = &*self.slots;
        self.snapshot
            .send_modify(|snapshot| slots.apply_to(&mut snapshot.checkpoint));
    }
}

#[async_trait]
impl TickerVisitor for TickerFetcher<'_> {
    async fn on_page(&mut self, url: &str) -> Result<()> {
        self.ensure_running()?;
        self.slots.tickers.record(url);
        self.publish();
        Ok(())
    }

    async fn on_ticker(&mut self, result: TickerResult) -> Result<()> {
        self.ensure_running()?;
        if result.ticker.is_empty() {
            warn!("티커 식별자가 없는 항목, 건너뜀");
            return Ok(());
        }

        let ticker = result.into_ticker(Utc::now());
        let ticker_id = ticker.ticker_id.clone();
        self.storage.put_ticker(ticker).await?;

        self.fetch_details(&ticker_id).await?;
        self.fetch_prices(&ticker_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::OrchestratorState;
    use chrono::TimeZone;
    use fetcher_core::{CrawlMode, FetcherState};
    use fetcher_data::{BatchConfig, MemoryStore};
    use fetcher_provider::{HttpClient, PolygonEndpoints, RetryConfig};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_stop_flag_skips_next_ticker() {
        // 요청이 나가면 연결 실패로 드러난다
        let http =
            HttpClient::new(Duration::from_secs(1), RetryConfig::new(1, Duration::ZERO)).unwrap();
        let endpoints = PolygonEndpoints::new("http://127.0.0.1:9").unwrap();
        let client = PolygonClient::new(http, endpoints);
        let store = Arc::new(MemoryStore::new());
        let storage = BatchedStorage::new(store.clone(), BatchConfig::default());
        let mut slots = ResumeSlots::default();
        let (snapshot, _) = watch::channel(CrawlSnapshot {
            state: OrchestratorState::Idle,
            mode: CrawlMode::Bulk,
            retries_left: 0,
            checkpoint: FetcherState::new(Utc::now()),
        });
        let mut stats = PassStats::new(CrawlMode::Bulk);
        let (_stop_tx, stop_rx) = watch::channel(true);

        let mut fetcher = TickerFetcher::new(
            &client,
            &storage,
            &mut slots,
            &snapshot,
            chrono::Duration::hours(24),
            &mut stats,
        )
        .with_stop(Some(&stop_rx));

        let result: TickerResult =
            serde_json::from_value(serde_json::json!({ "ticker": "AAA" })).unwrap();
        assert!(matches!(
            fetcher.on_ticker(result).await,
            Err(CollectorError::Cancelled)
        ));
        assert!(matches!(
            fetcher.on_page("http://127.0.0.1:9/v3/reference/tickers").await,
            Err(CollectorError::Cancelled)
        ));
        assert_eq!(storage.pending().await, (0, 0, 0));
        assert!(slots.tickers.request_url.is_empty());
        assert_eq!(store.ticker_count().await, 0);
    }

    #[test]
    fn test_date_range_truncates_to_days() {
        let now = Utc.with_ymd_and_hms(2024, 6, 2, 15, 45, 0).unwrap();

        let (from, to) = date_range(now, chrono::Duration::hours(24));
        assert_eq!(from, NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
        assert_eq!(to, NaiveDate::from_ymd_opt(2024, 6, 2).unwrap());

        let (from, _) = date_range(now, chrono::Duration::hours(8760));
        assert_eq!(from, NaiveDate::from_ymd_opt(2023, 6, 3).unwrap());
    }
}
