//! 엔티티별 버퍼와 배치 쓰기.
//!
//! `put_*`은 레코드를 종류별 버퍼에 추가하고, 버퍼가 배치 크기에 도달하면
//! 한 번의 다중 행 삽입(충돌 시 무시)으로 내보낸 뒤 비웁니다.
//! `flush`는 남은 레코드를 강제로 내보냅니다.
//!
//! 버퍼는 쓰기가 성공한 뒤에만 비워집니다. 쓰기가 실패하거나 쓰는 도중
//! 호출한 future가 취소되어도 레코드는 버퍼에 남아 다음 쓰기에 포함됩니다.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use fetcher_core::{Stock, Ticker, TickerDetails};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::Result;
use crate::store::StockStore;

/// 배치 크기 설정.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Ticker / TickerDetails 배치 크기
    pub ticker_batch_size: usize,
    /// Stock 배치 크기
    pub stock_batch_size: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            ticker_batch_size: 5,
            stock_batch_size: 25,
        }
    }
}

/// 종류별 배치 쓰기 카운터.
///
/// 수집 태스크가 쓰는 동안 다른 태스크에서 읽을 수 있습니다.
#[derive(Debug, Default)]
pub struct BatchCounters {
    ticker_batches: AtomicU64,
    ticker_rows: AtomicU64,
    details_batches: AtomicU64,
    details_rows: AtomicU64,
    stock_batches: AtomicU64,
    stock_rows: AtomicU64,
}

/// 카운터 스냅샷.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CounterSnapshot {
    pub ticker_batches: u64,
    /// 실제로 삽입된 행 수 (충돌로 무시된 행 제외)
    pub ticker_rows: u64,
    pub details_batches: u64,
    pub details_rows: u64,
    pub stock_batches: u64,
    pub stock_rows: u64,
}

impl CounterSnapshot {
    /// `earlier` 이후 증가분.
    pub fn since(&self, earlier: &CounterSnapshot) -> CounterSnapshot {
        CounterSnapshot {
            ticker_batches: self.ticker_batches.saturating_sub(earlier.ticker_batches),
            ticker_rows: self.ticker_rows.saturating_sub(earlier.ticker_rows),
            details_batches: self.details_batches.saturating_sub(earlier.details_batches),
            details_rows: self.details_rows.saturating_sub(earlier.details_rows),
            stock_batches: self.stock_batches.saturating_sub(earlier.stock_batches),
            stock_rows: self.stock_rows.saturating_sub(earlier.stock_rows),
        }
    }
}

impl BatchCounters {
    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            ticker_batches: self.ticker_batches.load(Ordering::Relaxed),
            ticker_rows: self.ticker_rows.load(Ordering::Relaxed),
            details_batches: self.details_batches.load(Ordering::Relaxed),
            details_rows: self.details_rows.load(Ordering::Relaxed),
            stock_batches: self.stock_batches.load(Ordering::Relaxed),
            stock_rows: self.stock_rows.load(Ordering::Relaxed),
        }
    }
}

/// 배치 저장소.
pub struct BatchedStorage {
    store: Arc<dyn StockStore>,
    config: BatchConfig,
    tickers: Mutex<Vec<Ticker>>,
    details: Mutex<Vec<TickerDetails>>,
    stocks: Mutex<Vec<Stock>>,
    counters: Arc<BatchCounters>,
}

impl BatchedStorage {
    pub fn new(store: Arc<dyn StockStore>, config: BatchConfig) -> Self {
        Self {
            store,
            config,
            tickers: Mutex::new(Vec::new()),
            details: Mutex::new(Vec::new()),
            stocks: Mutex::new(Vec::new()),
            counters: Arc::new(BatchCounters::default()),
        }
    }

    /// 하위 저장소.
    pub fn store(&self) -> &Arc<dyn StockStore> {
        &self.store
    }

    /// 다른 태스크와 공유할 수 있는 카운터 핸들.
    pub fn counters(&self) -> Arc<BatchCounters> {
        Arc::clone(&self.counters)
    }

    pub async fn put_ticker(&self, ticker: Ticker) -> Result<()> {
        let mut buffer = self.tickers.lock().await;
        buffer.push(ticker);
        if is_full(buffer.len(), self.config.ticker_batch_size) {
            self.write_tickers(&buffer).await?;
            buffer.clear();
        }
        Ok(())
    }

    pub async fn put_ticker_details(&self, details: TickerDetails) -> Result<()> {
        let mut buffer = self.details.lock().await;
        buffer.push(details);
        if is_full(buffer.len(), self.config.ticker_batch_size) {
            self.write_details(&buffer).await?;
            buffer.clear();
        }
        Ok(())
    }

    pub async fn put_stock(&self, stock: Stock) -> Result<()> {
        let mut buffer = self.stocks.lock().await;
        buffer.push(stock);
        if is_full(buffer.len(), self.config.stock_batch_size) {
            self.write_stocks(&buffer).await?;
            buffer.clear();
        }
        Ok(())
    }

    /// 여러 일봉을 순서대로 추가합니다.
    pub async fn put_stocks(&self, stocks: Vec<Stock>) -> Result<()> {
        for stock in stocks {
            self.put_stock(stock).await?;
        }
        Ok(())
    }

    /// 버퍼에 남은 레코드를 모두 내보냅니다.
    ///
    /// 세 종류 모두 시도한 뒤 첫 번째 에러를 반환합니다.
    pub async fn flush(&self) -> Result<()> {
        let tickers = self.flush_tickers().await;
        let details = self.flush_details().await;
        let stocks = self.flush_stocks().await;
        tickers.and(details).and(stocks)
    }

    /// 버퍼에 대기 중인 (tickers, details, stocks) 수.
    pub async fn pending(&self) -> (usize, usize, usize) {
        (
            self.tickers.lock().await.len(),
            self.details.lock().await.len(),
            self.stocks.lock().await.len(),
        )
    }

    async fn flush_tickers(&self) -> Result<()> {
        let mut buffer = self.tickers.lock().await;
        if !buffer.is_empty() {
            self.write_tickers(&buffer).await?;
            buffer.clear();
        }
        Ok(())
    }

    async fn flush_details(&self) -> Result<()> {
        let mut buffer = self.details.lock().await;
        if !buffer.is_empty() {
            self.write_details(&buffer).await?;
            buffer.clear();
        }
        Ok(())
    }

    async fn flush_stocks(&self) -> Result<()> {
        let mut buffer = self.stocks.lock().await;
        if !buffer.is_empty() {
            self.write_stocks(&buffer).await?;
            buffer.clear();
        }
        Ok(())
    }

    async fn write_tickers(&self, batch: &[Ticker]) -> Result<()> {
        let inserted = self.store.upsert_tickers(batch).await.inspect_err(|e| {
            warn!(size = batch.len(), error = %e, "티커 배치 저장 실패");
        })?;
        self.counters.ticker_batches.fetch_add(1, Ordering::Relaxed);
        self.counters.ticker_rows.fetch_add(inserted, Ordering::Relaxed);
        debug!(size = batch.len(), inserted, "티커 배치 저장");
        Ok(())
    }

    async fn write_details(&self, batch: &[TickerDetails]) -> Result<()> {
        let inserted = self
            .store
            .upsert_ticker_details(batch)
            .await
            .inspect_err(|e| {
                warn!(size = batch.len(), error = %e, "티커 상세 배치 저장 실패");
            })?;
        self.counters.details_batches.fetch_add(1, Ordering::Relaxed);
        self.counters.details_rows.fetch_add(inserted, Ordering::Relaxed);
        debug!(size = batch.len(), inserted, "티커 상세 배치 저장");
        Ok(())
    }

    async fn write_stocks(&self, batch: &[Stock]) -> Result<()> {
        let inserted = self.store.upsert_stocks(batch).await.inspect_err(|e| {
            warn!(size = batch.len(), error = %e, "일봉 배치 저장 실패");
        })?;
        self.counters.stock_batches.fetch_add(1, Ordering::Relaxed);
        self.counters.stock_rows.fetch_add(inserted, Ordering::Relaxed);
        debug!(size = batch.len(), inserted, "일봉 배치 저장");
        Ok(())
    }
}

fn is_full(len: usize, batch_size: usize) -> bool {
    len >= batch_size.max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use async_trait::async_trait;
    use chrono::Utc;
    use fetcher_core::{FetcherState, PriceBar};
    use tokio::sync::{Notify, Semaphore};
    use rust_decimal_macros::dec;

    fn stock(ticker: &str, ts: i64) -> Stock {
        let bar = PriceBar {
            open: dec!(1),
            close: dec!(2),
            high: dec!(3),
            low: dec!(0.5),
            volume: dec!(100),
            timestamp: ts,
        };
        Stock::from_bar(ticker, bar, Utc::now()).unwrap()
    }

    fn storage(store: Arc<MemoryStore>, ticker_batch: usize, stock_batch: usize) -> BatchedStorage {
        BatchedStorage::new(
            store,
            BatchConfig {
                ticker_batch_size: ticker_batch,
                stock_batch_size: stock_batch,
            },
        )
    }

    #[tokio::test]
    async fn test_buffer_flushes_at_batch_size() {
        let store = Arc::new(MemoryStore::new());
        let storage = storage(store.clone(), 2, 3);

        storage.put_ticker(Ticker::with_id("A")).await.unwrap();
        assert_eq!(store.ticker_count().await, 0);

        storage.put_ticker(Ticker::with_id("B")).await.unwrap();
        assert_eq!(store.ticker_count().await, 2);
        assert_eq!(storage.pending().await, (0, 0, 0));

        let snapshot = storage.counters().snapshot();
        assert_eq!(snapshot.ticker_batches, 1);
        assert_eq!(snapshot.ticker_rows, 2);
    }

    #[tokio::test]
    async fn test_stock_and_ticker_sizes_are_independent() {
        let store = Arc::new(MemoryStore::new());
        let storage = storage(store.clone(), 1, 3);

        storage
            .put_stocks(vec![stock("A", 1_700_000_000_000), stock("A", 1_700_086_400_000)])
            .await
            .unwrap();
        assert_eq!(store.stock_count().await, 0);
        assert_eq!(storage.pending().await.2, 2);

        storage.put_stock(stock("A", 1_700_172_800_000)).await.unwrap();
        assert_eq!(store.stock_count().await, 3);
        assert_eq!(storage.counters().snapshot().stock_batches, 1);
    }

    #[tokio::test]
    async fn test_flush_writes_partial_buffers() {
        let store = Arc::new(MemoryStore::new());
        let storage = storage(store.clone(), 5, 25);

        storage.put_ticker(Ticker::with_id("A")).await.unwrap();
        storage.put_stock(stock("A", 1_700_000_000_000)).await.unwrap();
        storage.flush().await.unwrap();

        assert_eq!(store.ticker_count().await, 1);
        assert_eq!(store.stock_count().await, 1);
        assert_eq!(storage.pending().await, (0, 0, 0));

        // 빈 버퍼 flush는 아무 배치도 쓰지 않는다
        storage.flush().await.unwrap();
        assert_eq!(storage.counters().snapshot().ticker_batches, 1);
    }

    #[tokio::test]
    async fn test_duplicate_stocks_do_not_increase_rows() {
        let store = Arc::new(MemoryStore::new());
        let storage = storage(store.clone(), 5, 1);

        storage.put_stock(stock("A", 1_700_000_000_000)).await.unwrap();
        storage.put_stock(stock("A", 1_700_000_000_000)).await.unwrap();

        assert_eq!(store.stock_count().await, 1);
        let snapshot = storage.counters().snapshot();
        assert_eq!(snapshot.stock_batches, 2);
        assert_eq!(snapshot.stock_rows, 1);
    }

    #[tokio::test]
    async fn test_counter_delta_between_snapshots() {
        let store = Arc::new(MemoryStore::new());
        let storage = storage(store.clone(), 1, 1);

        storage.put_ticker(Ticker::with_id("A")).await.unwrap();
        let before = storage.counters().snapshot();

        storage.put_ticker(Ticker::with_id("B")).await.unwrap();
        storage.put_stock(stock("B", 1_700_000_000_000)).await.unwrap();
        let delta = storage.counters().snapshot().since(&before);

        assert_eq!(delta.ticker_batches, 1);
        assert_eq!(delta.ticker_rows, 1);
        assert_eq!(delta.stock_rows, 1);
        assert_eq!(delta.details_batches, 0);
    }

    #[tokio::test]
    async fn test_write_failure_is_reported() {
        let store = Arc::new(MemoryStore::new());
        let storage = storage(store.clone(), 1, 1);

        store.fail_writes(true);
        assert!(storage.put_ticker(Ticker::with_id("A")).await.is_err());
        assert_eq!(storage.counters().snapshot().ticker_batches, 0);

        // 실패한 배치는 버퍼에 남아 다음 flush에 포함된다
        assert_eq!(storage.pending().await, (1, 0, 0));
        store.fail_writes(false);
        storage.flush().await.unwrap();
        assert_eq!(store.ticker_count().await, 1);
        assert_eq!(storage.pending().await, (0, 0, 0));
    }

    /// 티커 쓰기를 열어 줄 때까지 멈춰 있는 저장소.
    struct GatedStore {
        inner: MemoryStore,
        gate: Semaphore,
        entered: Notify,
    }

    #[async_trait]
    impl StockStore for GatedStore {
        async fn upsert_tickers(&self, tickers: &[Ticker]) -> Result<u64> {
            self.entered.notify_one();
            let _permit = self.gate.acquire().await.unwrap();
            self.inner.upsert_tickers(tickers).await
        }

        async fn upsert_ticker_details(&self, details: &[TickerDetails]) -> Result<u64> {
            self.inner.upsert_ticker_details(details).await
        }

        async fn upsert_stocks(&self, stocks: &[Stock]) -> Result<u64> {
            self.inner.upsert_stocks(stocks).await
        }

        async fn insert_fetcher_state(&self, state: &FetcherState) -> Result<()> {
            self.inner.insert_fetcher_state(state).await
        }

        async fn latest_fetcher_state(&self) -> Result<Option<FetcherState>> {
            self.inner.latest_fetcher_state().await
        }

        async fn query_stocks(&self, ticker_id: &str) -> Result<Vec<Stock>> {
            self.inner.query_stocks(ticker_id).await
        }
    }

    #[tokio::test]
    async fn test_cancelled_write_keeps_batch_for_flush() {
        let store = Arc::new(GatedStore {
            inner: MemoryStore::new(),
            gate: Semaphore::new(0),
            entered: Notify::new(),
        });
        let storage = Arc::new(BatchedStorage::new(
            store.clone(),
            BatchConfig {
                ticker_batch_size: 2,
                stock_batch_size: 25,
            },
        ));

        let writer = {
            let storage = storage.clone();
            tokio::spawn(async move {
                storage.put_ticker(Ticker::with_id("A")).await?;
                storage.put_ticker(Ticker::with_id("B")).await
            })
        };

        // 배치 쓰기 도중 태스크 취소
        store.entered.notified().await;
        writer.abort();
        assert!(writer.await.unwrap_err().is_cancelled());

        assert_eq!(storage.pending().await, (2, 0, 0));
        store.gate.add_permits(1);
        storage.flush().await.unwrap();

        assert_eq!(store.inner.ticker_count().await, 2);
        assert_eq!(storage.pending().await, (0, 0, 0));
        assert_eq!(storage.counters().snapshot().ticker_rows, 2);
    }
}
