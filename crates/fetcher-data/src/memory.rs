//! 테스트용 인메모리 저장소.
//!
//! `PgStore`와 같은 규칙을 따릅니다: 자연 키가 이미 있으면 먼저 저장된 행을
//! 유지하고, 크롤 상태는 일련번호를 붙여 추가만 합니다.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use fetcher_core::{FetcherState, Stock, Ticker, TickerDetails};
use tokio::sync::Mutex;

use crate::error::{DataError, Result};
use crate::store::StockStore;

#[derive(Debug, Default)]
struct Tables {
    tickers: BTreeMap<String, Ticker>,
    details: BTreeMap<String, TickerDetails>,
    stocks: BTreeMap<String, Stock>,
    states: Vec<FetcherState>,
}

/// 인메모리 `StockStore`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 이후 모든 엔티티 쓰기를 실패시킵니다.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub async fn ticker_count(&self) -> usize {
        self.tables.lock().await.tickers.len()
    }

    pub async fn details_count(&self) -> usize {
        self.tables.lock().await.details.len()
    }

    pub async fn stock_count(&self) -> usize {
        self.tables.lock().await.stocks.len()
    }

    pub async fn stocks_for(&self, ticker_id: &str) -> Vec<Stock> {
        self.tables
            .lock()
            .await
            .stocks
            .values()
            .filter(|s| s.ticker_id == ticker_id)
            .cloned()
            .collect()
    }

    pub async fn fetcher_states(&self) -> Vec<FetcherState> {
        self.tables.lock().await.states.clone()
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(DataError::Unavailable("writes disabled".to_string()))
        } else {
            Ok(())
        }
    }
}

fn insert_ignore<T: Clone>(table: &mut BTreeMap<String, T>, key: &str, row: &T) -> u64 {
    if table.contains_key(key) {
        0
    } else {
        table.insert(key.to_string(), row.clone());
        1
    }
}

#[async_trait]
impl StockStore for MemoryStore {
    async fn upsert_tickers(&self, tickers: &[Ticker]) -> Result<u64> {
        self.check_writable()?;
        let mut tables = self.tables.lock().await;
        Ok(tickers
            .iter()
            .map(|t| insert_ignore(&mut tables.tickers, &t.ticker_id, t))
            .sum())
    }

    async fn upsert_ticker_details(&self, details: &[TickerDetails]) -> Result<u64> {
        self.check_writable()?;
        let mut tables = self.tables.lock().await;
        Ok(details
            .iter()
            .map(|d| insert_ignore(&mut tables.details, &d.ticker_id, d))
            .sum())
    }

    async fn upsert_stocks(&self, stocks: &[Stock]) -> Result<u64> {
        self.check_writable()?;
        let mut tables = self.tables.lock().await;
        Ok(stocks
            .iter()
            .map(|s| insert_ignore(&mut tables.stocks, &s.stock_id, s))
            .sum())
    }

    async fn insert_fetcher_state(&self, state: &FetcherState) -> Result<()> {
        let mut tables = self.tables.lock().await;
        let mut row = state.clone();
        row.state_id = Some(tables.states.len() as i32 + 1);
        tables.states.push(row);
        Ok(())
    }

    async fn latest_fetcher_state(&self) -> Result<Option<FetcherState>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .states
            .iter()
            .max_by_key(|s| (s.created_at, s.state_id))
            .cloned())
    }

    async fn query_stocks(&self, ticker_id: &str) -> Result<Vec<Stock>> {
        let mut stocks = self.stocks_for(ticker_id).await;
        stocks.sort_by_key(|s| s.stocked_at);
        Ok(stocks)
    }
}
