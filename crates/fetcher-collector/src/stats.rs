//! 패스 통계 구조체.

use std::time::Duration;

use fetcher_core::CrawlMode;
use fetcher_data::CounterSnapshot;
use serde::Serialize;

/// 크롤 패스 한 번의 통계
#[derive(Debug, Clone, Serialize)]
pub struct PassStats {
    /// 수집 모드
    pub mode: CrawlMode,
    /// 조회한 목록 페이지 수
    pub pages: usize,
    /// 발견한 티커 수
    pub tickers: usize,
    /// 저장 요청한 티커 상세 수
    pub details: usize,
    /// 저장 요청한 일봉 수
    pub bars: usize,
    /// 일봉이 없었던 티커 수
    pub empty: usize,
    /// 이번 패스 동안의 배치 쓰기 카운터 증가분
    pub writes: CounterSnapshot,
    /// 소요 시간
    #[serde(skip)]
    pub elapsed: Duration,
}

impl PassStats {
    pub fn new(mode: CrawlMode) -> Self {
        Self {
            mode,
            pages: 0,
            tickers: 0,
            details: 0,
            bars: 0,
            empty: 0,
            writes: CounterSnapshot::default(),
            elapsed: Duration::ZERO,
        }
    }

    /// 통계 요약 로그 출력
    pub fn log_summary(&self, operation: &str) {
        tracing::info!(
            operation = operation,
            mode = %self.mode,
            pages = self.pages,
            tickers = self.tickers,
            details = self.details,
            bars = self.bars,
            empty = self.empty,
            ticker_batches = self.writes.ticker_batches,
            ticker_rows = self.writes.ticker_rows,
            details_batches = self.writes.details_batches,
            details_rows = self.writes.details_rows,
            stock_batches = self.writes.stock_batches,
            stock_rows = self.writes.stock_rows,
            elapsed = format!("{:.1}s", self.elapsed.as_secs_f64()),
            "패스 완료"
        );
    }
}
