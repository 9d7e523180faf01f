//! 크롤 루프 상태 머신.
//!
//! ```text
//! Idle ──▶ Crawling(Bulk) ──성공──▶ Idle ──▶ Crawling(Incremental) ──▶ ...
//!                │                                  │
//!                └──────── 실패 (재시도 소진) ───────┴──▶ Failed
//! ```
//!
//! - 첫 패스는 백필(Bulk), 첫 성공 이후에는 계속 증분(Incremental) 모드입니다.
//! - 패스가 실패하면 대기 후 처음부터 다시 시작하며, 재시도 예산을 모두 쓰면
//!   `CollectorError::RetriesExhausted`로 끝납니다. 성공한 패스는 예산을 되돌려 놓습니다.
//! - 최근에 완료된 크롤이 있으면 새 패스를 시작하지 않고 대기합니다.
//! - 특정 티커가 지정되면 목록 순회 없이 그 티커의 일봉만 한 번 수집하고 끝납니다.
//! - 중지 플래그(`with_shutdown`)가 켜지면 대기 중이면 바로, 수집 중이면 진행 중인
//!   티커를 마친 뒤 `Ok(())`로 반환합니다.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use fetcher_core::{CrawlMode, FetcherState};
use fetcher_data::BatchedStorage;
use fetcher_provider::PolygonClient;
use serde::Serialize;
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{error, info, warn};

use super::checkpoint::{CrawlStateStore, ResumeSlots};
use super::stock_fetch::TickerFetcher;
use super::ticker_walk::TickerWalker;
use crate::config::CrawlConfig;
use crate::error::CollectorError;
use crate::stats::PassStats;
use crate::Result;

/// 오케스트레이터 상태.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OrchestratorState {
    Idle,
    Crawling(CrawlMode),
    Failed,
}

/// 수집 모드와 1회성 전환 플래그.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeState {
    mode: CrawlMode,
    has_transitioned_to_incremental: bool,
}

impl Default for ModeState {
    fn default() -> Self {
        Self {
            mode: CrawlMode::Bulk,
            has_transitioned_to_incremental: false,
        }
    }
}

impl ModeState {
    pub fn mode(&self) -> CrawlMode {
        self.mode
    }

    pub fn has_transitioned_to_incremental(&self) -> bool {
        self.has_transitioned_to_incremental
    }

    /// 패스 성공을 반영합니다. 이번 호출로 증분 모드로 전환됐으면 `true`.
    pub fn complete_pass(&mut self) -> bool {
        if self.has_transitioned_to_incremental {
            return false;
        }
        self.has_transitioned_to_incremental = true;
        self.mode = CrawlMode::Incremental;
        true
    }
}

/// 다른 태스크에서 관찰하는 크롤 상태 스냅샷.
#[derive(Debug, Clone)]
pub struct CrawlSnapshot {
    pub state: OrchestratorState,
    pub mode: CrawlMode,
    pub retries_left: u32,
    /// 종료 시 저장할 크롤 상태 (진행 중 요청 URL 포함)
    pub checkpoint: FetcherState,
}

/// 크롤 루프.
pub struct FetchOrchestrator {
    client: PolygonClient,
    storage: Arc<BatchedStorage>,
    checkpoint: CrawlStateStore,
    config: CrawlConfig,
    pinned: Option<String>,
    mode: ModeState,
    state: OrchestratorState,
    retries_left: u32,
    current: FetcherState,
    slots: ResumeSlots,
    snapshot: watch::Sender<CrawlSnapshot>,
    stop: Option<watch::Receiver<bool>>,
    last_pass: Option<PassStats>,
}

impl FetchOrchestrator {
    pub fn new(
        client: PolygonClient,
        storage: Arc<BatchedStorage>,
        checkpoint: CrawlStateStore,
        config: CrawlConfig,
    ) -> Self {
        let current = FetcherState::new(Utc::now());
        let (snapshot, _) = watch::channel(CrawlSnapshot {
            state: OrchestratorState::Idle,
            mode: CrawlMode::Bulk,
            retries_left: config.max_retries,
            checkpoint: current.clone(),
        });

        Self {
            client,
            storage,
            checkpoint,
            retries_left: config.max_retries,
            config,
            pinned: None,
            mode: ModeState::default(),
            state: OrchestratorState::Idle,
            current,
            slots: ResumeSlots::default(),
            snapshot,
            stop: None,
            last_pass: None,
        }
    }

    /// 특정 티커만 수집하도록 고정합니다. 빈 문자열은 무시합니다.
    pub fn with_pinned_ticker(mut self, ticker: impl Into<String>) -> Self {
        let ticker = ticker.into();
        if ticker.trim().is_empty() {
            warn!("빈 티커 지정, 전체 수집으로 진행");
        } else {
            self.pinned = Some(ticker);
        }
        self
    }

    /// 중지 플래그를 연결합니다. `true`가 전달되면 루프를 멈춥니다.
    pub fn with_shutdown(mut self, stop: watch::Receiver<bool>) -> Self {
        self.stop = Some(stop);
        self
    }

    /// 상태 스냅샷 구독.
    pub fn subscribe(&self) -> watch::Receiver<CrawlSnapshot> {
        self.snapshot.subscribe()
    }

    pub fn mode(&self) -> CrawlMode {
        self.mode.mode()
    }

    pub fn mode_state(&self) -> ModeState {
        self.mode
    }

    pub fn state(&self) -> OrchestratorState {
        self.state
    }

    pub fn retries_left(&self) -> u32 {
        self.retries_left
    }

    pub fn pinned_ticker(&self) -> Option<&str> {
        self.pinned.as_deref()
    }

    /// 마지막으로 성공한 패스의 통계.
    pub fn last_pass(&self) -> Option<&PassStats> {
        self.last_pass.as_ref()
    }

    /// 크롤 루프를 실행합니다.
    ///
    /// 전체 수집은 재시도 예산을 모두 쓸 때까지 반환하지 않습니다.
    /// 특정 티커 모드는 한 번 성공하면 `Ok(())`를 반환합니다.
    pub async fn run(&mut self) -> Result<()> {
        let (state, found) = self.checkpoint.load().await?;
        // 완료된 상태의 URL은 다음 크롤의 시작점이 아니다
        self.slots = if found && !state.finished {
            ResumeSlots::from_state(&state)
        } else {
            ResumeSlots::default()
        };
        self.current = state;
        self.retries_left = self.config.max_retries;
        self.publish_checkpoint();
        self.publish_status();

        loop {
            if self.is_stopped() {
                info!("중지 요청, 크롤 루프 종료");
                self.set_state(OrchestratorState::Idle);
                return Ok(());
            }

            if self.pinned.is_none()
                && self.checkpoint.has_recently_completed(&self.current, Utc::now())
            {
                info!(
                    created_at = %self.current.created_at,
                    sleep_secs = self.config.recently_fetched_sleep_secs,
                    "최근 완료된 크롤 있음, 대기 후 다시 확인"
                );
                if self.pause(self.config.recently_fetched_sleep()).await {
                    continue;
                }
                self.current.finished = false;
                self.publish_checkpoint();
                continue;
            }

            match self.run_pass().await {
                Ok(stats) => {
                    stats.log_summary("크롤 패스");
                    self.last_pass = Some(stats);
                    self.retries_left = self.config.max_retries;

                    if self.pinned.is_some() {
                        self.set_state(OrchestratorState::Idle);
                        return Ok(());
                    }

                    if self.mode.complete_pass() {
                        info!(
                            from = %CrawlMode::Bulk,
                            to = %CrawlMode::Incremental,
                            "수집 모드 전환"
                        );
                    }
                    self.set_state(OrchestratorState::Idle);
                }
                Err(CollectorError::Cancelled) => {
                    info!("중지 요청, 진행 중인 패스 중단");
                    self.set_state(OrchestratorState::Idle);
                    return Ok(());
                }
                Err(e) => {
                    if self.retries_left == 0 {
                        let attempts = self.config.max_retries + 1;
                        error!(attempts, error = %e, "크롤 재시도 소진, 중단");
                        self.set_state(OrchestratorState::Failed);
                        return Err(CollectorError::RetriesExhausted {
                            attempts,
                            last: Box::new(e),
                        });
                    }

                    warn!(
                        error = %e,
                        retries_left = self.retries_left,
                        sleep_secs = self.config.error_sleep_secs,
                        "크롤 패스 실패, 대기 후 재시작"
                    );
                    self.retries_left -= 1;
                    self.set_state(OrchestratorState::Idle);
                    self.pause(self.config.error_sleep()).await;
                }
            }
        }
    }

    /// 패스 한 번. 성공하면 버퍼를 비우고 (전체 수집이면) 완료 상태를 저장합니다.
    async fn run_pass(&mut self) -> Result<PassStats> {
        let mode = self.mode.mode();
        let window = self.config.window(mode);
        let started = Instant::now();
        let counters = self.storage.counters();
        let writes_before = counters.snapshot();
        let mut stats = PassStats::new(mode);

        self.set_state(OrchestratorState::Crawling(mode));
        info!(mode = %mode, pinned = ?self.pinned, "크롤 패스 시작");

        match self.pinned.as_deref() {
            Some(ticker) => {
                let mut fetcher = TickerFetcher::new(
                    &self.client,
                    &self.storage,
                    &mut self.slots,
                    &self.snapshot,
                    window,
                    &mut stats,
                )
                .with_stop(self.stop.as_ref());
                fetcher.fetch_prices(ticker).await?;
                stats.tickers = 1;
            }
            None => {
                // 재개할 목록 URL이 없으면 이전 패스의 슬롯은 버리고 처음부터
                if !self.slots.tickers.is_pending() {
                    self.slots = ResumeSlots::default();
                }
                let fresh = self.client.endpoints().tickers_url(None);
                let first_url = self.slots.tickers.resolve(fresh, |_| true);
                let mut fetcher = TickerFetcher::new(
                    &self.client,
                    &self.storage,
                    &mut self.slots,
                    &self.snapshot,
                    window,
                    &mut stats,
                )
                .with_stop(self.stop.as_ref());
                let summary = TickerWalker::new(&self.client)
                    .walk(first_url, &mut fetcher)
                    .await?;
                stats.pages = summary.pages;
                stats.tickers = summary.tickers;
            }
        }

        self.storage.flush().await?;

        if self.pinned.is_none() {
            let finished = self.slots.to_state(Utc::now(), true);
            self.checkpoint.save(&finished).await?;
            self.current = finished;
            self.publish_checkpoint();
        }

        stats.writes = counters.snapshot().since(&writes_before);
        stats.elapsed = started.elapsed();
        Ok(stats)
    }

    fn is_stopped(&self) -> bool {
        self.stop.as_ref().is_some_and(|stop| *stop.borrow())
    }

    /// `duration`만큼 대기합니다. 중지 요청으로 깨어나면 `true`.
    async fn pause(&mut self, duration: Duration) -> bool {
        let Some(stop) = self.stop.as_mut() else {
            sleep(duration).await;
            return false;
        };
        tokio::select! {
            _ = sleep(duration) => false,
            Ok(_) = stop.wait_for(|stopped| *stopped) => true,
        }
    }

    fn set_state(&mut self, state: OrchestratorState) {
        self.state = state;
        self.publish_status();
    }

    fn publish_status(&self) {
        let (state, mode, retries_left) = (self.state, self.mode.mode(), self.retries_left);
        self.snapshot.send_modify(|snapshot| {
            snapshot.state = state;
            snapshot.mode = mode;
            snapshot.retries_left = retries_left;
        });
    }

    fn publish_checkpoint(&self) {
        let current = self.current.clone();
        self.snapshot
            .send_modify(|snapshot| snapshot.checkpoint = current);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_starts_bulk_and_transitions_once() {
        let mut mode = ModeState::default();
        assert_eq!(mode.mode(), CrawlMode::Bulk);
        assert!(!mode.has_transitioned_to_incremental());

        assert!(mode.complete_pass());
        assert_eq!(mode.mode(), CrawlMode::Incremental);

        assert!(!mode.complete_pass());
        assert!(!mode.complete_pass());
        assert_eq!(mode.mode(), CrawlMode::Incremental);
        assert!(mode.has_transitioned_to_incremental());
    }
}
