//! 외부 API 요청용 rate limiter.
//!
//! 갱신 주기마다 용량만큼 토큰이 다시 채워지는 토큰 버킷입니다.
//! 토큰이 없으면 대기 간격만큼 잠든 뒤 다시 확인하며, 마감 시간을 넘기면
//! `RateLimitError::DeadlineExceeded`를 반환합니다.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use serde::Deserialize;
use tokio::time::{sleep, Instant};

/// Rate limiter 설정.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// 갱신 주기당 최대 요청 수
    pub max_requests: u32,
    /// 토큰 갱신 주기 (초)
    pub refill_period_secs: u64,
    /// 토큰 대기 중 재확인 간격 (밀리초)
    pub poll_interval_ms: u64,
    /// 토큰 대기 마감 시간 (초)
    pub deadline_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        // Polygon 무료 플랜: 분당 5회
        Self {
            max_requests: 5,
            refill_period_secs: 60,
            poll_interval_ms: 1000,
            deadline_secs: 300,
        }
    }
}

/// Rate limiter 에러.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RateLimitError {
    #[error("rate limit deadline exceeded after {waited:?}")]
    DeadlineExceeded { waited: Duration },
}

#[derive(Debug)]
struct TokenBucket {
    /// 남은 토큰 수
    tokens: u32,
    /// 마지막 갱신 시각
    last_refill: Instant,
}

/// 토큰 버킷 rate limiter.
///
/// 요청 내용은 보지 않으며, 나가는 모든 요청 앞에서 `acquire`를 호출해야 합니다.
#[derive(Debug)]
pub struct RateLimiter {
    capacity: u32,
    refill_period: Duration,
    poll_interval: Duration,
    deadline: Duration,
    bucket: Mutex<TokenBucket>,
}

impl RateLimiter {
    /// 새 rate limiter 생성. 버킷은 가득 찬 상태로 시작합니다.
    pub fn new(
        max_requests: u32,
        refill_period: Duration,
        poll_interval: Duration,
        deadline: Duration,
    ) -> Self {
        let capacity = max_requests.max(1);
        Self {
            capacity,
            refill_period,
            poll_interval: poll_interval.max(Duration::from_millis(1)),
            deadline,
            bucket: Mutex::new(TokenBucket {
                tokens: capacity,
                last_refill: Instant::now(),
            }),
        }
    }

    /// 설정으로부터 생성.
    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(
            config.max_requests,
            Duration::from_secs(config.refill_period_secs),
            Duration::from_millis(config.poll_interval_ms),
            Duration::from_secs(config.deadline_secs),
        )
    }

    /// 토큰 하나를 즉시 소비 시도. 성공하면 `true`.
    pub fn try_acquire(&self) -> bool {
        let mut bucket = self.bucket.lock().unwrap_or_else(PoisonError::into_inner);

        let now = Instant::now();
        if now.duration_since(bucket.last_refill) >= self.refill_period {
            bucket.tokens = self.capacity;
            bucket.last_refill = now;
        }

        if bucket.tokens > 0 {
            bucket.tokens -= 1;
            true
        } else {
            false
        }
    }

    /// 토큰을 얻을 때까지 대기.
    ///
    /// 대기 시간이 마감 시간을 넘으면 `DeadlineExceeded`를 반환합니다.
    pub async fn acquire(&self) -> Result<(), RateLimitError> {
        let started = Instant::now();

        loop {
            if self.try_acquire() {
                return Ok(());
            }

            let waited = started.elapsed();
            if waited >= self.deadline {
                return Err(RateLimitError::DeadlineExceeded { waited });
            }

            sleep(self.poll_interval.min(self.deadline - waited)).await;
        }
    }

    /// 현재 남은 토큰 수 (갱신 반영 전).
    pub fn available(&self) -> u32 {
        self.bucket
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .tokens
    }
}
