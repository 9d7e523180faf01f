//! 고정 횟수, 고정 간격 재시도.

use std::future::Future;
use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

use crate::error::Result;

/// HTTP 계층 재시도 설정.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// 총 시도 횟수 (첫 시도 포함)
    pub count: u32,
    /// 시도 사이 대기 시간 (밀리초)
    pub wait_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            count: 5,
            wait_ms: 60_000,
        }
    }
}

impl RetryConfig {
    pub fn new(count: u32, wait: Duration) -> Self {
        Self {
            count,
            wait_ms: wait.as_millis() as u64,
        }
    }

    /// 시도 사이 대기 시간을 Duration으로 반환
    pub fn wait(&self) -> Duration {
        Duration::from_millis(self.wait_ms)
    }

    /// 최소 1회는 시도한다
    pub fn attempts(&self) -> u32 {
        self.count.max(1)
    }
}

/// `op`을 성공할 때까지 최대 `config.attempts()`번 실행합니다.
///
/// 재시도 가능한 에러(`ProviderError::is_retryable`)만 다시 시도하고, 그 밖의 에러는
/// 곧바로 반환합니다. 모두 실패하면 마지막 에러를 그대로 반환합니다.
pub async fn with_retry<T, F, Fut>(config: &RetryConfig, url: &str, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let attempts = config.attempts();
    let mut attempt = 1;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if !e.is_retryable() => {
                warn!(url = %url, attempt, error = %e, "재시도 불가 에러");
                return Err(e);
            }
            Err(e) if attempt >= attempts => {
                warn!(url = %url, attempts, error = %e, "재시도 횟수 소진");
                return Err(e);
            }
            Err(e) => {
                warn!(
                    url = %url,
                    attempt,
                    attempts,
                    wait_ms = config.wait_ms,
                    error = %e,
                    "요청 실패, 재시도 대기"
                );
                tokio::time::sleep(config.wait()).await;
                attempt += 1;
            }
        }
    }
}
