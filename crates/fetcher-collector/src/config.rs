//! 수집기 설정.
//!
//! 로드 순서: 기본값 → 설정 파일(선택) → `FETCHER__` 환경 변수.
//! 관례적인 `POLYGON_API_TOKEN`, `DATABASE_URL` 환경 변수도 비어 있는 항목을 채웁니다.

use std::path::Path;
use std::time::Duration;

use fetcher_core::{CrawlMode, LogConfig, LogFormat};
use fetcher_data::BatchConfig;
use fetcher_provider::{polygon::DEFAULT_BASE_URL, RateLimitConfig, RetryConfig};
use serde::Deserialize;

use crate::error::CollectorError;
use crate::Result;

const ENV_PREFIX: &str = "FETCHER";
const TOKEN_ENV: &str = "POLYGON_API_TOKEN";
const DATABASE_URL_ENV: &str = "DATABASE_URL";

/// Collector 전체 설정
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    /// 외부 API 설정
    pub api: ApiConfig,
    /// 요청 rate limit
    pub rate_limit: RateLimitConfig,
    /// HTTP 계층 재시도
    pub retry: RetryConfig,
    /// 크롤 루프 설정
    pub crawl: CrawlConfig,
    /// 배치 크기
    pub batch: BatchConfig,
    /// 데이터베이스 설정
    pub database: DatabaseConfig,
    /// 조회 API 서버 설정
    pub server: ServerConfig,
    /// 로깅 설정
    pub logging: LoggingConfig,
}

/// 외부 API 설정
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    /// API 토큰 (필수)
    pub api_token: String,
    /// 토큰을 붙일 쿼리 파라미터 이름
    pub api_key_param: String,
    /// 요청 타임아웃 (초)
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_token: String::new(),
            api_key_param: "apiKey".to_string(),
            timeout_secs: 30,
        }
    }
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("base_url", &self.base_url)
            .field("api_token", &"[MASKED]")
            .field("api_key_param", &self.api_key_param)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// 크롤 루프 설정
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    /// 백필 모드 조회 구간 (시간)
    pub bulk_mode_hours: i64,
    /// 증분 모드 조회 구간 (시간)
    pub incremental_mode_hours: i64,
    /// 패스 실패 시 재시도 횟수
    pub max_retries: u32,
    /// 완료된 크롤을 최신으로 보는 기간 (시간)
    pub freshness_hours: i64,
    /// 최근 완료 시 다음 확인까지 대기 (초)
    pub recently_fetched_sleep_secs: u64,
    /// 패스 실패 후 대기 (초)
    pub error_sleep_secs: u64,
    /// 종료 요청 후 진행 중인 티커를 마칠 때까지 기다리는 최대 시간 (초)
    pub shutdown_grace_secs: u64,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            bulk_mode_hours: 8760,
            incremental_mode_hours: 24,
            max_retries: 5,
            freshness_hours: 24,
            recently_fetched_sleep_secs: 3600,
            error_sleep_secs: 600,
            shutdown_grace_secs: 30,
        }
    }
}

impl CrawlConfig {
    /// 모드별 조회 구간
    pub fn window(&self, mode: CrawlMode) -> chrono::Duration {
        match mode {
            CrawlMode::Bulk => chrono::Duration::hours(self.bulk_mode_hours),
            CrawlMode::Incremental => chrono::Duration::hours(self.incremental_mode_hours),
        }
    }

    pub fn freshness(&self) -> chrono::Duration {
        chrono::Duration::hours(self.freshness_hours)
    }

    pub fn recently_fetched_sleep(&self) -> Duration {
        Duration::from_secs(self.recently_fetched_sleep_secs)
    }

    pub fn error_sleep(&self) -> Duration {
        Duration::from_secs(self.error_sleep_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

/// 데이터베이스 설정
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub connect_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: 5,
            connect_timeout_secs: 30,
        }
    }
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // 접속 URL에 비밀번호가 들어 있을 수 있다
        f.debug_struct("DatabaseConfig")
            .field("url", &"[MASKED]")
            .field("max_connections", &self.max_connections)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .finish()
    }
}

impl DatabaseConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// 조회 API 서버 설정
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl ServerConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// 로깅 설정
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// pretty | json | compact
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl LoggingConfig {
    pub fn to_log_config(&self) -> Result<LogConfig> {
        let format: LogFormat = self.format.parse().map_err(CollectorError::Config)?;
        Ok(LogConfig::new(self.level.clone()).with_format(format))
    }
}

impl CollectorConfig {
    /// 설정 파일(선택)과 환경 변수에서 설정을 로드합니다.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        dotenvy::dotenv().ok();

        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }
        let builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

        let mut config: Self = builder.build()?.try_deserialize()?;
        config.apply_env_fallbacks(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// 비어 있는 토큰/DB URL을 관례적인 환경 변수로 채웁니다.
    fn apply_env_fallbacks(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if self.api.api_token.is_empty() {
            if let Some(token) = lookup(TOKEN_ENV) {
                self.api.api_token = token;
            }
        }
        if self.database.url.is_empty() {
            if let Some(url) = lookup(DATABASE_URL_ENV) {
                self.database.url = url;
            }
        }
    }

    /// 필수 항목과 값 범위를 검증합니다.
    pub fn validate(&self) -> Result<()> {
        if self.api.api_token.trim().is_empty() {
            return Err(CollectorError::Config(format!(
                "API 토큰이 설정되지 않았습니다 ({} 또는 {}__API__API_TOKEN)",
                TOKEN_ENV, ENV_PREFIX
            )));
        }
        if self.database.url.is_empty() {
            return Err(CollectorError::Config(format!(
                "{} 환경변수가 설정되지 않았습니다",
                DATABASE_URL_ENV
            )));
        }
        if self.crawl.bulk_mode_hours <= 0 || self.crawl.incremental_mode_hours <= 0 {
            return Err(CollectorError::Config(
                "조회 구간(시간)은 0보다 커야 합니다".to_string(),
            ));
        }
        if self.batch.ticker_batch_size == 0 || self.batch.stock_batch_size == 0 {
            return Err(CollectorError::Config(
                "배치 크기는 0보다 커야 합니다".to_string(),
            ));
        }
        if self.rate_limit.max_requests == 0 {
            return Err(CollectorError::Config(
                "rate limit 요청 수는 0보다 커야 합니다".to_string(),
            ));
        }
        self.logging.to_log_config()?;
        Ok(())
    }
}
