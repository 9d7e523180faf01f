//! 에러 타입 정의.

use std::fmt;

use fetcher_data::DataError;
use fetcher_provider::ProviderError;

/// Collector 에러 타입
#[derive(Debug)]
pub enum CollectorError {
    /// 데이터 제공자 에러 (rate limit, 전송, 디코딩, 응답 status)
    Provider(ProviderError),
    /// 저장소 에러
    Storage(DataError),
    /// 설정 에러
    Config(String),
    /// 패스 재시도 예산 소진
    RetriesExhausted {
        attempts: u32,
        last: Box<CollectorError>,
    },
    /// 종료 요청으로 중지
    Cancelled,
    /// 일반 에러
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl fmt::Display for CollectorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Provider(e) => write!(f, "Provider error: {}", e),
            Self::Storage(e) => write!(f, "Storage error: {}", e),
            Self::Config(msg) => write!(f, "Configuration error: {}", msg),
            Self::RetriesExhausted { attempts, last } => {
                write!(f, "Crawl failed after {} attempts: {}", attempts, last)
            }
            Self::Cancelled => write!(f, "Crawl cancelled"),
            Self::Other(e) => write!(f, "Error: {}", e),
        }
    }
}

impl std::error::Error for CollectorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Provider(e) => Some(e),
            Self::Storage(e) => Some(e),
            Self::RetriesExhausted { last, .. } => Some(last.as_ref()),
            Self::Other(e) => Some(e.as_ref()),
            Self::Config(_) | Self::Cancelled => None,
        }
    }
}

impl From<ProviderError> for CollectorError {
    fn from(err: ProviderError) -> Self {
        Self::Provider(err)
    }
}

impl From<DataError> for CollectorError {
    fn from(err: DataError) -> Self {
        Self::Storage(err)
    }
}

impl From<sqlx::Error> for CollectorError {
    fn from(err: sqlx::Error) -> Self {
        Self::Storage(err.into())
    }
}

impl From<config::ConfigError> for CollectorError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<std::io::Error> for CollectorError {
    fn from(err: std::io::Error) -> Self {
        Self::Other(Box::new(err))
    }
}

impl From<Box<dyn std::error::Error + Send + Sync>> for CollectorError {
    fn from(err: Box<dyn std::error::Error + Send + Sync>) -> Self {
        Self::Other(err)
    }
}

/// Result 타입 별칭
pub type Result<T> = std::result::Result<T, CollectorError>;
