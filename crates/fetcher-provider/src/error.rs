//! 데이터 제공자 에러 타입.

use std::time::Duration;

use thiserror::Error;

/// 외부 API 호출 에러.
///
/// 모든 변형은 요청 URL을 포함합니다. API 토큰은 URL에 포함되지 않습니다.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// rate limiter가 마감 시간 안에 요청을 허용하지 못함
    #[error("rate limit wait exceeded after {waited:?}: {url}")]
    RateLimitDeadline { url: String, waited: Duration },

    /// 네트워크/전송 에러
    #[error("transport error for {url}: {message}")]
    Transport { url: String, message: String },

    /// HTTP 상태 코드 400 이상
    #[error("unexpected status {status} for {url}")]
    Status { url: String, status: u16 },

    /// URL 파싱 실패
    #[error("invalid url {url}: {message}")]
    InvalidUrl { url: String, message: String },

    /// 응답 본문 역직렬화 실패
    #[error("cannot decode response from {url}: {message}")]
    Decode { url: String, message: String },

    /// 응답은 파싱됐지만 status 필드가 성공이 아님
    #[error("bad upstream status {status:?} for {url}")]
    BadUpstreamStatus { url: String, status: String },
}

impl ProviderError {
    /// HTTP 계층에서 재시도할 수 있는 에러인지 확인.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ProviderError::RateLimitDeadline { .. }
                | ProviderError::Transport { .. }
                | ProviderError::Status { .. }
        )
    }

    /// 에러가 발생한 요청 URL.
    pub fn url(&self) -> &str {
        match self {
            ProviderError::RateLimitDeadline { url, .. }
            | ProviderError::Transport { url, .. }
            | ProviderError::Status { url, .. }
            | ProviderError::InvalidUrl { url, .. }
            | ProviderError::Decode { url, .. }
            | ProviderError::BadUpstreamStatus { url, .. } => url,
        }
    }

    pub(crate) fn transport(url: &str, err: reqwest::Error) -> Self {
        ProviderError::Transport {
            url: url.to_string(),
            message: err.to_string(),
        }
    }

    pub(crate) fn decode(url: &str, err: impl std::fmt::Display) -> Self {
        ProviderError::Decode {
            url: url.to_string(),
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ProviderError>;
