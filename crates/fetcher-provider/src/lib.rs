//! 데이터 제공자(Polygon) 접근 계층.
//!
//! 이 크레이트는 다음을 제공합니다:
//! - `RateLimiter`: 마감 시간이 있는 토큰 버킷
//! - `HttpClient`: rate limit, API 토큰, 고정 횟수 재시도가 적용된 GET/POST
//! - `polygon`: 엔드포인트 URL 구성, 응답 스키마, 도메인 변환

pub mod client;
pub mod error;
pub mod polygon;
pub mod rate_limiter;
pub mod retry;

pub use client::HttpClient;
pub use error::{ProviderError, Result};
pub use polygon::{PolygonClient, PolygonEndpoints};
pub use rate_limiter::{RateLimitConfig, RateLimitError, RateLimiter};
pub use retry::{with_retry, RetryConfig};
