//! rate limit과 재시도가 적용된 HTTP 클라이언트.
//!
//! 한 번의 시도는 토큰 대기, 전송, 본문 전체 읽기를 포함하며,
//! 시도 전체가 `RetryConfig`에 따라 반복됩니다.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Method, Url};
use tracing::debug;

use crate::error::{ProviderError, Result};
use crate::rate_limiter::RateLimiter;
use crate::retry::{with_retry, RetryConfig};

/// 요청마다 쿼리 파라미터로 붙는 API 토큰.
#[derive(Clone)]
struct ApiToken {
    param: String,
    value: String,
}

impl std::fmt::Debug for ApiToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiToken")
            .field("param", &self.param)
            .field("value", &"[MASKED]")
            .finish()
    }
}

/// 외부 API용 HTTP 클라이언트.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    limiter: Option<Arc<RateLimiter>>,
    token: Option<ApiToken>,
    retry: RetryConfig,
}

impl HttpClient {
    /// 새 클라이언트 생성.
    ///
    /// # Errors
    /// reqwest 클라이언트 생성에 실패하면 `ProviderError::Transport`.
    pub fn new(timeout: Duration, retry: RetryConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::transport("", e))?;

        Ok(Self {
            client,
            limiter: None,
            token: None,
            retry,
        })
    }

    /// 모든 요청 앞에 적용할 rate limiter를 설정합니다.
    pub fn with_rate_limiter(mut self, limiter: Arc<RateLimiter>) -> Self {
        self.limiter = Some(limiter);
        self
    }

    /// 모든 요청 URL에 `param=value`를 추가합니다.
    pub fn with_api_token(mut self, param: impl Into<String>, value: impl Into<String>) -> Self {
        self.token = Some(ApiToken {
            param: param.into(),
            value: value.into(),
        });
        self
    }

    /// GET 요청 후 응답 본문을 반환합니다.
    pub async fn get(&self, url: &str) -> Result<Vec<u8>> {
        with_retry(&self.retry, url, move || self.send_once(Method::GET, url, None)).await
    }

    /// POST 요청 후 응답 본문을 반환합니다.
    pub async fn post(&self, url: &str, payload: impl Into<Vec<u8>>) -> Result<Vec<u8>> {
        let payload = payload.into();
        let body = payload.as_slice();
        with_retry(&self.retry, url, move || {
            self.send_once(Method::POST, url, Some(body))
        })
        .await
    }

    async fn send_once(&self, method: Method, url: &str, body: Option<&[u8]>) -> Result<Vec<u8>> {
        if let Some(limiter) = &self.limiter {
            limiter
                .acquire()
                .await
                .map_err(|e| match e {
                    crate::RateLimitError::DeadlineExceeded { waited } => {
                        ProviderError::RateLimitDeadline {
                            url: url.to_string(),
                            waited,
                        }
                    }
                })?;
        }

        let target = self.request_url(url)?;
        debug!(method = %method, url = %url, "요청 전송");

        let mut request = self.client.request(method, target);
        if let Some(body) = body {
            request = request
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(body.to_vec());
        }

        let response = request
            .send()
            .await
            .map_err(|e| ProviderError::transport(url, e.without_url()))?;

        let status = response.status();
        // 상태와 무관하게 본문을 끝까지 읽고 연결을 반환한다
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ProviderError::transport(url, e.without_url()))?;

        if status.as_u16() >= 400 {
            return Err(ProviderError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(bytes.to_vec())
    }

    fn request_url(&self, url: &str) -> Result<Url> {
        let mut parsed = Url::parse(url).map_err(|e| ProviderError::InvalidUrl {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        if let Some(token) = &self.token {
            parsed
                .query_pairs_mut()
                .append_pair(&token.param, &token.value);
        }

        Ok(parsed)
    }
}
