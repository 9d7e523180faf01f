//! Polygon 응답 디코딩.

use chrono::Utc;
use fetcher_core::{Stock, TickerDetails};
use serde::de::DeserializeOwned;
use tracing::debug;

use super::endpoints::PolygonEndpoints;
use super::schema::{
    AggregatesResponse, TickerDetailsResponse, TickersResponse, AGGREGATE_SUCCESS_STATUSES,
    STATUS_OK,
};
use crate::client::HttpClient;
use crate::error::{ProviderError, Result};

/// Polygon REST 클라이언트.
///
/// 전송은 `HttpClient`에 맡기고, 응답 본문 디코딩과 `status` 필드 검증을 담당합니다.
#[derive(Debug, Clone)]
pub struct PolygonClient {
    http: HttpClient,
    endpoints: PolygonEndpoints,
}

impl PolygonClient {
    pub fn new(http: HttpClient, endpoints: PolygonEndpoints) -> Self {
        Self { http, endpoints }
    }

    pub fn endpoints(&self) -> &PolygonEndpoints {
        &self.endpoints
    }

    /// 티커 목록 한 페이지를 가져옵니다.
    pub async fn tickers_page(&self, url: &str) -> Result<TickersResponse> {
        let page: TickersResponse = self.get_json(url).await?;
        ensure_status(url, &page.status, &[STATUS_OK])?;
        Ok(page)
    }

    /// 티커 상세를 가져옵니다.
    pub async fn ticker_details(&self, url: &str) -> Result<TickerDetails> {
        let response: TickerDetailsResponse = self.get_json(url).await?;
        ensure_status(url, &response.status, &[STATUS_OK])?;

        let results = response
            .results
            .ok_or_else(|| ProviderError::decode(url, "missing results"))?;
        Ok(results.into_details(Utc::now()))
    }

    /// 일봉 목록을 가져옵니다.
    ///
    /// 조회 결과가 없으면 빈 목록을 반환합니다 (에러 아님).
    pub async fn stocks(&self, url: &str, ticker_id: &str) -> Result<Vec<Stock>> {
        let response: AggregatesResponse = self.get_json(url).await?;
        ensure_status(url, &response.status, AGGREGATE_SUCCESS_STATUSES)?;

        if response.is_empty() {
            debug!(ticker = %ticker_id, "조회된 일봉 없음");
            return Ok(Vec::new());
        }

        let ticker_id = if response.ticker.is_empty() {
            ticker_id
        } else {
            response.ticker.as_str()
        };

        let now = Utc::now();
        response
            .results
            .iter()
            .map(|bar| {
                bar.to_stock(ticker_id, now).ok_or_else(|| {
                    ProviderError::decode(url, format!("invalid bar at t={}", bar.t))
                })
            })
            .collect()
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let body = self.http.get(url).await?;
        serde_json::from_slice(&body).map_err(|e| ProviderError::decode(url, e))
    }
}

fn ensure_status(url: &str, status: &str, accepted: &[&str]) -> Result<()> {
    if accepted.contains(&status) {
        Ok(())
    } else {
        Err(ProviderError::BadUpstreamStatus {
            url: url.to_string(),
            status: status.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_status() {
        assert!(ensure_status("u", "OK", &[STATUS_OK]).is_ok());
        assert!(ensure_status("u", "DELAYED", AGGREGATE_SUCCESS_STATUSES).is_ok());

        let err = ensure_status("u", "ERROR", &[STATUS_OK]).unwrap_err();
        assert!(matches!(err, ProviderError::BadUpstreamStatus { ref status, .. } if status == "ERROR"));
    }
}
