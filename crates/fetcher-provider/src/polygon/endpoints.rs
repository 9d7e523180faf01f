//! 요청 URL 구성.
//!
//! 구성된 URL에는 API 토큰이 들어가지 않습니다. 토큰은 `HttpClient`가
//! 전송 직전에 붙입니다.

use chrono::NaiveDate;
use reqwest::Url;

use crate::error::{ProviderError, Result};

pub const DEFAULT_BASE_URL: &str = "https://api.polygon.io";

const CURSOR_PARAM: &str = "cursor";
const BAR_MULTIPLIER: &str = "1";
const BAR_TIMESPAN: &str = "day";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Polygon 엔드포인트 URL 빌더.
#[derive(Debug, Clone)]
pub struct PolygonEndpoints {
    base: Url,
}

impl PolygonEndpoints {
    /// 기본 URL로 빌더를 만듭니다 (예: `https://api.polygon.io`).
    pub fn new(base_url: &str) -> Result<Self> {
        let base = Url::parse(base_url).map_err(|e| ProviderError::InvalidUrl {
            url: base_url.to_string(),
            message: e.to_string(),
        })?;
        if base.cannot_be_a_base() {
            return Err(ProviderError::InvalidUrl {
                url: base_url.to_string(),
                message: "cannot be a base url".to_string(),
            });
        }
        Ok(Self { base })
    }

    /// 티커 목록: `/v3/reference/tickers?active=true&order=asc[&cursor=..]`
    pub fn tickers_url(&self, cursor: Option<&str>) -> String {
        let mut url = self.path(&["v3", "reference", "tickers"]);
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("active", "true");
            query.append_pair("order", "asc");
            if let Some(cursor) = cursor {
                query.append_pair(CURSOR_PARAM, cursor);
            }
        }
        url.into()
    }

    /// 티커 상세: `/v3/reference/tickers/{ticker}`
    pub fn ticker_details_url(&self, ticker: &str) -> String {
        self.path(&["v3", "reference", "tickers", ticker]).into()
    }

    /// 일봉: `/v2/aggs/ticker/{ticker}/range/1/day/{from}/{to}`
    pub fn stocks_url(&self, ticker: &str, from: NaiveDate, to: NaiveDate) -> String {
        let from = from.format(DATE_FORMAT).to_string();
        let to = to.format(DATE_FORMAT).to_string();
        self.path(&[
            "v2",
            "aggs",
            "ticker",
            ticker,
            "range",
            BAR_MULTIPLIER,
            BAR_TIMESPAN,
            &from,
            &to,
        ])
        .into()
    }

    /// `url`이 `ticker`의 일봉 요청인지 확인합니다.
    pub fn is_stocks_url_for(&self, url: &str, ticker: &str) -> bool {
        let prefix: String = self
            .path(&["v2", "aggs", "ticker", ticker, "range", ""])
            .into();
        url.starts_with(&prefix)
    }

    fn path(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }
}

/// 응답의 `next_url`에서 커서 값을 꺼냅니다. 없거나 비어 있으면 `None`.
pub fn extract_cursor(next_url: &str) -> Option<String> {
    let url = Url::parse(next_url).ok()?;
    url.query_pairs()
        .find(|(key, _)| key == CURSOR_PARAM)
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty())
}
