//! Polygon 응답 스키마.
//!
//! 와이어 형식을 그대로 따르는 구조체와 도메인 타입으로의 변환을 정의합니다.

use chrono::{DateTime, Utc};
use fetcher_core::{PriceBar, Stock, Ticker, TickerDetails};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;

/// 목록/상세 응답의 성공 status
pub const STATUS_OK: &str = "OK";
/// 일봉 응답에서 성공으로 취급하는 status (지연 시세 포함)
pub const AGGREGATE_SUCCESS_STATUSES: &[&str] = &["OK", "DELAYED"];

/// `GET /v3/reference/tickers` 응답.
#[derive(Debug, Clone, Deserialize)]
pub struct TickersResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub count: i64,
    #[serde(default)]
    pub next_url: Option<String>,
    #[serde(default)]
    pub request_id: Option<String>,
    #[serde(default)]
    pub results: Vec<TickerResult>,
}

/// 티커 목록의 한 항목.
#[derive(Debug, Clone, Deserialize)]
pub struct TickerResult {
    pub ticker: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub market: String,
    #[serde(default)]
    pub locale: String,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub currency_name: String,
    #[serde(default)]
    pub cik: Option<String>,
    #[serde(default)]
    pub last_updated_utc: Option<String>,
}

impl TickerResult {
    pub fn into_ticker(self, now: DateTime<Utc>) -> Ticker {
        let external_updated_at = self
            .last_updated_utc
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|t| t.with_timezone(&Utc));

        Ticker {
            ticker_id: self.ticker,
            company_name: self.name,
            company_locale: self.locale,
            currency_name: self.currency_name,
            ticker_cik: self.cik.unwrap_or_default(),
            active: self.active,
            created_at: now,
            external_updated_at,
        }
    }
}

/// `GET /v3/reference/tickers/{ticker}` 응답.
#[derive(Debug, Clone, Deserialize)]
pub struct TickerDetailsResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub request_id: Option<String>,
    pub results: Option<TickerDetailsResult>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TickerDetailsResult {
    pub ticker: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub homepage_url: String,
    #[serde(default)]
    pub phone_number: String,
    #[serde(default)]
    pub total_employees: Option<i64>,
    #[serde(default)]
    pub address: Option<Address>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Address {
    #[serde(default)]
    pub address1: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub postal_code: String,
}

impl TickerDetailsResult {
    pub fn into_details(self, now: DateTime<Utc>) -> TickerDetails {
        let address = self.address.unwrap_or_default();
        TickerDetails {
            ticker_id: self.ticker,
            company_description: self.description,
            homepage_url: self.homepage_url,
            phone_number: self.phone_number,
            total_employees: self.total_employees,
            company_state: address.state,
            company_city: address.city,
            company_address: address.address1,
            company_postal_code: address.postal_code,
            created_at: now,
        }
    }
}

/// `GET /v2/aggs/ticker/{ticker}/range/..` 응답.
#[derive(Debug, Clone, Deserialize)]
pub struct AggregatesResponse {
    #[serde(default)]
    pub ticker: String,
    #[serde(default, rename = "queryCount")]
    pub query_count: i64,
    #[serde(default, rename = "resultsCount")]
    pub results_count: i64,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub results: Vec<AggregateBar>,
}

impl AggregatesResponse {
    /// 조회된 바가 없는 응답인지 확인.
    pub fn is_empty(&self) -> bool {
        self.query_count == 0 || self.results.is_empty()
    }
}

/// 일봉 한 개.
#[derive(Debug, Clone, Deserialize)]
pub struct AggregateBar {
    pub o: f64,
    pub c: f64,
    pub h: f64,
    pub l: f64,
    pub v: f64,
    pub t: i64,
}

impl AggregateBar {
    /// 가격 값을 `Decimal`로 변환합니다. 유한하지 않은 값이 있으면 `None`.
    pub fn to_price_bar(&self) -> Option<PriceBar> {
        Some(PriceBar {
            open: Decimal::from_f64(self.o)?,
            close: Decimal::from_f64(self.c)?,
            high: Decimal::from_f64(self.h)?,
            low: Decimal::from_f64(self.l)?,
            volume: Decimal::from_f64(self.v)?,
            timestamp: self.t,
        })
    }

    pub fn to_stock(&self, ticker_id: &str, now: DateTime<Utc>) -> Option<Stock> {
        Stock::from_bar(ticker_id, self.to_price_bar()?, now)
    }
}
