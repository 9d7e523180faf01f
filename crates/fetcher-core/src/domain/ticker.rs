//! 티커 참조 데이터.
//!
//! - `Ticker` - 목록 엔드포인트에서 수집한 종목 기본 정보
//! - `TickerDetails` - 종목별 상세 정보 (1:1)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::columns::{Column, TableRecord};

/// 종목 기본 정보.
///
/// `ticker_id`로 유일하며 삭제되지 않습니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx-support", derive(sqlx::FromRow))]
pub struct Ticker {
    /// 거래소 심볼 (예: "AAPL")
    pub ticker_id: String,
    /// 회사명
    pub company_name: String,
    /// 로케일 (예: "us")
    pub company_locale: String,
    /// 통화 (예: "usd")
    pub currency_name: String,
    /// 외부 분류 코드 (SEC CIK)
    pub ticker_cik: String,
    /// 상장 활성 여부
    pub active: bool,
    /// 수집 시각
    pub created_at: DateTime<Utc>,
    /// 데이터 제공자가 보고한 마지막 갱신 시각
    pub external_updated_at: Option<DateTime<Utc>>,
}

impl Ticker {
    /// 심볼만 채운 티커를 생성합니다.
    ///
    /// 특정 종목만 수집할 때 사용됩니다.
    pub fn with_id(ticker_id: impl Into<String>) -> Self {
        Self {
            ticker_id: ticker_id.into(),
            company_name: String::new(),
            company_locale: String::new(),
            currency_name: String::new(),
            ticker_cik: String::new(),
            active: true,
            created_at: Utc::now(),
            external_updated_at: None,
        }
    }
}

impl TableRecord for Ticker {
    const TABLE: &'static str = "ticker";
    const KEY: &'static str = "ticker_id";
    const COLUMNS: &'static [Column] = &[
        Column::new("ticker_id", "text"),
        Column::new("company_name", "text"),
        Column::new("company_locale", "text"),
        Column::new("currency_name", "text"),
        Column::new("ticker_cik", "text"),
        Column::new("active", "bool"),
        Column::new("created_at", "timestamptz"),
        Column::new("external_updated_at", "timestamptz"),
    ];
}

/// 종목 상세 정보.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx-support", derive(sqlx::FromRow))]
pub struct TickerDetails {
    /// 거래소 심볼
    pub ticker_id: String,
    /// 회사 설명
    pub company_description: String,
    /// 홈페이지 URL
    pub homepage_url: String,
    /// 대표 전화번호
    pub phone_number: String,
    /// 임직원 수
    pub total_employees: Option<i64>,
    /// 주(state)
    pub company_state: String,
    /// 도시
    pub company_city: String,
    /// 주소
    pub company_address: String,
    /// 우편번호
    pub company_postal_code: String,
    /// 수집 시각
    pub created_at: DateTime<Utc>,
}

impl TableRecord for TickerDetails {
    const TABLE: &'static str = "ticker_details";
    const KEY: &'static str = "ticker_id";
    const COLUMNS: &'static [Column] = &[
        Column::new("ticker_id", "text"),
        Column::new("company_description", "text"),
        Column::new("homepage_url", "text"),
        Column::new("phone_number", "text"),
        Column::new("total_employees", "int8"),
        Column::new("company_state", "text"),
        Column::new("company_city", "text"),
        Column::new("company_address", "text"),
        Column::new("company_postal_code", "text"),
        Column::new("created_at", "timestamptz"),
    ];
}
