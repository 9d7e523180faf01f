//! 일봉 가격 바(`Stock`).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::columns::{Column, TableRecord};

/// 이 값보다 작은 타임스탬프는 초 단위로 본다 (밀리초라면 1973년 이전).
const SECONDS_THRESHOLD: u64 = 100_000_000_000;

/// 일봉 가격 바.
///
/// `stock_id`는 `"{ticker_id}-{timestamp}"` 형태의 합성 키이며,
/// 같은 바를 다시 저장하면 아무 일도 일어나지 않습니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx-support", derive(sqlx::FromRow))]
pub struct Stock {
    /// 합성 키 (티커 + 바 타임스탬프)
    pub stock_id: String,
    /// 거래소 심볼
    pub ticker_id: String,
    /// 시가
    pub open_price: Decimal,
    /// 종가
    pub close_price: Decimal,
    /// 고가
    pub highest_price: Decimal,
    /// 저가
    pub lowest_price: Decimal,
    /// 거래량
    pub trading_volume: Decimal,
    /// 바 시각
    pub stocked_at: DateTime<Utc>,
    /// 수집 시각
    pub created_at: DateTime<Utc>,
}

/// 가격 바의 원시 값 묶음.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceBar {
    pub open: Decimal,
    pub close: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub volume: Decimal,
    /// 데이터 제공자가 보낸 epoch 타임스탬프 (보통 밀리초)
    pub timestamp: i64,
}

impl Stock {
    /// 가격 바로부터 `Stock`을 생성합니다.
    ///
    /// 타임스탬프를 해석할 수 없으면 `None`을 반환합니다.
    pub fn from_bar(ticker_id: &str, bar: PriceBar, now: DateTime<Utc>) -> Option<Self> {
        let stocked_at = timestamp_to_utc(bar.timestamp)?;
        Some(Self {
            stock_id: stock_id(ticker_id, bar.timestamp),
            ticker_id: ticker_id.to_string(),
            open_price: bar.open,
            close_price: bar.close,
            highest_price: bar.high,
            lowest_price: bar.low,
            trading_volume: bar.volume,
            stocked_at,
            created_at: now,
        })
    }

    /// CSV 한 행. `Stock::COLUMNS` 순서를 따릅니다.
    pub fn csv_record(&self) -> [String; 9] {
        [
            self.stock_id.clone(),
            self.ticker_id.clone(),
            self.open_price.to_string(),
            self.close_price.to_string(),
            self.highest_price.to_string(),
            self.lowest_price.to_string(),
            self.trading_volume.to_string(),
            self.stocked_at.to_rfc3339(),
            self.created_at.to_rfc3339(),
        ]
    }
}

impl TableRecord for Stock {
    const TABLE: &'static str = "stock";
    const KEY: &'static str = "stock_id";
    const COLUMNS: &'static [Column] = &[
        Column::new("stock_id", "text"),
        Column::new("ticker_id", "text"),
        Column::new("open_price", "numeric"),
        Column::new("close_price", "numeric"),
        Column::new("highest_price", "numeric"),
        Column::new("lowest_price", "numeric"),
        Column::new("trading_volume", "numeric"),
        Column::new("stocked_at", "timestamptz"),
        Column::new("created_at", "timestamptz"),
    ];
}

/// 가격 바의 합성 키.
pub fn stock_id(ticker_id: &str, timestamp: i64) -> String {
    format!("{}-{}", ticker_id, timestamp)
}

/// epoch 타임스탬프를 UTC 시각으로 변환합니다.
///
/// 데이터 제공자는 보통 밀리초를 보내지만 일부 응답은 초 단위입니다.
/// 크기로 단위를 판별합니다.
pub fn timestamp_to_utc(ts: i64) -> Option<DateTime<Utc>> {
    if ts.unsigned_abs() < SECONDS_THRESHOLD {
        DateTime::from_timestamp(ts, 0)
    } else {
        DateTime::from_timestamp_millis(ts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
    }

    fn bar(timestamp: i64) -> PriceBar {
        PriceBar {
            open: dec!(189.5),
            close: dec!(191.25),
            high: dec!(192),
            low: dec!(188.75),
            volume: dec!(51234567),
            timestamp,
        }
    }

    #[test]
    fn test_stock_id_composition() {
        let stock = Stock::from_bar("AAPL", bar(1_717_200_000_000), now()).unwrap();
        assert_eq!(stock.stock_id, "AAPL-1717200000000");
        assert_eq!(stock.ticker_id, "AAPL");
        assert_eq!(stock.close_price, dec!(191.25));
        assert_eq!(stock.created_at, now());
    }

    #[test]
    fn test_timestamp_millis() {
        let t = timestamp_to_utc(1_717_200_000_000).unwrap();
        assert_eq!(t, Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_timestamp_seconds_fallback() {
        let t = timestamp_to_utc(1_717_200_000).unwrap();
        assert_eq!(t, Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_timestamp_extremes_do_not_panic() {
        assert!(timestamp_to_utc(i64::MIN).is_none());
        assert!(timestamp_to_utc(i64::MAX).is_none());
        assert_eq!(
            timestamp_to_utc(-1_000),
            DateTime::from_timestamp(-1_000, 0)
        );
    }

    #[test]
    fn test_csv_record_matches_columns() {
        let stock = Stock::from_bar("MSFT", bar(1_717_200_000_000), now()).unwrap();
        let record = stock.csv_record();
        assert_eq!(record.len(), Stock::COLUMNS.len());
        assert_eq!(record[0], "MSFT-1717200000000");
        assert_eq!(record[2], "189.5");
    }

    proptest! {
        #[test]
        fn prop_millis_and_seconds_agree(secs in 100_000_000i64..4_000_000_000i64) {
            let expected = DateTime::from_timestamp(secs, 0);
            prop_assert_eq!(timestamp_to_utc(secs), expected);
            prop_assert_eq!(timestamp_to_utc(secs * 1000), expected);
        }
    }
}
