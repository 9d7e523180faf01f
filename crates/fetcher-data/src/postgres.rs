//! PostgreSQL 저장소.
//!
//! 다중 행 삽입은 UNNEST 패턴을 사용하며, 컬럼 이름과 배열 타입은
//! 각 엔티티의 `TableRecord::COLUMNS`에서 가져옵니다.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fetcher_core::{FetcherState, Stock, TableRecord, Ticker, TickerDetails};
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::instrument;

use crate::error::{DataError, Result};
use crate::store::StockStore;

/// 한 문장에 넣는 최대 행 수
const MAX_ROWS_PER_STATEMENT: usize = 1000;

const FETCHER_STATE_TABLE: &str = "fetcher_state";

/// `INSERT .. SELECT * FROM UNNEST(..) ON CONFLICT (key) DO NOTHING` 문장.
fn insert_ignore_sql<R: TableRecord>() -> String {
    let params = R::COLUMNS
        .iter()
        .enumerate()
        .map(|(i, column)| format!("${}::{}[]", i + 1, column.sql_type))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "INSERT INTO {} ({}) SELECT * FROM UNNEST({}) ON CONFLICT ({}) DO NOTHING",
        R::TABLE,
        R::column_list(),
        params,
        R::KEY
    )
}

/// PostgreSQL 기반 `StockStore`.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl StockStore for PgStore {
    #[instrument(skip(self, tickers), fields(count = tickers.len()))]
    async fn upsert_tickers(&self, tickers: &[Ticker]) -> Result<u64> {
        let sql = insert_ignore_sql::<Ticker>();
        let mut inserted = 0;

        for chunk in tickers.chunks(MAX_ROWS_PER_STATEMENT) {
            let ids: Vec<&str> = chunk.iter().map(|t| t.ticker_id.as_str()).collect();
            let names: Vec<&str> = chunk.iter().map(|t| t.company_name.as_str()).collect();
            let locales: Vec<&str> = chunk.iter().map(|t| t.company_locale.as_str()).collect();
            let currencies: Vec<&str> = chunk.iter().map(|t| t.currency_name.as_str()).collect();
            let ciks: Vec<&str> = chunk.iter().map(|t| t.ticker_cik.as_str()).collect();
            let actives: Vec<bool> = chunk.iter().map(|t| t.active).collect();
            let created: Vec<DateTime<Utc>> = chunk.iter().map(|t| t.created_at).collect();
            let updated: Vec<Option<DateTime<Utc>>> =
                chunk.iter().map(|t| t.external_updated_at).collect();

            let result = sqlx::query(&sql)
                .bind(&ids)
                .bind(&names)
                .bind(&locales)
                .bind(&currencies)
                .bind(&ciks)
                .bind(&actives)
                .bind(&created)
                .bind(&updated)
                .execute(&self.pool)
                .await
                .map_err(|e| DataError::write(Ticker::TABLE, e))?;

            inserted += result.rows_affected();
        }

        Ok(inserted)
    }

    #[instrument(skip(self, details), fields(count = details.len()))]
    async fn upsert_ticker_details(&self, details: &[TickerDetails]) -> Result<u64> {
        let sql = insert_ignore_sql::<TickerDetails>();
        let mut inserted = 0;

        for chunk in details.chunks(MAX_ROWS_PER_STATEMENT) {
            let ids: Vec<&str> = chunk.iter().map(|d| d.ticker_id.as_str()).collect();
            let descriptions: Vec<&str> =
                chunk.iter().map(|d| d.company_description.as_str()).collect();
            let homepages: Vec<&str> = chunk.iter().map(|d| d.homepage_url.as_str()).collect();
            let phones: Vec<&str> = chunk.iter().map(|d| d.phone_number.as_str()).collect();
            let employees: Vec<Option<i64>> = chunk.iter().map(|d| d.total_employees).collect();
            let states: Vec<&str> = chunk.iter().map(|d| d.company_state.as_str()).collect();
            let cities: Vec<&str> = chunk.iter().map(|d| d.company_city.as_str()).collect();
            let addresses: Vec<&str> = chunk.iter().map(|d| d.company_address.as_str()).collect();
            let postal_codes: Vec<&str> =
                chunk.iter().map(|d| d.company_postal_code.as_str()).collect();
            let created: Vec<DateTime<Utc>> = chunk.iter().map(|d| d.created_at).collect();

            let result = sqlx::query(&sql)
                .bind(&ids)
                .bind(&descriptions)
                .bind(&homepages)
                .bind(&phones)
                .bind(&employees)
                .bind(&states)
                .bind(&cities)
                .bind(&addresses)
                .bind(&postal_codes)
                .bind(&created)
                .execute(&self.pool)
                .await
                .map_err(|e| DataError::write(TickerDetails::TABLE, e))?;

            inserted += result.rows_affected();
        }

        Ok(inserted)
    }

    #[instrument(skip(self, stocks), fields(count = stocks.len()))]
    async fn upsert_stocks(&self, stocks: &[Stock]) -> Result<u64> {
        let sql = insert_ignore_sql::<Stock>();
        let mut inserted = 0;

        for chunk in stocks.chunks(MAX_ROWS_PER_STATEMENT) {
            let ids: Vec<&str> = chunk.iter().map(|s| s.stock_id.as_str()).collect();
            let tickers: Vec<&str> = chunk.iter().map(|s| s.ticker_id.as_str()).collect();
            let opens: Vec<Decimal> = chunk.iter().map(|s| s.open_price).collect();
            let closes: Vec<Decimal> = chunk.iter().map(|s| s.close_price).collect();
            let highs: Vec<Decimal> = chunk.iter().map(|s| s.highest_price).collect();
            let lows: Vec<Decimal> = chunk.iter().map(|s| s.lowest_price).collect();
            let volumes: Vec<Decimal> = chunk.iter().map(|s| s.trading_volume).collect();
            let stocked: Vec<DateTime<Utc>> = chunk.iter().map(|s| s.stocked_at).collect();
            let created: Vec<DateTime<Utc>> = chunk.iter().map(|s| s.created_at).collect();

            let result = sqlx::query(&sql)
                .bind(&ids)
                .bind(&tickers)
                .bind(&opens)
                .bind(&closes)
                .bind(&highs)
                .bind(&lows)
                .bind(&volumes)
                .bind(&stocked)
                .bind(&created)
                .execute(&self.pool)
                .await
                .map_err(|e| DataError::write(Stock::TABLE, e))?;

            inserted += result.rows_affected();
        }

        Ok(inserted)
    }

    #[instrument(skip(self, state), fields(finished = state.finished))]
    async fn insert_fetcher_state(&self, state: &FetcherState) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO fetcher_state
                (ticker_req_url, ticker_details_req_url, stock_req_url, created_at, finished)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(&state.ticker_req_url)
        .bind(&state.ticker_details_req_url)
        .bind(&state.stock_req_url)
        .bind(state.created_at)
        .bind(state.finished)
        .execute(&self.pool)
        .await
        .map_err(|e| DataError::write(FETCHER_STATE_TABLE, e))?;

        Ok(())
    }

    async fn latest_fetcher_state(&self) -> Result<Option<FetcherState>> {
        let state = sqlx::query_as::<_, FetcherState>(
            r#"
            SELECT state_id, ticker_req_url, ticker_details_req_url, stock_req_url, created_at, finished
            FROM fetcher_state
            ORDER BY created_at DESC, state_id DESC
            LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DataError::read(FETCHER_STATE_TABLE, e))?;

        Ok(state)
    }

    #[instrument(skip(self))]
    async fn query_stocks(&self, ticker_id: &str) -> Result<Vec<Stock>> {
        let sql = format!(
            "SELECT {} FROM {} WHERE ticker_id = $1 ORDER BY stocked_at ASC",
            Stock::column_list(),
            Stock::TABLE
        );

        let stocks = sqlx::query_as::<_, Stock>(&sql)
            .bind(ticker_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DataError::read(Stock::TABLE, e))?;

        Ok(stocks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stock_insert_sql() {
        assert_eq!(
            insert_ignore_sql::<Stock>(),
            "INSERT INTO stock (stock_id, ticker_id, open_price, close_price, highest_price, \
             lowest_price, trading_volume, stocked_at, created_at) SELECT * FROM UNNEST(\
             $1::text[], $2::text[], $3::numeric[], $4::numeric[], $5::numeric[], \
             $6::numeric[], $7::numeric[], $8::timestamptz[], $9::timestamptz[]) \
             ON CONFLICT (stock_id) DO NOTHING"
        );
    }

    #[test]
    fn test_ticker_insert_sql_binds_every_column() {
        let sql = insert_ignore_sql::<Ticker>();
        assert!(sql.contains("$8::timestamptz[]"));
        assert!(!sql.contains("$9"));
        assert!(sql.ends_with("ON CONFLICT (ticker_id) DO NOTHING"));
    }

    #[test]
    fn test_details_insert_sql_uses_int8_for_employees() {
        let sql = insert_ignore_sql::<TickerDetails>();
        assert!(sql.contains("$5::int8[]"));
        assert!(sql.starts_with("INSERT INTO ticker_details (ticker_id, company_description"));
    }
}
