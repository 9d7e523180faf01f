//! 일봉 조회 endpoint.
//!
//! # 엔드포인트
//!
//! - `GET /get?ticker=AAPL&format=csv|json`
//! - `POST /get` - 같은 필드를 JSON 본문으로 받음
//!
//! `format`을 생략하면 CSV로 응답합니다.

use std::str::FromStr;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use fetcher_core::{Stock, TableRecord};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

const CSV_CONTENT_TYPE: &str = "text/csv";
const CSV_DISPOSITION: &str = "attachment;filename=out.csv";

/// 응답 형식.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExportFormat {
    #[default]
    Csv,
    Json,
}

impl FromStr for ExportFormat {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            other => Err(ApiError::InvalidFormat(other.to_string())),
        }
    }
}

/// 조회 요청 (쿼리 문자열 또는 JSON 본문).
#[derive(Debug, Default, Deserialize)]
pub struct StocksQuery {
    pub ticker: Option<String>,
    pub format: Option<String>,
}

/// JSON 응답.
#[derive(Debug, Serialize, Deserialize)]
pub struct StocksResponse {
    pub stocks: Vec<Stock>,
}

/// GET /get
pub async fn get_stocks(
    State(state): State<Arc<AppState>>,
    Query(query): Query<StocksQuery>,
) -> ApiResult<Response> {
    export_stocks(&state, query).await
}

/// POST /get
pub async fn post_stocks(
    State(state): State<Arc<AppState>>,
    Json(query): Json<StocksQuery>,
) -> ApiResult<Response> {
    export_stocks(&state, query).await
}

async fn export_stocks(state: &AppState, query: StocksQuery) -> ApiResult<Response> {
    let ticker = query
        .ticker
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(ApiError::MissingTicker)?;
    let format = match query.format.as_deref() {
        Some(f) => f.parse()?,
        None => ExportFormat::default(),
    };

    let stocks = state.store.query_stocks(ticker).await?;
    if stocks.is_empty() {
        debug!(ticker = %ticker, "저장된 일봉 없음");
        return Err(ApiError::NotFound);
    }

    debug!(ticker = %ticker, count = stocks.len(), ?format, "일봉 조회");

    match format {
        ExportFormat::Csv => {
            let body = render_csv(&stocks)?;
            Ok((
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, CSV_CONTENT_TYPE),
                    (header::CONTENT_DISPOSITION, CSV_DISPOSITION),
                ],
                body,
            )
                .into_response())
        }
        ExportFormat::Json => Ok(Json(StocksResponse { stocks }).into_response()),
    }
}

/// 헤더 행 + 일봉 행. 컬럼 순서는 `Stock::COLUMNS`를 따릅니다.
fn render_csv(stocks: &[Stock]) -> ApiResult<Vec<u8>> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(Stock::column_names())
        .map_err(|e| ApiError::Encode(e.to_string()))?;
    for stock in stocks {
        wtr.write_record(stock.csv_record())
            .map_err(|e| ApiError::Encode(e.to_string()))?;
    }
    wtr.into_inner().map_err(|e| ApiError::Encode(e.to_string()))
}
