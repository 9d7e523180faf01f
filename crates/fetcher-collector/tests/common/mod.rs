//! 통합 테스트용 Polygon 스텁 서버와 조립 헬퍼.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use fetcher_collector::config::CrawlConfig;
use fetcher_collector::modules::CrawlStateStore;
use fetcher_collector::FetchOrchestrator;
use fetcher_data::{BatchConfig, BatchedStorage, MemoryStore, StockStore};
use fetcher_provider::{HttpClient, PolygonClient, PolygonEndpoints, RetryConfig};
use serde_json::json;

/// 스텁 서버 동작.
#[derive(Debug, Clone, Default)]
pub struct StubConfig {
    /// 페이지별 티커 목록. 마지막 페이지는 `next_url`이 없습니다.
    pub pages: Vec<Vec<&'static str>>,
    /// 일봉 조회 결과가 비어 있는 티커
    pub empty_bars: Vec<&'static str>,
    /// 목록 요청이 이 횟수를 넘으면 500
    pub list_ok_limit: Option<usize>,
    /// 일봉 요청이 이 횟수를 넘으면 500
    pub bars_ok_limit: Option<usize>,
}

#[derive(Clone)]
struct Stub {
    base_url: String,
    pages: Arc<Vec<Vec<&'static str>>>,
    empty_bars: Arc<HashSet<&'static str>>,
    list_ok_limit: Option<usize>,
    bars_ok_limit: Option<usize>,
    list_hits: Arc<AtomicUsize>,
    bars_hits: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl Stub {
    fn record(&self, uri: &Uri) {
        self.requests.lock().unwrap().push(uri.to_string());
    }
}

/// 실행 중인 스텁 서버.
pub struct StubPolygon {
    pub base_url: String,
    requests: Arc<Mutex<Vec<String>>>,
}

impl StubPolygon {
    pub async fn start(config: StubConfig) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let requests = Arc::new(Mutex::new(Vec::new()));

        let stub = Stub {
            base_url: base_url.clone(),
            pages: Arc::new(config.pages),
            empty_bars: Arc::new(config.empty_bars.into_iter().collect()),
            list_ok_limit: config.list_ok_limit,
            bars_ok_limit: config.bars_ok_limit,
            list_hits: Arc::new(AtomicUsize::new(0)),
            bars_hits: Arc::new(AtomicUsize::new(0)),
            requests: requests.clone(),
        };

        let app = Router::new()
            .route("/v3/reference/tickers", get(tickers))
            .route("/v3/reference/tickers/{ticker}", get(details))
            .route(
                "/v2/aggs/ticker/{ticker}/range/{multiplier}/{timespan}/{from}/{to}",
                get(bars),
            )
            .with_state(stub);

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, requests }
    }

    /// 받은 요청 (경로 + 쿼리).
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn list_requests(&self) -> Vec<String> {
        self.requests_with_prefix("/v3/reference/tickers?")
    }

    pub fn bar_requests(&self) -> Vec<String> {
        self.requests_with_prefix("/v2/aggs/ticker/")
    }

    fn requests_with_prefix(&self, prefix: &str) -> Vec<String> {
        self.requests()
            .into_iter()
            .filter(|uri| uri.starts_with(prefix))
            .collect()
    }
}

async fn tickers(
    State(stub): State<Stub>,
    uri: Uri,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    stub.record(&uri);
    let hit = stub.list_hits.fetch_add(1, Ordering::SeqCst);
    if stub.list_ok_limit.is_some_and(|limit| hit >= limit) {
        return (StatusCode::INTERNAL_SERVER_ERROR, "listing down").into_response();
    }

    let page = query
        .get("cursor")
        .and_then(|cursor| cursor.strip_prefix('p'))
        .and_then(|n| n.parse::<usize>().ok())
        .unwrap_or(0);
    let tickers = stub.pages.get(page).cloned().unwrap_or_default();
    let next_url = (page + 1 < stub.pages.len()).then(|| {
        format!(
            "{}/v3/reference/tickers?cursor=p{}",
            stub.base_url,
            page + 1
        )
    });

    let results: Vec<_> = tickers
        .iter()
        .map(|ticker| {
            json!({
                "ticker": ticker,
                "name": format!("{} Inc.", ticker),
                "market": "stocks",
                "locale": "us",
                "type": "CS",
                "active": true,
                "currency_name": "usd",
                "cik": "0000000001",
                "last_updated_utc": "2024-06-01T00:00:00Z"
            })
        })
        .collect();

    Json(json!({
        "status": "OK",
        "count": results.len(),
        "next_url": next_url,
        "request_id": "stub",
        "results": results,
    }))
    .into_response()
}

async fn details(State(stub): State<Stub>, uri: Uri, Path(ticker): Path<String>) -> Response {
    stub.record(&uri);
    Json(json!({
        "status": "OK",
        "request_id": "stub",
        "results": {
            "ticker": ticker,
            "description": "stub company",
            "homepage_url": "https://example.com",
            "phone_number": "555-0100",
            "total_employees": 42,
            "address": {
                "address1": "1 Main St",
                "city": "Springfield",
                "state": "IL",
                "postal_code": "62701"
            }
        }
    }))
    .into_response()
}

async fn bars(
    State(stub): State<Stub>,
    uri: Uri,
    Path((ticker, _multiplier, _timespan, _from, _to)): Path<(String, String, String, String, String)>,
) -> Response {
    stub.record(&uri);
    let hit = stub.bars_hits.fetch_add(1, Ordering::SeqCst);
    if stub.bars_ok_limit.is_some_and(|limit| hit >= limit) {
        return (StatusCode::INTERNAL_SERVER_ERROR, "aggregates down").into_response();
    }

    if stub.empty_bars.contains(ticker.as_str()) {
        return Json(json!({
            "ticker": ticker,
            "queryCount": 0,
            "resultsCount": 0,
            "adjusted": true,
            "status": "OK",
            "request_id": "stub"
        }))
        .into_response();
    }

    Json(json!({
        "ticker": ticker,
        "queryCount": 1,
        "resultsCount": 1,
        "adjusted": true,
        "status": "OK",
        "request_id": "stub",
        "results": [
            {"o": 10.5, "c": 11.25, "h": 11.5, "l": 10.0, "v": 1200.0, "t": 1717200000000_i64}
        ]
    }))
    .into_response()
}

/// 대기 없는 크롤 설정.
pub fn crawl_config(max_retries: u32) -> CrawlConfig {
    CrawlConfig {
        max_retries,
        recently_fetched_sleep_secs: 0,
        error_sleep_secs: 0,
        ..CrawlConfig::default()
    }
}

pub fn polygon_client(base_url: &str) -> PolygonClient {
    let http = HttpClient::new(
        Duration::from_secs(5),
        RetryConfig::new(1, Duration::from_millis(0)),
    )
    .unwrap()
    .with_api_token("apiKey", "test-token");
    PolygonClient::new(http, PolygonEndpoints::new(base_url).unwrap())
}

/// 인메모리 저장소 위에 오케스트레이터를 조립합니다.
pub fn orchestrator(
    base_url: &str,
    store: Arc<MemoryStore>,
    crawl: CrawlConfig,
) -> FetchOrchestrator {
    let store: Arc<dyn StockStore> = store;
    let storage = Arc::new(BatchedStorage::new(store.clone(), BatchConfig::default()));
    let checkpoint = CrawlStateStore::new(store, crawl.freshness());
    FetchOrchestrator::new(polygon_client(base_url), storage, checkpoint, crawl)
}

/// 일봉 요청 URI의 조회 구간 (일).
pub fn bar_window_days(uri: &str) -> i64 {
    let path = uri.split('?').next().unwrap();
    let segments: Vec<&str> = path.rsplit('/').take(2).collect();
    let to = chrono::NaiveDate::parse_from_str(segments[0], "%Y-%m-%d").unwrap();
    let from = chrono::NaiveDate::parse_from_str(segments[1], "%Y-%m-%d").unwrap();
    (to - from).num_days()
}
