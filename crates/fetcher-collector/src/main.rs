//! 티커 크롤러와 조회 API 서버.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use clap::Parser;
use fetcher_api::{create_router, AppState};
use fetcher_collector::modules::CrawlStateStore;
use fetcher_collector::{CollectorConfig, CollectorError, FetchOrchestrator};
use fetcher_core::init_logging;
use fetcher_data::{BatchedStorage, PgStore, StockStore};
use fetcher_provider::{HttpClient, PolygonClient, PolygonEndpoints, RateLimiter};
use sqlx::postgres::PgPoolOptions;
use tracing::{debug, error, info, warn};

#[derive(Parser)]
#[command(name = "fetcher-collector")]
#[command(about = "Resumable ticker crawler with a read API", long_about = None)]
#[command(version)]
struct Cli {
    /// 설정 파일 경로 (toml, yaml, json)
    #[arg(long)]
    config: Option<PathBuf>,

    /// 조회 API 포트 (설정값보다 우선)
    #[arg(long)]
    port: Option<u16>,

    /// 특정 티커만 수집 (예: "AAPL")
    #[arg(long)]
    ticker: Option<String>,

    /// 로그 레벨 (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();

    // 설정 로드
    let mut config = CollectorConfig::load(cli.config.as_deref())?;
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }

    // 로깅 초기화
    init_logging(config.logging.to_log_config()?)?;
    info!("Fetcher Collector 시작");
    debug!(config = ?config, "설정 로드 완료");

    // DB 연결
    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .acquire_timeout(config.database.connect_timeout())
        .connect(&config.database.url)
        .await?;
    info!("데이터베이스 연결 성공");

    let store: Arc<dyn StockStore> = Arc::new(PgStore::new(pool.clone()));
    let storage = Arc::new(BatchedStorage::new(store.clone(), config.batch.clone()));
    let checkpoint = CrawlStateStore::new(store.clone(), config.crawl.freshness());

    // 외부 API 클라이언트
    let limiter = Arc::new(RateLimiter::from_config(&config.rate_limit));
    let http = HttpClient::new(config.api.timeout(), config.retry.clone())?
        .with_rate_limiter(limiter)
        .with_api_token(config.api.api_key_param.clone(), config.api.api_token.clone());
    let client = PolygonClient::new(http, PolygonEndpoints::new(&config.api.base_url)?);

    let mut orchestrator = FetchOrchestrator::new(
        client,
        storage.clone(),
        checkpoint.clone(),
        config.crawl.clone(),
    );
    if let Some(ticker) = cli.ticker {
        orchestrator = orchestrator.with_pinned_ticker(ticker);
    }
    let (stop_tx, stop_rx) = tokio::sync::watch::channel(false);
    orchestrator = orchestrator.with_shutdown(stop_rx);
    let pinned = orchestrator.pinned_ticker().is_some();
    let snapshot = orchestrator.subscribe();

    // 조회 API 서버
    let addr = config.server.addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %addr, "조회 API 서버 시작");

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let app = create_router(AppState::new(store.clone()));
    let server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                shutdown_rx.await.ok();
            })
            .await
    });

    // 크롤 루프
    let mut crawl = tokio::spawn(async move { orchestrator.run().await });

    let grace = config.crawl.shutdown_grace();
    let joined = tokio::select! {
        _ = shutdown_signal() => {
            // 진행 중인 티커를 마치고 멈추도록 요청
            let _ = stop_tx.send(true);
            match tokio::time::timeout(grace, &mut crawl).await {
                Ok(joined) => joined,
                Err(_) => {
                    warn!(
                        grace_secs = grace.as_secs(),
                        "크롤 중지 대기 시간 초과, 태스크 취소"
                    );
                    crawl.abort();
                    (&mut crawl).await
                }
            }
        }
        joined = &mut crawl => joined,
    };

    let mut failure: Option<CollectorError> = None;
    match joined {
        Ok(Ok(())) => info!("수집 종료"),
        Ok(Err(e)) => {
            error!(error = %e, "크롤 중단");
            failure = Some(e);
        }
        Err(e) if e.is_cancelled() => warn!("크롤 태스크 취소됨"),
        Err(e) => {
            error!(error = %e, "크롤 태스크 비정상 종료");
            failure = Some(CollectorError::Other(Box::new(e)));
        }
    }

    // 종료 처리: 버퍼 비우기, 진행 상태 저장
    if let Err(e) = storage.flush().await {
        warn!(error = %e, "종료 시 버퍼 저장 실패");
    }

    let last = snapshot.borrow().clone();
    if !pinned && !last.checkpoint.finished {
        let mut state = last.checkpoint;
        state.created_at = Utc::now();
        state.finished = false;
        match checkpoint.save(&state).await {
            Ok(()) => info!(ticker_req_url = %state.ticker_req_url, "진행 상태 저장"),
            Err(e) => warn!(error = %e, "종료 시 진행 상태 저장 실패"),
        }
    }

    let _ = shutdown_tx.send(());
    match server.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(error = %e, "조회 API 서버 에러"),
        Err(e) => warn!(error = %e, "조회 API 서버 태스크 비정상 종료"),
    }

    pool.close().await;
    info!("Fetcher Collector 종료");

    match failure {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}

/// Ctrl+C 또는 SIGTERM 대기.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Ctrl+C 핸들러 설치 실패");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "SIGTERM 핸들러 설치 실패");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => warn!("Ctrl+C 수신, 종료 시작"),
        _ = terminate => warn!("SIGTERM 수신, 종료 시작"),
    }
}
