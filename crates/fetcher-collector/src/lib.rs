//! 재개 가능한 티커 크롤러.
//!
//! 이 crate는 외부 시세 API를 순회하며 데이터를 저장하는 바이너리를 제공합니다:
//! - 티커 목록 페이지 순회 (커서 기반)
//! - 티커 상세 및 일봉 수집 (백필 후 증분)
//! - 크롤 상태 저장과 재시작 시 재개

pub mod config;
pub mod error;
pub mod modules;
pub mod stats;

pub use config::CollectorConfig;
pub use error::{CollectorError, Result};
pub use modules::{CrawlSnapshot, FetchOrchestrator, OrchestratorState};
pub use stats::PassStats;
