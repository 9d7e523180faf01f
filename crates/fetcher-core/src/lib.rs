//! # Fetcher Core
//!
//! 티커 수집기의 핵심 도메인 모델과 공용 인프라를 제공합니다.
//!
//! - 티커 / 티커 상세 / 가격 바(`Stock`) 엔티티
//! - 크롤 상태(`FetcherState`)와 요청 슬롯(`RequestState`)
//! - 엔티티별 명시적 컬럼 목록
//! - 로깅 인프라

pub mod domain;
pub mod logging;

pub use domain::*;
pub use logging::*;
