//! Polygon.io REST API.
//!
//! - `endpoints`: 요청 URL 구성과 커서 추출
//! - `schema`: 응답 스키마와 도메인 변환
//! - `client`: 응답 디코딩과 status 필드 검증

mod client;
mod endpoints;
pub mod schema;

pub use client::PolygonClient;
pub use endpoints::{extract_cursor, PolygonEndpoints, DEFAULT_BASE_URL};
