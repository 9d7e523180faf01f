//! 수집 데이터 영속화.
//!
//! - `StockStore`: 저장소 인터페이스
//! - `PgStore`: PostgreSQL 구현 (UNNEST 다중 행 삽입, 충돌 시 무시)
//! - `BatchedStorage`: 엔티티별 버퍼와 배치 쓰기
//! - `MemoryStore`: 테스트용 인메모리 구현 (`test-utils` 기능)

pub mod batch;
pub mod error;
#[cfg(any(test, feature = "test-utils"))]
pub mod memory;
pub mod postgres;
pub mod store;

pub use batch::{BatchConfig, BatchCounters, BatchedStorage, CounterSnapshot};
pub use error::{DataError, Result};
#[cfg(any(test, feature = "test-utils"))]
pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use store::StockStore;
