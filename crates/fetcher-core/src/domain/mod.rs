//! 수집 대상 도메인 모델.

mod columns;
mod crawl_state;
mod stock;
mod ticker;

pub use columns::*;
pub use crawl_state::*;
pub use stock::*;
pub use ticker::*;
