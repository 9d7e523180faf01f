//! 크롤 구성 요소.

pub mod checkpoint;
pub mod orchestrator;
pub mod stock_fetch;
pub mod ticker_walk;

pub use checkpoint::{CrawlStateStore, ResumeSlots};
pub use orchestrator::{CrawlSnapshot, FetchOrchestrator, ModeState, OrchestratorState};
pub use stock_fetch::{date_range, TickerFetcher};
pub use ticker_walk::{TickerVisitor, TickerWalker, WalkSummary};
