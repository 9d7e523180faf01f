//! 티커 목록 페이지 순회.
//!
//! 첫 요청 URL은 호출자가 재개 슬롯에서 정해 넘기고, 이후 페이지는 응답의
//! `next_url`에서 꺼낸 커서로 매번 새로 만듭니다.

use async_trait::async_trait;
use fetcher_provider::polygon::{extract_cursor, schema::TickerResult};
use fetcher_provider::PolygonClient;
use tracing::debug;

use crate::Result;

/// 페이지와 티커를 받아 처리하는 쪽.
#[async_trait]
pub trait TickerVisitor: Send {
    /// 페이지 요청 직전에 호출됩니다.
    async fn on_page(&mut self, _url: &str) -> Result<()> {
        Ok(())
    }

    /// 응답 순서대로 티커마다 호출됩니다. 에러를 반환하면 순회가 중단됩니다.
    async fn on_ticker(&mut self, ticker: TickerResult) -> Result<()>;
}

/// 순회 결과.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkSummary {
    pub pages: usize,
    pub tickers: usize,
}

/// 커서 기반 티커 목록 순회기.
pub struct TickerWalker<'a> {
    client: &'a PolygonClient,
}

impl<'a> TickerWalker<'a> {
    pub fn new(client: &'a PolygonClient) -> Self {
        Self { client }
    }

    /// `first_url`부터 마지막 페이지까지 순회합니다.
    ///
    /// 각 페이지의 결과를 먼저 처리한 뒤, 결과 수가 0이거나 `next_url`이 없거나
    /// 커서가 비어 있으면 멈춥니다. 응답 status가 OK가 아니면 에러입니다.
    pub async fn walk(
        &self,
        first_url: String,
        visitor: &mut (dyn TickerVisitor + '_),
    ) -> Result<WalkSummary> {
        let mut summary = WalkSummary::default();
        let mut url = first_url;

        loop {
            visitor.on_page(&url).await?;
            let page = self.client.tickers_page(&url).await?;
            summary.pages += 1;

            debug!(
                url = %url,
                count = page.count,
                results = page.results.len(),
                "티커 페이지 수신"
            );

            for ticker in page.results {
                summary.tickers += 1;
                visitor.on_ticker(ticker).await?;
            }

            if page.count == 0 {
                break;
            }
            let Some(cursor) = page
                .next_url
                .as_deref()
                .filter(|next| !next.is_empty())
                .and_then(extract_cursor)
            else {
                break;
            };

            url = self.client.endpoints().tickers_url(Some(&cursor));
        }

        Ok(summary)
    }
}
