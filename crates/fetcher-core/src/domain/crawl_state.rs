//! 크롤 상태와 요청 슬롯.
//!
//! `FetcherState`는 크롤 시도마다 한 행씩 저장되며 가장 최근 행만 유효합니다.
//! `RequestState`는 재시작 후 중단된 요청을 이어가기 위한 1회용 URL 슬롯입니다.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// 수집 모드.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrawlMode {
    /// 장기 과거 구간 백필 (첫 패스)
    Bulk,
    /// 최근 구간 갱신 (이후 모든 패스)
    Incremental,
}

impl CrawlMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bulk => "bulk",
            Self::Incremental => "incremental",
        }
    }
}

impl std::fmt::Display for CrawlMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 영속 크롤 상태 (`fetcher_state` 테이블의 한 행).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx-support", derive(sqlx::FromRow))]
pub struct FetcherState {
    /// 저장 시 부여되는 일련번호
    pub state_id: Option<i32>,
    /// 티커 목록 요청 URL
    pub ticker_req_url: String,
    /// 티커 상세 요청 URL
    pub ticker_details_req_url: String,
    /// 가격 바 요청 URL
    pub stock_req_url: String,
    /// 상태 생성 시각
    pub created_at: DateTime<Utc>,
    /// 패스 완료 여부
    pub finished: bool,
}

impl FetcherState {
    /// 비어 있는 새 상태.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            state_id: None,
            ticker_req_url: String::new(),
            ticker_details_req_url: String::new(),
            stock_req_url: String::new(),
            created_at: now,
            finished: false,
        }
    }

    /// 완료 표시가 있고 생성 후 `window`가 지나지 않았는지 확인합니다.
    pub fn is_recently_completed(&self, now: DateTime<Utc>, window: Duration) -> bool {
        self.finished && now.signed_duration_since(self.created_at) < window
    }
}

/// 리소스 종류별 1회용 요청 URL 슬롯.
///
/// 캐시된 URL은 프로세스 수명 동안 최대 한 번만 소비됩니다.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestState {
    /// 현재 진행 중(또는 재개 대상)인 요청 URL
    pub request_url: String,
    /// 캐시된 URL 소비 여부
    pub used: bool,
}

impl RequestState {
    /// 저장된 URL로 슬롯을 만듭니다. 빈 문자열이면 재개할 요청이 없는 것입니다.
    pub fn cached(url: impl Into<String>) -> Self {
        Self {
            request_url: url.into(),
            used: false,
        }
    }

    /// 이번 요청에 사용할 URL을 결정합니다.
    ///
    /// 아직 소비되지 않은 캐시 URL이 있고 `reusable`이 허용하면 그 URL을 소비해
    /// 반환합니다. 캐시가 다른 요청을 가리키면 캐시는 그대로 두고 `fresh`를
    /// 반환합니다. 대기 중인 캐시가 없으면 `fresh`가 진행 중 요청으로 기록됩니다.
    pub fn resolve(&mut self, fresh: String, reusable: impl FnOnce(&str) -> bool) -> String {
        if self.is_pending() {
            if reusable(&self.request_url) {
                self.used = true;
                return self.request_url.clone();
            }
            return fresh;
        }
        self.record(&fresh);
        fresh
    }

    /// 재개 대상 URL이 아직 소비되지 않았는지.
    pub fn is_pending(&self) -> bool {
        !self.used && !self.request_url.is_empty()
    }

    /// 진행 중 요청 URL을 기록합니다 (커서 페이지 등).
    pub fn record(&mut self, url: &str) {
        self.request_url = url.to_string();
        self.used = true;
    }
}
