//! 엔티티별 명시적 컬럼 목록.
//!
//! SQL 삽입과 CSV 출력은 모두 여기에 선언된 순서를 따릅니다.
//! 컬럼을 추가하면 해당 엔티티의 접근자와 저장소 바인딩도 함께 바꿔야 합니다.

/// 테이블 컬럼 정의.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    /// 컬럼 이름
    pub name: &'static str,
    /// UNNEST 배열 캐스팅에 쓰이는 PostgreSQL 타입
    pub sql_type: &'static str,
}

impl Column {
    pub const fn new(name: &'static str, sql_type: &'static str) -> Self {
        Self { name, sql_type }
    }
}

/// 테이블에 매핑되는 엔티티.
pub trait TableRecord {
    /// 테이블 이름
    const TABLE: &'static str;
    /// 자연 키 컬럼 (충돌 판정 기준)
    const KEY: &'static str;
    /// 삽입 순서대로 나열한 컬럼
    const COLUMNS: &'static [Column];

    /// 쉼표로 연결한 컬럼 이름 목록.
    fn column_list() -> String {
        Self::COLUMNS
            .iter()
            .map(|c| c.name)
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// 컬럼 이름만 담은 목록 (CSV 헤더 등).
    fn column_names() -> Vec<&'static str> {
        Self::COLUMNS.iter().map(|c| c.name).collect()
    }
}
