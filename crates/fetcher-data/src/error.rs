//! 저장소 오류 타입.

use thiserror::Error;

/// 저장소 오류. 쓰기/조회 오류에는 대상 테이블이 붙습니다.
#[derive(Debug, Error)]
pub enum DataError {
    /// 데이터베이스에 닿지 못함
    #[error("database unavailable: {0}")]
    Unavailable(String),

    /// 연결 풀 소진
    #[error("connection pool exhausted")]
    PoolExhausted,

    /// 쓰기 실패
    #[error("write to {table} failed: {message}")]
    Write { table: &'static str, message: String },

    /// 조회 실패
    #[error("read from {table} failed: {message}")]
    Read { table: &'static str, message: String },

    /// 고유 키 충돌 (충돌 무시 삽입에서는 발생하지 않음)
    #[error("duplicate key in {table}: {message}")]
    Duplicate { table: &'static str, message: String },
}

impl DataError {
    /// 쓰기 중 발생한 sqlx 오류를 분류합니다.
    pub fn write(table: &'static str, err: sqlx::Error) -> Self {
        classify(table, err, |table, message| Self::Write { table, message })
    }

    /// 조회 중 발생한 sqlx 오류를 분류합니다.
    pub fn read(table: &'static str, err: sqlx::Error) -> Self {
        classify(table, err, |table, message| Self::Read { table, message })
    }
}

fn classify(
    table: &'static str,
    err: sqlx::Error,
    otherwise: impl FnOnce(&'static str, String) -> DataError,
) -> DataError {
    match err {
        sqlx::Error::PoolTimedOut => DataError::PoolExhausted,
        sqlx::Error::Io(e) => DataError::Unavailable(e.to_string()),
        sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23505") => {
            DataError::Duplicate {
                table,
                message: db_err.message().to_string(),
            }
        }
        other => otherwise(table, other.to_string()),
    }
}

impl From<sqlx::Error> for DataError {
    fn from(err: sqlx::Error) -> Self {
        Self::read("unknown", err)
    }
}

pub type Result<T> = std::result::Result<T, DataError>;
