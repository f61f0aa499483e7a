//! Database errors

use thiserror::Error;

/// Database errors
#[derive(Error, Debug)]
pub enum DbError {
    /// SQLx error
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// Record not found
    #[error("record not found")]
    NotFound,

    /// Unique constraint violated
    #[error("unique constraint violated: {0}")]
    UniqueViolation(&'static str),

    /// Stored value could not be decoded into a domain type
    #[error("corrupt record: {0}")]
    Corrupt(String),

    /// Storage refused the operation
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Database result type
pub type DbResult<T> = Result<T, DbError>;

impl DbError {
    /// Map an insert failure, recognising unique violations
    pub(crate) fn from_insert(err: sqlx::Error, constraint: &'static str) -> Self {
        match &err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                Self::UniqueViolation(constraint)
            }
            _ => Self::Sqlx(err),
        }
    }
}
