use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("invalid data: {0}")]
    InvalidData(String),

    #[error("core error: {0}")]
    Core(#[from] statute_core::CoreError),
}

impl StorageError {
    /// True when the store refused a write because of a uniqueness or
    /// foreign-key constraint.
    pub fn is_constraint(&self) -> bool {
        match self {
            Self::ConstraintViolation(_) => true,
            Self::Sqlite(rusqlite::Error::SqliteFailure(err, _)) => {
                err.code == rusqlite::ErrorCode::ConstraintViolation
            }
            _ => false,
        }
    }
}
