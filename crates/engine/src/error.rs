use statute_core::CoreError;
use statute_storage::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("core error: {0}")]
    Core(#[from] CoreError),

    #[error("tree is invalid ({count} problem(s)): {first}")]
    Validation { first: String, count: usize },

    #[error("save rejected: {0}")]
    SaveRejected(String),

    #[error("undo of {operation} failed: {reason}")]
    UndoFailed {
        operation: &'static str,
        reason: CoreError,
    },

    #[error("a save is already in flight")]
    SaveInFlight,

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("draft error: {0}")]
    Draft(String),

    #[error("config error: {0}")]
    Config(String),
}
