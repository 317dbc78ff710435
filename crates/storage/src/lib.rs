pub mod error;
pub mod reconcile;
pub mod schema;
pub mod sqlite;
pub mod traits;

pub use error::StorageError;
pub use reconcile::{SaveOptions, SaveOutcome, WriteKind, WriteRecord, DEFAULT_TEMP_ORDER_OFFSET};
pub use sqlite::SqliteStorage;
pub use traits::*;
