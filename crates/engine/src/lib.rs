//! Editing engine: one session per statute, its undo log, drafts and the
//! save round trip against the store.

pub mod config;
pub mod draft;
pub mod endpoint;
pub mod error;
pub mod session;
pub mod undo;

pub use config::EditorConfig;
pub use draft::{Autosaver, DiscardReason, DraftSnapshot, DraftStatus};
pub use endpoint::{LocalEndpoint, SaveEndpoint};
pub use error::EngineError;
pub use session::{EditSession, PendingSave, SaveReport};
pub use undo::UndoLog;
