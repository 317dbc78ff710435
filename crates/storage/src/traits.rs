use statute_core::{ids::*, Node, NodeType, SaveRequest};

use crate::error::StorageError;
use crate::reconcile::{SaveOptions, SaveOutcome};

/// Activity-log action names, as written to the `action` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Access,
    Create,
    Update,
    Delete,
    SaveAttempt,
    SaveSuccess,
    SaveFailed,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Access => "ACCESS",
            Self::Create => "CREATE",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
            Self::SaveAttempt => "SAVE_ATTEMPT",
            Self::SaveSuccess => "SAVE_SUCCESS",
            Self::SaveFailed => "SAVE_FAILED",
        }
    }

    pub fn parse(s: &str) -> Result<Self, StorageError> {
        match s {
            "ACCESS" => Ok(Self::Access),
            "CREATE" => Ok(Self::Create),
            "UPDATE" => Ok(Self::Update),
            "DELETE" => Ok(Self::Delete),
            "SAVE_ATTEMPT" => Ok(Self::SaveAttempt),
            "SAVE_SUCCESS" => Ok(Self::SaveSuccess),
            "SAVE_FAILED" => Ok(Self::SaveFailed),
            _ => Err(StorageError::Serialization(format!("unknown activity action: {s}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityRecord {
    pub id: i64,
    pub save_id: Option<SaveId>,
    pub node_type: NodeType,
    pub record_id: NodeId,
    pub action: Action,
    pub at_ms: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityPage {
    pub records: Vec<ActivityRecord>,
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatuteSummary {
    pub id: NodeId,
    pub name: String,
    pub act_no: Option<String>,
    pub date: Option<String>,
}

/// Fields of a statute about to be created. Blank optional values are stored as NULL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewStatute {
    pub name: String,
    pub act_no: Option<String>,
    pub date: Option<String>,
    pub preface: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftRecord {
    pub statute_id: NodeId,
    pub payload: Vec<u8>,
    pub checksum: [u8; 32],
    pub saved_at_ms: u64,
}

pub trait StatuteStore {
    /// The statute and its whole hierarchy, children in order-number order.
    fn load_tree(&self, statute_id: NodeId) -> Result<Node, StorageError>;

    /// Persist an edited tree in one transaction. See [`crate::reconcile`].
    fn save_tree(
        &mut self,
        statute_id: NodeId,
        request: &SaveRequest,
        options: &SaveOptions,
    ) -> Result<SaveOutcome, StorageError>;

    fn create_statute(&mut self, statute: &NewStatute) -> Result<Node, StorageError>;

    /// User-facing problems that would stop `create_statute`; empty when it would succeed.
    fn validate_new_statute(&self, statute: &NewStatute) -> Result<Vec<String>, StorageError>;

    fn list_statutes(&self) -> Result<Vec<StatuteSummary>, StorageError>;

    fn record_activity(
        &mut self,
        save_id: Option<SaveId>,
        node_type: NodeType,
        record_id: NodeId,
        action: Action,
    ) -> Result<(), StorageError>;

    /// Newest first. `page` is 1-based.
    fn activity_page(&self, page: u32, limit: u32) -> Result<ActivityPage, StorageError>;

    fn activity_for_save(&self, save_id: SaveId) -> Result<Vec<ActivityRecord>, StorageError>;

    /// Compact the order numbers of one sibling group to 1..n, keeping the
    /// current order (ties broken by id). Returns the group size.
    fn normalize_sibling_order(
        &mut self,
        parent_id: NodeId,
        child_type: NodeType,
    ) -> Result<usize, StorageError>;
}

/// Local snapshots of unsaved sessions, one per statute.
pub trait DraftStore {
    fn put_draft(&mut self, draft: &DraftRecord) -> Result<(), StorageError>;

    fn get_draft(&self, statute_id: NodeId) -> Result<Option<DraftRecord>, StorageError>;

    fn delete_draft(&mut self, statute_id: NodeId) -> Result<bool, StorageError>;
}
