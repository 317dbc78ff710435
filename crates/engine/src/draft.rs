//! Local drafts: point-in-time snapshots of a dirty session, kept so unsaved
//! work survives a closed editor.
//!
//! A draft is a MessagePack blob plus a blake3 checksum of the blob. Drafts
//! that fail the checksum or are older than the configured age are dropped
//! without asking.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use statute_core::{DeletedLedger, Node, NodeId};
use statute_storage::{DraftRecord, DraftStore};

use crate::config::EditorConfig;
use crate::error::EngineError;
use crate::session::EditSession;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftSnapshot {
    pub statute_id: NodeId,
    pub tree: Node,
    pub deleted_items: DeletedLedger,
    pub timestamp_ms: u64,
}

impl DraftSnapshot {
    pub fn of(session: &EditSession, timestamp_ms: u64) -> Self {
        let (tree, deleted_items) = session.snapshot();
        Self {
            statute_id: session.statute_id(),
            tree,
            deleted_items,
            timestamp_ms,
        }
    }

    pub fn encode(&self) -> Result<DraftRecord, EngineError> {
        let payload = rmp_serde::to_vec_named(self).map_err(|e| EngineError::Draft(e.to_string()))?;
        let checksum = *blake3::hash(&payload).as_bytes();
        Ok(DraftRecord {
            statute_id: self.statute_id,
            payload,
            checksum,
            saved_at_ms: self.timestamp_ms,
        })
    }

    pub fn decode(record: &DraftRecord) -> Result<Self, EngineError> {
        if *blake3::hash(&record.payload).as_bytes() != record.checksum {
            return Err(EngineError::Draft("checksum mismatch".into()));
        }
        let snapshot: Self =
            rmp_serde::from_slice(&record.payload).map_err(|e| EngineError::Draft(e.to_string()))?;
        if snapshot.statute_id != record.statute_id {
            return Err(EngineError::Draft(format!(
                "draft for statute {} stored under {}",
                snapshot.statute_id, record.statute_id
            )));
        }
        Ok(snapshot)
    }

    pub fn age_ms(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.timestamp_ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardReason {
    Stale,
    Corrupt,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DraftStatus {
    Missing,
    /// A draft existed but was deleted unprompted.
    Discarded(DiscardReason),
    /// A usable draft; the caller decides whether to restore it.
    Available(DraftSnapshot),
}

pub fn save_draft(
    store: &mut impl DraftStore,
    session: &EditSession,
    now_ms: u64,
) -> Result<(), EngineError> {
    let record = DraftSnapshot::of(session, now_ms).encode()?;
    debug!(statute_id = %record.statute_id, bytes = record.payload.len(), "draft written");
    store.put_draft(&record)?;
    Ok(())
}

/// Looks for a draft of `statute_id`, dropping it when stale or corrupt.
pub fn check_draft(
    store: &mut impl DraftStore,
    statute_id: NodeId,
    now_ms: u64,
    max_age_ms: u64,
) -> Result<DraftStatus, EngineError> {
    let Some(record) = store.get_draft(statute_id)? else {
        return Ok(DraftStatus::Missing);
    };
    let snapshot = match DraftSnapshot::decode(&record) {
        Ok(snapshot) => snapshot,
        Err(err) => {
            warn!(%statute_id, error = %err, "discarding corrupt draft");
            store.delete_draft(statute_id)?;
            return Ok(DraftStatus::Discarded(DiscardReason::Corrupt));
        }
    };
    let age = snapshot.age_ms(now_ms);
    if age >= max_age_ms {
        warn!(%statute_id, age_ms = age, "discarding stale draft");
        store.delete_draft(statute_id)?;
        return Ok(DraftStatus::Discarded(DiscardReason::Stale));
    }
    Ok(DraftStatus::Available(snapshot))
}

pub fn discard_draft(store: &mut impl DraftStore, statute_id: NodeId) -> Result<bool, EngineError> {
    Ok(store.delete_draft(statute_id)?)
}

/// Replaces the session's tree and ledger with the draft's.
pub fn restore_draft(session: &mut EditSession, snapshot: DraftSnapshot) -> Result<(), EngineError> {
    if snapshot.statute_id != session.statute_id() {
        return Err(EngineError::Draft(format!(
            "draft belongs to statute {}, session edits {}",
            snapshot.statute_id,
            session.statute_id()
        )));
    }
    session.restore(snapshot.tree, snapshot.deleted_items)
}

/// Periodic draft writer. The embedding event loop calls `tick` with the
/// current time; a draft is written only for a dirty session and at most once
/// per interval.
#[derive(Debug, Clone)]
pub struct Autosaver {
    interval_ms: u64,
    last_ms: Option<u64>,
}

impl Autosaver {
    pub fn new(config: &EditorConfig) -> Self {
        Self {
            interval_ms: config.autosave_interval_ms(),
            last_ms: None,
        }
    }

    pub fn tick(
        &mut self,
        store: &mut impl DraftStore,
        session: &EditSession,
        now_ms: u64,
    ) -> Result<bool, EngineError> {
        if !session.is_dirty() {
            return Ok(false);
        }
        if self
            .last_ms
            .is_some_and(|last| now_ms.saturating_sub(last) < self.interval_ms)
        {
            return Ok(false);
        }
        save_draft(store, session, now_ms)?;
        self.last_ms = Some(now_ms);
        Ok(true)
    }

    /// Call after a successful save; the store's copy is now canonical.
    pub fn saved(&mut self, store: &mut impl DraftStore, statute_id: NodeId) -> Result<(), EngineError> {
        discard_draft(store, statute_id)?;
        self.last_ms = None;
        Ok(())
    }
}
