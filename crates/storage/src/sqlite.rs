use rusqlite::{params, Connection, OptionalExtension};
use tracing::{info, warn};

use statute_core::{ids::*, Node, NodeType, SaveRequest};

use crate::error::StorageError;
use crate::reconcile::{self, parent_column, SaveOptions, SaveOutcome, DEFAULT_TEMP_ORDER_OFFSET};
use crate::schema::table_name;
use crate::traits::{
    Action, ActivityPage, ActivityRecord, DraftRecord, DraftStore, NewStatute, StatuteStore,
    StatuteSummary,
};

/// Convert Vec<u8> to fixed-size array with proper error handling.
fn to_array<const N: usize>(v: Vec<u8>, label: &str) -> Result<[u8; N], StorageError> {
    v.try_into()
        .map_err(|_| StorageError::Serialization(format!("invalid {label} length")))
}

pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    pub fn open(path: &str) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;
        crate::schema::init_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        crate::schema::init_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Stored `(parent id, order_no)` of a non-root node.
    pub fn placement(&self, node_type: NodeType, id: NodeId) -> Result<Option<(NodeId, i64)>, StorageError> {
        let parent_column = parent_column(node_type)?;
        Ok(self
            .conn
            .query_row(
                &format!(
                    "SELECT {parent_column}, order_no FROM {} WHERE id = ?1",
                    table_name(node_type)
                ),
                params![id.get()],
                |row| Ok((NodeId::new(row.get(0)?), row.get(1)?)),
            )
            .optional()?)
    }

    fn reconcile_in_transaction(
        &mut self,
        statute_id: NodeId,
        request: &SaveRequest,
        options: &SaveOptions,
    ) -> Result<SaveOutcome, StorageError> {
        let tx = self.conn.transaction()?;
        let outcome = reconcile::reconcile(&tx, statute_id, request, options)?;
        tx.commit()?;
        Ok(outcome)
    }

    /// Raw SQL access for fixtures that need to seed or tamper with rows.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

pub(crate) fn insert_activity(
    conn: &Connection,
    save_id: Option<SaveId>,
    node_type: NodeType,
    record_id: NodeId,
    action: Action,
) -> Result<(), StorageError> {
    conn.execute(
        "INSERT INTO activity_log (save_id, table_name, record_id, action) VALUES (?1, ?2, ?3, ?4)",
        params![
            save_id.map(|id| id.as_bytes().to_vec()),
            node_type.as_str(),
            record_id.get(),
            action.as_str(),
        ],
    )?;
    Ok(())
}

fn load_children(conn: &Connection, parent: &Node) -> Result<Vec<Node>, StorageError> {
    let mut rows: Vec<(i64, usize, Node)> = Vec::new();
    for (rank, &child_type) in parent.node_type.child_types().iter().enumerate() {
        let parent_column = parent_column(child_type)?;
        let number_column = child_type
            .number_field()
            .map(|f| f.column())
            .ok_or_else(|| StorageError::InvalidData(format!("{} is not numbered", child_type.as_str())))?;
        let content = if child_type.has_content() { "content" } else { "NULL" };
        let mut stmt = conn.prepare(&format!(
            "SELECT id, name, {number_column}, {content}, order_no FROM {} WHERE {parent_column} = ?1",
            table_name(child_type)
        ))?;
        let found = stmt.query_map(params![parent.id.get()], |row| {
            let id: i64 = row.get(0)?;
            let name: String = row.get(1)?;
            let number: Option<String> = row.get(2)?;
            let content: Option<String> = row.get(3)?;
            let order_no: i64 = row.get(4)?;
            Ok((id, name, number, content, order_no))
        })?;
        for row in found {
            let (id, name, number, content, order_no) = row?;
            let mut node = Node::new(NodeId::new(id), child_type, name);
            node.number = number;
            node.content = content;
            rows.push((order_no, rank, node));
        }
    }
    rows.sort_by_key(|(order_no, rank, _)| (*order_no, *rank));

    let mut children = Vec::with_capacity(rows.len());
    for (_, _, mut node) in rows {
        node.children = load_children(conn, &node)?;
        children.push(node);
    }
    Ok(children)
}

fn load_statute(conn: &Connection, statute_id: NodeId) -> Result<Node, StorageError> {
    let mut root = conn
        .query_row(
            "SELECT id, name, act_no, date, preface FROM statute WHERE id = ?1",
            params![statute_id.get()],
            |row| {
                let mut node = Node::new(NodeId::new(row.get(0)?), NodeType::Statute, row.get::<_, String>(1)?);
                node.act_no = row.get(2)?;
                node.date = row.get(3)?;
                node.preface = row.get(4)?;
                Ok(node)
            },
        )
        .optional()?
        .ok_or_else(|| StorageError::NotFound(format!("statute {statute_id}")))?;
    root.children = load_children(conn, &root)?;
    Ok(root)
}

fn trimmed(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn read_activity(row: &rusqlite::Row) -> Result<ActivityRecord, StorageError> {
    let save_id: Option<Vec<u8>> = row.get(1)?;
    let node_type: String = row.get(2)?;
    let action: String = row.get(4)?;
    Ok(ActivityRecord {
        id: row.get(0)?,
        save_id: save_id
            .map(|bytes| to_array::<16>(bytes, "save_id").map(SaveId::from_bytes))
            .transpose()?,
        node_type: NodeType::parse(&node_type)?,
        record_id: NodeId::new(row.get(3)?),
        action: Action::parse(&action)?,
        at_ms: row.get(5)?,
    })
}

const ACTIVITY_COLUMNS: &str = "id, save_id, table_name, record_id, action, at_ms";

impl StatuteStore for SqliteStorage {
    fn load_tree(&self, statute_id: NodeId) -> Result<Node, StorageError> {
        load_statute(&self.conn, statute_id)
    }

    fn save_tree(
        &mut self,
        statute_id: NodeId,
        request: &SaveRequest,
        options: &SaveOptions,
    ) -> Result<SaveOutcome, StorageError> {
        info!(
            %statute_id,
            save_id = %options.save_id,
            deletes = request.deleted_items.len(),
            "save started"
        );
        insert_activity(
            &self.conn,
            Some(options.save_id),
            NodeType::Statute,
            statute_id,
            Action::SaveAttempt,
        )?;

        match self.reconcile_in_transaction(statute_id, request, options) {
            Ok(outcome) => {
                // The transaction is committed; a logging failure must not
                // report the save as failed.
                if let Err(err) = insert_activity(
                    &self.conn,
                    Some(options.save_id),
                    NodeType::Statute,
                    statute_id,
                    Action::SaveSuccess,
                ) {
                    warn!(%statute_id, error = %err, "could not log save success");
                }
                info!(
                    %statute_id,
                    inserted = outcome.assigned.len(),
                    writes = outcome.journal.len(),
                    "save committed"
                );
                Ok(outcome)
            }
            Err(err) => {
                warn!(%statute_id, error = %err, "save rolled back");
                if let Err(log_err) = insert_activity(
                    &self.conn,
                    Some(options.save_id),
                    NodeType::Statute,
                    statute_id,
                    Action::SaveFailed,
                ) {
                    warn!(%statute_id, error = %log_err, "could not log save failure");
                }
                Err(err)
            }
        }
    }

    fn create_statute(&mut self, statute: &NewStatute) -> Result<Node, StorageError> {
        let problems = self.validate_new_statute(statute)?;
        if let Some(first) = problems.into_iter().next() {
            return Err(StorageError::ConstraintViolation(first));
        }

        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO node_ids (node_type) VALUES (?1)",
            params![NodeType::Statute.as_str()],
        )?;
        let id = NodeId::new(tx.last_insert_rowid());
        let name = statute.name.trim();
        let inserted = tx.execute(
            "INSERT INTO statute (id, name, act_no, date, preface) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                id.get(),
                name,
                trimmed(&statute.act_no),
                trimmed(&statute.date),
                trimmed(&statute.preface),
            ],
        );
        match inserted {
            Ok(_) => {}
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                return Err(StorageError::ConstraintViolation(
                    "duplicate or invalid statute value".into(),
                ));
            }
            Err(e) => return Err(StorageError::Sqlite(e)),
        }
        insert_activity(&tx, None, NodeType::Statute, id, Action::Create)?;
        tx.commit()?;

        info!(%id, name, "statute created");
        load_statute(&self.conn, id)
    }

    fn validate_new_statute(&self, statute: &NewStatute) -> Result<Vec<String>, StorageError> {
        let mut problems = Vec::new();
        let name = statute.name.trim();
        if name.is_empty() {
            problems.push("Statute name is required".to_string());
        } else if name.chars().count() > 255 {
            problems.push("Statute name is too long (maximum 255 characters)".to_string());
        }
        let act_no = trimmed(&statute.act_no);
        if act_no.as_ref().is_some_and(|a| a.chars().count() > 100) {
            problems.push("Act number is too long (maximum 100 characters)".to_string());
        }

        if !name.is_empty() {
            let taken: bool = self.conn.query_row(
                "SELECT EXISTS (SELECT 1 FROM statute WHERE name = ?1)",
                params![name],
                |row| row.get(0),
            )?;
            if taken {
                problems.push("A statute with this name already exists".to_string());
            }
        }
        if let Some(act_no) = act_no {
            let taken: bool = self.conn.query_row(
                "SELECT EXISTS (SELECT 1 FROM statute WHERE act_no = ?1)",
                params![act_no],
                |row| row.get(0),
            )?;
            if taken {
                problems.push("A statute with this act number already exists".to_string());
            }
        }
        Ok(problems)
    }

    fn list_statutes(&self) -> Result<Vec<StatuteSummary>, StorageError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, act_no, date FROM statute ORDER BY name, id")?;
        let statutes = stmt
            .query_map([], |row| {
                Ok(StatuteSummary {
                    id: NodeId::new(row.get(0)?),
                    name: row.get(1)?,
                    act_no: row.get(2)?,
                    date: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(statutes)
    }

    fn record_activity(
        &mut self,
        save_id: Option<SaveId>,
        node_type: NodeType,
        record_id: NodeId,
        action: Action,
    ) -> Result<(), StorageError> {
        insert_activity(&self.conn, save_id, node_type, record_id, action)
    }

    fn activity_page(&self, page: u32, limit: u32) -> Result<ActivityPage, StorageError> {
        let page = page.max(1);
        let limit = limit.max(1);
        let offset = i64::from(page - 1) * i64::from(limit);

        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ACTIVITY_COLUMNS} FROM activity_log ORDER BY at_ms DESC, id DESC LIMIT ?1 OFFSET ?2"
        ))?;
        let mut rows = stmt.query(params![i64::from(limit), offset])?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(read_activity(row)?);
        }

        let total: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM activity_log", [], |row| row.get(0))?;
        let total = total as u64;
        Ok(ActivityPage {
            records,
            page,
            limit,
            total,
            total_pages: total.div_ceil(u64::from(limit)),
        })
    }

    fn activity_for_save(&self, save_id: SaveId) -> Result<Vec<ActivityRecord>, StorageError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ACTIVITY_COLUMNS} FROM activity_log WHERE save_id = ?1 ORDER BY id"
        ))?;
        let mut rows = stmt.query(params![save_id.as_bytes().as_slice()])?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(read_activity(row)?);
        }
        Ok(records)
    }

    fn normalize_sibling_order(
        &mut self,
        parent_id: NodeId,
        child_type: NodeType,
    ) -> Result<usize, StorageError> {
        let parent_column = parent_column(child_type)?;
        let table = table_name(child_type);
        let tx = self.conn.transaction()?;
        let ids: Vec<i64> = {
            let mut stmt = tx.prepare(&format!(
                "SELECT id FROM {table} WHERE {parent_column} = ?1 ORDER BY order_no, id"
            ))?;
            stmt.query_map(params![parent_id.get()], |row| row.get(0))?
                .collect::<Result<Vec<_>, _>>()?
        };
        let update = format!("UPDATE {table} SET order_no = ?1 WHERE id = ?2");
        for id in &ids {
            tx.execute(&update, params![DEFAULT_TEMP_ORDER_OFFSET + id, id])?;
        }
        for (index, id) in ids.iter().enumerate() {
            tx.execute(&update, params![index as i64 + 1, id])?;
        }
        tx.commit()?;
        info!(%parent_id, child_type = child_type.as_str(), count = ids.len(), "normalized order numbers");
        Ok(ids.len())
    }
}

impl DraftStore for SqliteStorage {
    fn put_draft(&mut self, draft: &DraftRecord) -> Result<(), StorageError> {
        self.conn.execute(
            "INSERT INTO drafts (statute_id, payload, checksum, saved_at_ms) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(statute_id) DO UPDATE SET payload = excluded.payload, checksum = excluded.checksum, saved_at_ms = excluded.saved_at_ms",
            params![
                draft.statute_id.get(),
                draft.payload,
                &draft.checksum[..],
                draft.saved_at_ms as i64,
            ],
        )?;
        Ok(())
    }

    fn get_draft(&self, statute_id: NodeId) -> Result<Option<DraftRecord>, StorageError> {
        let row = self
            .conn
            .query_row(
                "SELECT payload, checksum, saved_at_ms FROM drafts WHERE statute_id = ?1",
                params![statute_id.get()],
                |row| {
                    let payload: Vec<u8> = row.get(0)?;
                    let checksum: Vec<u8> = row.get(1)?;
                    let saved_at_ms: i64 = row.get(2)?;
                    Ok((payload, checksum, saved_at_ms))
                },
            )
            .optional()?;
        match row {
            Some((payload, checksum, saved_at_ms)) => Ok(Some(DraftRecord {
                statute_id,
                payload,
                checksum: to_array::<32>(checksum, "checksum")?,
                saved_at_ms: saved_at_ms as u64,
            })),
            None => Ok(None),
        }
    }

    fn delete_draft(&mut self, statute_id: NodeId) -> Result<bool, StorageError> {
        let removed = self
            .conn
            .execute("DELETE FROM drafts WHERE statute_id = ?1", params![statute_id.get()])?;
        Ok(removed > 0)
    }
}
