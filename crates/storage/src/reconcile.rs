//! The save protocol: translate an edited tree plus the deleted-items ledger
//! into statements against the node tables, inside one transaction.
//!
//! Sibling order is stored as `order_no` under a `(parent, order_no)`
//! uniqueness constraint, so a permutation of siblings cannot be written
//! directly. Every persisted node whose placement changes is first moved to
//! a disjoint temporary order (`offset + id`) before any final order value is
//! written. Ledgered rows are parked there too and only deleted after the
//! tree is written, so a node moved out of a deleted parent has already been
//! re-pointed when the cascade runs.

use std::collections::HashSet;

use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use statute_core::{
    validate, DeletedItem, IdAssignment, Node, NodeId, NodeType, SaveId, SaveRequest,
};

use crate::error::StorageError;
use crate::schema::table_name;
use crate::sqlite::insert_activity;
use crate::traits::Action;

pub const DEFAULT_TEMP_ORDER_OFFSET: i64 = 900_000;

#[derive(Debug, Clone)]
pub struct SaveOptions {
    pub save_id: SaveId,
    pub temp_order_offset: i64,
}

impl SaveOptions {
    pub fn new(save_id: SaveId) -> Self {
        Self {
            save_id,
            temp_order_offset: DEFAULT_TEMP_ORDER_OFFSET,
        }
    }

    pub fn with_temp_order_offset(mut self, offset: i64) -> Self {
        self.temp_order_offset = offset;
        self
    }
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self::new(SaveId::new())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteKind {
    Delete,
    /// Move to the temporary order range; parent unchanged.
    Relocate,
    Update,
    Insert,
}

/// One statement issued during a save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteRecord {
    pub kind: WriteKind,
    pub node_type: NodeType,
    pub id: NodeId,
    pub parent: Option<NodeId>,
    pub order_no: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct SaveOutcome {
    pub save_id: SaveId,
    /// The saved tree: every temporary id replaced, reorder markers cleared.
    pub tree: Node,
    pub assigned: Vec<IdAssignment>,
    pub deleted: Vec<DeletedItem>,
    pub journal: Vec<WriteRecord>,
}

impl SaveOutcome {
    pub fn writes(&self, kind: WriteKind) -> impl Iterator<Item = &WriteRecord> {
        self.journal.iter().filter(move |w| w.kind == kind)
    }
}

/// Runs the whole protocol on `conn`, which the caller has put inside a
/// transaction. Any error leaves the transaction to be rolled back.
pub(crate) fn reconcile(
    conn: &Connection,
    statute_id: NodeId,
    request: &SaveRequest,
    options: &SaveOptions,
) -> Result<SaveOutcome, StorageError> {
    let mut tree = request.tree.clone();
    if tree.node_type != NodeType::Statute || tree.id != statute_id {
        return Err(StorageError::InvalidData(format!(
            "tree root must be statute {statute_id}, got {} {}",
            tree.node_type.as_str(),
            tree.id
        )));
    }
    if let Some(violation) = validate::validate_for_save(&tree).into_iter().next() {
        return Err(StorageError::InvalidData(violation.to_string()));
    }
    if request.deleted_items.iter().any(|i| i.node_type == NodeType::Statute) {
        return Err(StorageError::InvalidData(
            "the statute root cannot be deleted by a save".into(),
        ));
    }

    let mut run = Reconciler {
        conn,
        save_id: options.save_id,
        offset: options.temp_order_offset,
        journal: Vec::new(),
        assigned: Vec::new(),
    };

    let mut marked = HashSet::new();
    tree.walk(&mut |n| {
        if n.order_changed {
            marked.insert(n.id);
        }
    });
    tree.clear_order_markers();

    let relocated = run.relocate(&tree, &marked)?;
    if relocated > 0 {
        info!(relocated, "moved rows to temporary order numbers");
    }
    run.park_ledger(&request.deleted_items)?;

    run.write_node(&mut tree, None, 1)?;
    run.delete_ledger(&request.deleted_items)?;

    Ok(SaveOutcome {
        save_id: options.save_id,
        tree,
        assigned: run.assigned,
        deleted: request.deleted_items.clone(),
        journal: run.journal,
    })
}

struct Reconciler<'c> {
    conn: &'c Connection,
    save_id: SaveId,
    offset: i64,
    journal: Vec<WriteRecord>,
    assigned: Vec<IdAssignment>,
}

impl Reconciler<'_> {
    /// Frees the order slots held by rows about to be deleted.
    fn park_ledger(&mut self, items: &[DeletedItem]) -> Result<(), StorageError> {
        for item in items {
            let temp = self.offset + item.id.get();
            let parked = self.conn.execute(
                &format!("UPDATE {} SET order_no = ?1 WHERE id = ?2", table_name(item.node_type)),
                params![temp, item.id.get()],
            )?;
            if parked == 0 {
                continue;
            }
            self.journal.push(WriteRecord {
                kind: WriteKind::Relocate,
                node_type: item.node_type,
                id: item.id,
                parent: None,
                order_no: Some(temp),
            });
        }
        Ok(())
    }

    /// Runs last. Anything still stored under a deleted row goes with it.
    fn delete_ledger(&mut self, items: &[DeletedItem]) -> Result<(), StorageError> {
        for item in items {
            // Rows already removed by an earlier cascade affect nothing.
            let removed = self.conn.execute(
                &format!("DELETE FROM {} WHERE id = ?1", table_name(item.node_type)),
                params![item.id.get()],
            )?;
            debug!(id = %item.id, node_type = item.node_type.as_str(), removed, "deleted");
            insert_activity(
                self.conn,
                Some(self.save_id),
                item.node_type,
                item.id,
                Action::Delete,
            )?;
            self.journal.push(WriteRecord {
                kind: WriteKind::Delete,
                node_type: item.node_type,
                id: item.id,
                parent: None,
                order_no: None,
            });
        }
        Ok(())
    }

    /// First pass: every persisted node whose target placement differs from
    /// the stored one, or that was explicitly reordered, gets a temporary order.
    fn relocate(&mut self, root: &Node, marked: &HashSet<NodeId>) -> Result<usize, StorageError> {
        let mut targets = Vec::new();
        collect_placements(root, &mut targets);

        let mut relocated = 0;
        for (node_type, id, parent, position) in targets {
            let stored = self.stored_placement(node_type, id)?;
            if stored == (parent, position) && !marked.contains(&id) {
                continue;
            }
            let temp = self.offset + id.get();
            self.conn.execute(
                &format!("UPDATE {} SET order_no = ?1 WHERE id = ?2", table_name(node_type)),
                params![temp, id.get()],
            )?;
            self.journal.push(WriteRecord {
                kind: WriteKind::Relocate,
                node_type,
                id,
                parent: Some(stored.0),
                order_no: Some(temp),
            });
            relocated += 1;
        }
        Ok(relocated)
    }

    fn stored_placement(
        &self,
        node_type: NodeType,
        id: NodeId,
    ) -> Result<(NodeId, i64), StorageError> {
        let parent_column = parent_column(node_type)?;
        self.conn
            .query_row(
                &format!(
                    "SELECT {parent_column}, order_no FROM {} WHERE id = ?1",
                    table_name(node_type)
                ),
                params![id.get()],
                |row| Ok((NodeId::new(row.get(0)?), row.get(1)?)),
            )
            .optional()?
            .ok_or_else(|| StorageError::NotFound(format!("{} {id}", node_type.as_str())))
    }

    /// Second pass, root first: update or insert `node`, then its children.
    fn write_node(
        &mut self,
        node: &mut Node,
        parent: Option<NodeId>,
        position: i64,
    ) -> Result<(), StorageError> {
        match parent {
            None => self.update_statute(node)?,
            Some(parent) if node.id.is_persisted() => self.update_child(node, parent, position)?,
            Some(parent) => self.insert_child(node, parent, position)?,
        }
        let parent_id = node.id;
        for (index, child) in node.children.iter_mut().enumerate() {
            self.write_node(child, Some(parent_id), index as i64 + 1)?;
        }
        Ok(())
    }

    fn update_statute(&mut self, node: &Node) -> Result<(), StorageError> {
        let changed = self.conn.execute(
            "UPDATE statute SET name = ?1, act_no = ?2, date = ?3, preface = ?4,
                 updated_at = CAST(unixepoch('now','subsec') * 1000 AS INTEGER)
             WHERE id = ?5",
            params![node.name, node.act_no, node.date, node.preface, node.id.get()],
        )?;
        if changed != 1 {
            return Err(StorageError::NotFound(format!("statute {}", node.id)));
        }
        self.log_write(WriteKind::Update, node, None, None)
    }

    fn update_child(&mut self, node: &Node, parent: NodeId, position: i64) -> Result<(), StorageError> {
        let columns = Columns::of(node.node_type)?;
        let sql = format!(
            "UPDATE {} SET name = ?1, {} = ?2, {} = ?3, order_no = ?4{} WHERE id = ?5",
            table_name(node.node_type),
            columns.number,
            columns.parent,
            if columns.content { ", content = ?6" } else { "" },
        );
        let changed = if columns.content {
            self.conn.execute(
                &sql,
                params![node.name, node.number, parent.get(), position, node.id.get(), node.content],
            )?
        } else {
            self.conn.execute(
                &sql,
                params![node.name, node.number, parent.get(), position, node.id.get()],
            )?
        };
        if changed != 1 {
            return Err(StorageError::NotFound(format!(
                "{} {}",
                node.node_type.as_str(),
                node.id
            )));
        }
        self.log_write(WriteKind::Update, node, Some(parent), Some(position))
    }

    fn insert_child(&mut self, node: &mut Node, parent: NodeId, position: i64) -> Result<(), StorageError> {
        let columns = Columns::of(node.node_type)?;
        self.conn.execute(
            "INSERT INTO node_ids (node_type) VALUES (?1)",
            params![node.node_type.as_str()],
        )?;
        let id = NodeId::new(self.conn.last_insert_rowid());
        let sql = format!(
            "INSERT INTO {} (id, name, {}, {}, order_no{}) VALUES (?1, ?2, ?3, ?4, ?5{})",
            table_name(node.node_type),
            columns.number,
            columns.parent,
            if columns.content { ", content" } else { "" },
            if columns.content { ", ?6" } else { "" },
        );
        if columns.content {
            self.conn.execute(
                &sql,
                params![id.get(), node.name, node.number, parent.get(), position, node.content],
            )?;
        } else {
            self.conn.execute(
                &sql,
                params![id.get(), node.name, node.number, parent.get(), position],
            )?;
        }
        self.assigned.push(IdAssignment {
            temp: node.id,
            assigned: id,
            node_type: node.node_type,
        });
        node.id = id;
        self.log_write(WriteKind::Insert, node, Some(parent), Some(position))
    }

    fn log_write(
        &mut self,
        kind: WriteKind,
        node: &Node,
        parent: Option<NodeId>,
        order_no: Option<i64>,
    ) -> Result<(), StorageError> {
        let action = match kind {
            WriteKind::Insert => Action::Create,
            _ => Action::Update,
        };
        insert_activity(self.conn, Some(self.save_id), node.node_type, node.id, action)?;
        self.journal.push(WriteRecord {
            kind,
            node_type: node.node_type,
            id: node.id,
            parent,
            order_no,
        });
        Ok(())
    }
}

/// `(type, id, parent, 1-based position)` of every persisted non-root node.
fn collect_placements(parent: &Node, out: &mut Vec<(NodeType, NodeId, NodeId, i64)>) {
    for (index, child) in parent.children.iter().enumerate() {
        if child.id.is_persisted() {
            out.push((child.node_type, child.id, parent.id, index as i64 + 1));
        }
        collect_placements(child, out);
    }
}

pub(crate) fn parent_column(node_type: NodeType) -> Result<&'static str, StorageError> {
    node_type
        .parent_column()
        .ok_or_else(|| StorageError::InvalidData(format!("{} has no parent", node_type.as_str())))
}

struct Columns {
    parent: &'static str,
    number: &'static str,
    content: bool,
}

impl Columns {
    fn of(node_type: NodeType) -> Result<Self, StorageError> {
        let number = node_type
            .number_field()
            .map(|f| f.column())
            .ok_or_else(|| StorageError::InvalidData(format!("{} is not numbered", node_type.as_str())))?;
        Ok(Self {
            parent: parent_column(node_type)?,
            number,
            content: node_type.has_content(),
        })
    }
}
