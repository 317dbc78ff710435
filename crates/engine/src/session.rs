use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::{debug, info, warn};

use statute_core::{
    ids::*,
    naming,
    operations::{MoveDirection, OperationPayload, OperationRecord},
    stats::{CascadeStats, NodeStats, TreeStats},
    template::{self, BatchSpec, StructureTemplate},
    tree, validate, Clock, CoreError, DeletedItem, DeletedLedger, IdAssignment, Node, NodeField,
    NodeType, SaveRequest, SaveResponse, SystemClock, Violation,
};

use crate::config::EditorConfig;
use crate::endpoint::SaveEndpoint;
use crate::error::EngineError;
use crate::undo::{apply_inverse, UndoLog};

/// A save that has been handed to the endpoint and not yet finished.
#[derive(Debug, Clone)]
pub struct PendingSave {
    pub save_id: SaveId,
    pub statute_id: NodeId,
    /// Session revision when the snapshot was taken.
    pub revision: u64,
    pub request: SaveRequest,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveReport {
    pub save_id: SaveId,
    pub assigned: Vec<IdAssignment>,
    pub deleted: usize,
    /// False when edits made while the save was in flight were kept and only
    /// their ids were rewritten.
    pub reloaded: bool,
}

/// One user's editing session over one statute.
///
/// Owns the tree, the selection, the undo log and the deleted-items ledger.
/// Every mutation goes through a method here, which validates first, then
/// changes the tree, then records how to invert the change.
pub struct EditSession {
    id: SessionId,
    statute_id: NodeId,
    tree: Node,
    ledger: DeletedLedger,
    undo: UndoLog,
    ids: TempIds,
    selected: Option<NodeId>,
    dirty: bool,
    revision: u64,
    saving: bool,
    base_name: String,
    clock: Arc<dyn Clock>,
}

fn check_child(parent: NodeType, child: NodeType) -> Result<(), CoreError> {
    if parent.is_leaf() {
        return Err(CoreError::LeafNode(parent));
    }
    if !parent.accepts_child(child) {
        return Err(CoreError::InvalidChildType { parent, child });
    }
    Ok(())
}

fn remap_tree(root: &mut Node, map: &HashMap<NodeId, NodeId>) {
    root.walk_mut(&mut |n| {
        if let Some(assigned) = map.get(&n.id) {
            n.id = *assigned;
        }
    });
}

/// Whether undoing `payload` would bring back a row that is already gone
/// from the store.
fn restores_committed(payload: &OperationPayload, committed: &HashSet<NodeId>) -> bool {
    let OperationPayload::Delete { node, .. } = payload else {
        return false;
    };
    let mut hit = false;
    node.walk(&mut |n| hit |= committed.contains(&n.id));
    hit
}

impl EditSession {
    pub fn new(tree: Node, config: &EditorConfig) -> Result<Self, EngineError> {
        Self::with_clock(tree, config, Arc::new(SystemClock))
    }

    pub fn with_clock(
        tree: Node,
        config: &EditorConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, EngineError> {
        if tree.node_type != NodeType::Statute {
            return Err(CoreError::InvalidData(format!(
                "session root must be a statute, got {}",
                tree.node_type.as_str()
            ))
            .into());
        }
        Ok(Self {
            id: SessionId::new(),
            statute_id: tree.id,
            ids: TempIds::starting_below(tree.lowest_id()),
            tree,
            ledger: DeletedLedger::new(),
            undo: UndoLog::new(config.undo_capacity),
            selected: None,
            dirty: false,
            revision: 0,
            saving: false,
            base_name: config.default_base_name.clone(),
            clock,
        })
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn statute_id(&self) -> NodeId {
        self.statute_id
    }

    pub fn tree(&self) -> &Node {
        &self.tree
    }

    pub fn ledger(&self) -> &DeletedLedger {
        &self.ledger
    }

    pub fn undo_log(&self) -> &UndoLog {
        &self.undo
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn is_saving(&self) -> bool {
        self.saving
    }

    /// Bumped by every mutation and every undo.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        tree::find_by_id(&self.tree, id)
    }

    fn node_ref(&self, id: NodeId) -> Result<&Node, CoreError> {
        tree::find_by_id(&self.tree, id).ok_or(CoreError::NodeNotFound(id))
    }

    /// Parent id and index of a non-root node.
    fn locate(&self, id: NodeId, action: &'static str) -> Result<(NodeId, usize), CoreError> {
        let node = self.node_ref(id)?;
        if node.is_root() {
            return Err(CoreError::RootImmutable(action));
        }
        let parent = tree::find_parent(&self.tree, id).ok_or(CoreError::NodeNotFound(id))?;
        let index = tree::child_index(parent, id).ok_or(CoreError::NodeNotFound(id))?;
        Ok((parent.id, index))
    }

    fn children_of(&mut self, id: NodeId) -> Result<&mut Vec<Node>, CoreError> {
        tree::find_by_id_mut(&mut self.tree, id)
            .map(|n| &mut n.children)
            .ok_or(CoreError::NodeNotFound(id))
    }

    fn now(&self) -> Result<u64, EngineError> {
        Ok(self.clock.now_ms()?)
    }

    fn record(&mut self, payload: OperationPayload, timestamp: u64) {
        debug!(op = payload.op_type_name(), revision = self.revision + 1, "recorded");
        self.undo.push(OperationRecord::new(payload, timestamp));
        self.dirty = true;
        self.revision += 1;
    }

    fn fix_selection(&mut self) {
        if let Some(id) = self.selected {
            if tree::find_by_id(&self.tree, id).is_none() {
                self.selected = None;
            }
        }
    }

    // ----- adding -----

    /// Problems that would stop adding `child_type` under `parent`, worded for the user.
    pub fn validate_add(&self, parent: NodeId, child_type: NodeType) -> Vec<String> {
        let Some(parent) = self.node(parent) else {
            return vec!["No parent node selected.".to_string()];
        };
        let valid = parent.node_type.child_types();
        if valid.is_empty() {
            return vec![format!("{} cannot have child components.", parent.node_type)];
        }
        if !valid.contains(&child_type) {
            let names: Vec<&str> = valid.iter().map(NodeType::label).collect();
            return vec![
                format!("Cannot add {child_type} to {}.", parent.node_type),
                format!("Valid child types are: {}", names.join(", ")),
            ];
        }
        Vec::new()
    }

    pub fn add_child(&mut self, parent: NodeId, child_type: NodeType) -> Result<NodeId, EngineError> {
        check_child(self.node_ref(parent)?.node_type, child_type)?;
        let timestamp = self.now()?;

        let target = tree::find_by_id_mut(&mut self.tree, parent).ok_or(CoreError::NodeNotFound(parent))?;
        let node = naming::fresh_node(&mut self.ids, &self.base_name, &target.children, child_type);
        let id = node.id;
        target.children.push(node);
        let index = target.children.len() - 1;

        self.record(OperationPayload::AddChild { parent, node: id, index }, timestamp);
        self.selected = Some(id);
        Ok(id)
    }

    /// Inserts a node of the same type right after `reference`.
    pub fn add_sibling(&mut self, reference: NodeId) -> Result<NodeId, EngineError> {
        let (parent, index) = self.locate(reference, "add a sibling to")?;
        let node_type = self.node_ref(reference)?.node_type;
        let timestamp = self.now()?;

        let target = tree::find_by_id_mut(&mut self.tree, parent).ok_or(CoreError::NodeNotFound(parent))?;
        let node = naming::fresh_node(&mut self.ids, &self.base_name, &target.children, node_type);
        let id = node.id;
        target.children.insert(index + 1, node);

        self.record(
            OperationPayload::AddSibling {
                parent,
                node: id,
                index: index + 1,
                reference,
            },
            timestamp,
        );
        self.selected = Some(id);
        Ok(id)
    }

    /// Deep copy placed right after the original. Only the copy's own number
    /// is recomputed; descendants keep the numbers they were copied with.
    pub fn duplicate(&mut self, original: NodeId) -> Result<NodeId, EngineError> {
        let (parent, index) = self.locate(original, "duplicate")?;
        let timestamp = self.now()?;

        let source = tree::find_by_id(&self.tree, original).ok_or(CoreError::NodeNotFound(original))?;
        let mut copy = source.copy_with_fresh_ids(&mut self.ids);
        let siblings = &self.node_ref(parent)?.children;
        copy.name = naming::duplicate_name(&source.name, siblings);
        if copy.number_field().is_some() {
            copy.number = Some(naming::next_number(siblings, copy.node_type));
        }
        let id = copy.id;
        self.children_of(parent)?.insert(index + 1, copy);

        self.record(
            OperationPayload::Duplicate {
                parent,
                node: id,
                index: index + 1,
                original,
            },
            timestamp,
        );
        self.selected = Some(id);
        Ok(id)
    }

    /// Expands `specs` in order under `parent`, recorded as one undoable step.
    pub fn add_batch(&mut self, parent: NodeId, specs: &[BatchSpec]) -> Result<Vec<NodeId>, EngineError> {
        let parent_type = self.node_ref(parent)?.node_type;
        for spec in specs {
            check_child(parent_type, spec.node_type)?;
        }
        if specs.is_empty() {
            return Ok(Vec::new());
        }
        let timestamp = self.now()?;

        let target = tree::find_by_id_mut(&mut self.tree, parent).ok_or(CoreError::NodeNotFound(parent))?;
        let mut created = Vec::with_capacity(specs.len());
        for spec in specs {
            let node = spec.instantiate(&mut self.ids, &self.base_name, &target.children);
            created.push(node.id);
            target.children.push(node);
        }

        self.record(
            OperationPayload::BatchAdd {
                parent,
                nodes: created.clone(),
            },
            timestamp,
        );
        Ok(created)
    }

    /// Built-in templates that may be expanded under `parent`.
    pub fn templates_for(&self, parent: NodeId) -> Result<Vec<StructureTemplate>, EngineError> {
        Ok(template::builtin_templates(self.node_ref(parent)?.node_type))
    }

    pub fn add_template(&mut self, parent: NodeId, template_id: &str) -> Result<NodeId, EngineError> {
        let parent_type = self.node_ref(parent)?.node_type;
        if parent_type.is_leaf() {
            return Err(CoreError::LeafNode(parent_type).into());
        }
        let template = template::template_by_id(template_id)
            .ok_or_else(|| CoreError::UnknownTemplate(template_id.to_string()))?;
        check_child(parent_type, template.root.node_type)?;
        let timestamp = self.now()?;

        let target = tree::find_by_id_mut(&mut self.tree, parent).ok_or(CoreError::NodeNotFound(parent))?;
        let node = template
            .root
            .instantiate(&mut self.ids, &self.base_name, &target.children);
        let id = node.id;
        target.children.push(node);

        info!(template = template.id, size = template.root.size(), "template expanded");
        self.record(
            OperationPayload::AddTemplate {
                parent,
                node: id,
                template: template.id.to_string(),
            },
            timestamp,
        );
        self.selected = Some(id);
        Ok(id)
    }

    // ----- removing -----

    pub fn cascade_stats(&self, id: NodeId) -> Result<CascadeStats, EngineError> {
        Ok(CascadeStats::of(self.node_ref(id)?))
    }

    /// Removes the node and its subtree. Persisted nodes in the subtree are
    /// added to the ledger so the next save deletes them.
    pub fn delete(&mut self, id: NodeId) -> Result<CascadeStats, EngineError> {
        let (parent, index) = self.locate(id, "delete")?;
        let stats = CascadeStats::of(self.node_ref(id)?);
        let timestamp = self.now()?;

        let removed = self.children_of(parent)?.remove(index);
        let ledgered = self.ledger.record_subtree(&removed);
        debug!(%id, descendants = stats.descendants, ledgered, "deleted");

        self.record(
            OperationPayload::Delete {
                parent,
                index,
                node: removed,
            },
            timestamp,
        );
        if self.selected.is_some() && self.selected.and_then(|s| self.node(s)).is_none() {
            self.selected = Some(parent);
        }
        Ok(stats)
    }

    // ----- reordering -----

    pub fn move_up(&mut self, id: NodeId) -> Result<bool, EngineError> {
        self.move_sibling(id, MoveDirection::Up)
    }

    pub fn move_down(&mut self, id: NodeId) -> Result<bool, EngineError> {
        self.move_sibling(id, MoveDirection::Down)
    }

    /// Swaps with the adjacent sibling. `Ok(false)` at the boundary.
    fn move_sibling(&mut self, id: NodeId, direction: MoveDirection) -> Result<bool, EngineError> {
        let (parent, from) = self.locate(id, "move")?;
        let len = self.node_ref(parent)?.children.len();
        let to = match direction {
            MoveDirection::Up if from > 0 => from - 1,
            MoveDirection::Down if from + 1 < len => from + 1,
            _ => return Ok(false),
        };
        let timestamp = self.now()?;

        let children = self.children_of(parent)?;
        let previous_markers = [children[from].order_changed, children[to].order_changed];
        children.swap(from, to);
        children[from].order_changed = true;
        children[to].order_changed = true;

        self.record(
            OperationPayload::Move {
                parent,
                direction,
                from,
                to,
                previous_markers,
            },
            timestamp,
        );
        Ok(true)
    }

    /// Whether `dragged` may be dropped onto `target`.
    pub fn can_drop(&self, dragged: NodeId, target: NodeId) -> Result<(), CoreError> {
        let node = self.node_ref(dragged)?;
        let target_node = self.node_ref(target)?;
        if dragged == target {
            return Err(CoreError::InvalidDrop("a node cannot be dropped onto itself"));
        }
        if node.is_root() {
            return Err(CoreError::RootImmutable("reparent"));
        }
        if tree::is_descendant(node, target) {
            return Err(CoreError::InvalidDrop("a node cannot be dropped into its own descendant"));
        }
        if node.node_type.expected_parent() != Some(target_node.node_type) {
            return Err(CoreError::InvalidDrop("the target cannot hold this type"));
        }
        Ok(())
    }

    /// Drag-and-drop: moves `dragged` to the end of `target`'s children.
    pub fn move_to_parent(&mut self, dragged: NodeId, target: NodeId) -> Result<(), EngineError> {
        self.can_drop(dragged, target)?;
        let (old_parent, old_index) = self.locate(dragged, "reparent")?;
        let timestamp = self.now()?;

        let mut node = self.children_of(old_parent)?.remove(old_index);
        let previous_marker = node.order_changed;
        node.order_changed = true;
        let children = self.children_of(target)?;
        children.push(node);
        let new_index = children.len() - 1;

        self.record(
            OperationPayload::MoveToParent {
                node: dragged,
                old_parent,
                old_index,
                new_parent: target,
                new_index,
                previous_marker,
            },
            timestamp,
        );
        Ok(())
    }

    /// Sets every child's number to its 1-based position. Returns how many changed.
    pub fn renumber_children(&mut self, parent: NodeId) -> Result<usize, EngineError> {
        self.node_ref(parent)?;
        let timestamp = self.now()?;

        let mut previous = Vec::new();
        for (index, child) in self.children_of(parent)?.iter_mut().enumerate() {
            if child.number_field().is_none() {
                continue;
            }
            let wanted = (index + 1).to_string();
            if child.number.as_deref() != Some(wanted.as_str()) {
                previous.push((child.id, child.number.replace(wanted)));
            }
        }
        let changed = previous.len();
        if changed > 0 {
            self.record(OperationPayload::Renumber { parent, previous }, timestamp);
        }
        Ok(changed)
    }

    // ----- editing -----

    /// Applies field updates to one node. Returns `Ok(false)` when no value
    /// actually changes; nothing is recorded then.
    pub fn edit(&mut self, id: NodeId, updates: Vec<(NodeField, Option<String>)>) -> Result<bool, EngineError> {
        let node = self.node_ref(id)?;
        // (field, value before, requested value); a repeated field keeps its last value
        let mut entries: Vec<(NodeField, Option<String>, Option<String>)> = Vec::new();
        for (field, value) in updates {
            if !field.applies_to(node.node_type) {
                return Err(CoreError::FieldNotApplicable {
                    field: field.as_str(),
                    node_type: node.node_type,
                }
                .into());
            }
            if field == NodeField::Name && value.as_deref().is_none_or(|v| v.trim().is_empty()) {
                return Err(CoreError::EmptyName.into());
            }
            match entries.iter_mut().find(|(f, _, _)| *f == field) {
                Some(entry) => entry.2 = value,
                None => entries.push((field, node.field(field).map(str::to_string), value)),
            }
        }
        let (original, changed): (Vec<_>, Vec<_>) = entries
            .into_iter()
            .filter(|(_, before, after)| before != after)
            .map(|(field, before, after)| ((field, before), (field, after)))
            .unzip();
        if changed.is_empty() {
            return Ok(false);
        }
        let timestamp = self.now()?;

        let target = tree::find_by_id_mut(&mut self.tree, id).ok_or(CoreError::NodeNotFound(id))?;
        for (field, value) in &changed {
            target.set_field(*field, value.clone())?;
        }
        self.record(
            OperationPayload::Edit {
                node: id,
                original,
                updates: changed,
            },
            timestamp,
        );
        Ok(true)
    }

    pub fn rename(&mut self, id: NodeId, name: &str) -> Result<bool, EngineError> {
        self.edit(id, vec![(NodeField::Name, Some(name.to_string()))])
    }

    // ----- undo -----

    /// Reverts the most recent operation and returns its name, or `None` when
    /// the log is empty. On failure the record goes back on the log.
    pub fn undo(&mut self) -> Result<Option<&'static str>, EngineError> {
        let Some(record) = self.undo.pop() else {
            return Ok(None);
        };
        let operation = record.op_type_name();
        match apply_inverse(&mut self.tree, &mut self.ledger, &record.payload) {
            Ok(()) => {
                debug!(op = operation, "undone");
                self.dirty = true;
                self.revision += 1;
                self.fix_selection();
                Ok(Some(operation))
            }
            Err(reason) => {
                warn!(op = operation, error = %reason, "undo failed, record kept");
                self.undo.push(record);
                Err(EngineError::UndoFailed { operation, reason })
            }
        }
    }

    // ----- selection -----

    pub fn select(&mut self, id: NodeId) -> Result<(), CoreError> {
        self.node_ref(id)?;
        self.selected = Some(id);
        Ok(())
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    pub fn selected(&self) -> Option<&Node> {
        self.selected.and_then(|id| self.node(id))
    }

    /// Ids in the order an expanded tree view lists them.
    pub fn visible_order(&self) -> Vec<NodeId> {
        tree::preorder_ids(&self.tree)
    }

    pub fn select_next(&mut self) -> Option<NodeId> {
        self.step_selection(1)
    }

    pub fn select_previous(&mut self) -> Option<NodeId> {
        self.step_selection(-1)
    }

    fn step_selection(&mut self, step: isize) -> Option<NodeId> {
        let order = self.visible_order();
        let next = match self.selected.and_then(|id| order.iter().position(|o| *o == id)) {
            Some(at) => at.checked_add_signed(step).and_then(|i| order.get(i)).copied(),
            None => order.first().copied(),
        };
        if next.is_some() {
            self.selected = next;
        }
        next
    }

    // ----- inspection -----

    pub fn tree_stats(&self) -> TreeStats {
        TreeStats::of(&self.tree)
    }

    pub fn node_stats(&self, id: NodeId) -> Result<NodeStats, EngineError> {
        Ok(NodeStats::of(self.node_ref(id)?))
    }

    pub fn validate(&self) -> Vec<Violation> {
        validate::validate_for_save(&self.tree)
    }

    // ----- drafts -----

    /// Deep, point-in-time copy of what a draft must hold.
    pub fn snapshot(&self) -> (Node, DeletedLedger) {
        (self.tree.clone(), self.ledger.clone())
    }

    /// Replaces the tree and ledger with a restored draft. The undo log is
    /// cleared because its records describe the replaced tree.
    pub fn restore(&mut self, tree: Node, ledger: DeletedLedger) -> Result<(), EngineError> {
        if tree.id != self.statute_id || tree.node_type != NodeType::Statute {
            return Err(EngineError::Draft(format!(
                "draft root {} does not match statute {}",
                tree.id, self.statute_id
            )));
        }
        self.ids = TempIds::starting_below(tree.lowest_id());
        self.tree = tree;
        self.ledger = ledger;
        self.undo.clear();
        self.dirty = true;
        self.revision += 1;
        self.fix_selection();
        info!(statute_id = %self.statute_id, "draft restored");
        Ok(())
    }

    // ----- saving -----

    /// Validates and snapshots the session for the endpoint. Edits may
    /// continue while the save is in flight; they are not part of it.
    pub fn prepare_save(&mut self) -> Result<PendingSave, EngineError> {
        if self.saving {
            return Err(EngineError::SaveInFlight);
        }
        let violations = validate::validate_for_save(&self.tree);
        if let Some(first) = violations.first() {
            return Err(EngineError::Validation {
                first: first.to_string(),
                count: violations.len(),
            });
        }
        self.saving = true;
        Ok(PendingSave {
            save_id: SaveId::new(),
            statute_id: self.statute_id,
            revision: self.revision,
            request: SaveRequest {
                tree: self.tree.clone(),
                deleted_items: self.ledger.items().to_vec(),
            },
        })
    }

    /// Applies the endpoint's answer to a prepared save. A failed save leaves
    /// the session exactly as it was.
    pub fn finish_save(
        &mut self,
        pending: PendingSave,
        response: Result<SaveResponse, EngineError>,
        endpoint: &mut dyn SaveEndpoint,
    ) -> Result<SaveReport, EngineError> {
        self.saving = false;
        let response = response?;
        if !response.success {
            let message = match (response.error, response.details) {
                (Some(error), Some(details)) => format!("{error} ({details})"),
                (Some(error), None) => error,
                (None, Some(details)) => details,
                (None, None) => "save failed".to_string(),
            };
            warn!(save_id = %pending.save_id, %message, "save rejected");
            return Err(EngineError::SaveRejected(message));
        }

        let map: HashMap<NodeId, NodeId> = response
            .assigned_ids
            .iter()
            .map(|a| (a.temp, a.assigned))
            .collect();
        let committed = &pending.request.deleted_items;

        let reloaded = if self.revision == pending.revision {
            let reloaded = match endpoint.fetch_tree(pending.statute_id) {
                Ok(tree) => {
                    self.tree = tree;
                    true
                }
                Err(err) => {
                    warn!(error = %err, "reload after save failed, keeping local tree");
                    remap_tree(&mut self.tree, &map);
                    self.tree.clear_order_markers();
                    false
                }
            };
            self.ledger.clear();
            self.undo.clear();
            self.dirty = false;
            reloaded
        } else {
            remap_tree(&mut self.tree, &map);
            self.undo.remap_ids(&map);
            self.ledger.remove_committed(committed);
            // A delete this save committed can no longer be undone, and
            // neither can anything recorded before it.
            let gone: HashSet<NodeId> = committed.iter().map(|item| item.id).collect();
            let dropped = self
                .undo
                .discard_through(|record| restores_committed(&record.payload, &gone));
            if dropped > 0 {
                debug!(dropped, "undo history cut at a committed delete");
            }
            // Nodes created by this save but removed locally since the
            // snapshot now exist in the store and must be deleted next time.
            for assignment in &response.assigned_ids {
                if self.node(assignment.assigned).is_none() {
                    self.ledger.push(DeletedItem {
                        id: assignment.assigned,
                        node_type: assignment.node_type,
                    });
                }
            }
            false
        };

        if let Some(assigned) = self.selected.and_then(|id| map.get(&id)) {
            self.selected = Some(*assigned);
        }
        self.fix_selection();

        info!(
            save_id = %pending.save_id,
            assigned = response.assigned_ids.len(),
            deleted = committed.len(),
            reloaded,
            "save finished"
        );
        Ok(SaveReport {
            save_id: pending.save_id,
            deleted: committed.len(),
            assigned: response.assigned_ids,
            reloaded,
        })
    }

    /// Prepare, submit and finish in one call.
    pub fn save(&mut self, endpoint: &mut dyn SaveEndpoint) -> Result<SaveReport, EngineError> {
        let pending = self.prepare_save()?;
        let response = endpoint.submit(pending.statute_id, pending.save_id, &pending.request);
        self.finish_save(pending, response, endpoint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use statute_core::ManualClock;

    fn id(raw: i64) -> NodeId {
        NodeId::new(raw)
    }

    // Act(1) -> Part 1 "General"(2) -> Chapter 1 "Scope"(3)
    //        -> Part 2 "Offences"(4)
    fn session() -> EditSession {
        let tree = Node::new(id(1), NodeType::Statute, "Act")
            .with_child(
                Node::new(id(2), NodeType::Part, "General")
                    .with_number("1")
                    .with_child(Node::new(id(3), NodeType::Chapter, "Scope").with_number("1")),
            )
            .with_child(Node::new(id(4), NodeType::Part, "Offences").with_number("2"));
        EditSession::with_clock(tree, &EditorConfig::default(), Arc::new(ManualClock::new(100))).unwrap()
    }

    fn child_ids(s: &EditSession, parent: i64) -> Vec<i64> {
        s.node(id(parent))
            .unwrap()
            .children
            .iter()
            .map(|c| c.id.get())
            .collect()
    }

    #[test]
    fn root_must_be_statute() {
        let tree = Node::new(id(1), NodeType::Part, "P");
        assert!(EditSession::new(tree, &EditorConfig::default()).is_err());
    }

    #[test]
    fn add_child_numbers_and_selects() {
        let mut s = session();
        let added = s.add_child(id(2), NodeType::Chapter).unwrap();
        assert!(added.is_temporary());
        let node = s.node(added).unwrap();
        assert_eq!(node.number.as_deref(), Some("2"));
        assert_eq!(s.selected().map(|n| n.id), Some(added));
        assert!(s.is_dirty());
        assert_eq!(s.undo_log().peek().map(|r| r.timestamp), Some(100));
    }

    #[test]
    fn add_rejections_leave_no_record() {
        let mut s = session();
        let before = s.tree().clone();
        assert!(matches!(
            s.add_child(id(2), NodeType::SchChapter),
            Err(EngineError::Core(CoreError::InvalidChildType { .. }))
        ));
        assert!(matches!(
            s.add_sibling(id(1)),
            Err(EngineError::Core(CoreError::RootImmutable(_)))
        ));
        assert_eq!(s.tree(), &before);
        assert!(s.undo_log().is_empty());
        assert!(!s.is_dirty());
    }

    #[test]
    fn validate_add_explains_choices() {
        let s = session();
        assert!(s.validate_add(id(2), NodeType::Chapter).is_empty());
        assert_eq!(
            s.validate_add(id(2), NodeType::Section),
            vec![
                "Cannot add Section to Part.".to_string(),
                "Valid child types are: Chapter".to_string(),
            ]
        );
        assert_eq!(s.validate_add(id(99), NodeType::Part), vec!["No parent node selected."]);
    }

    #[test]
    fn sibling_goes_right_after_reference() {
        let mut s = session();
        let added = s.add_sibling(id(2)).unwrap();
        assert_eq!(child_ids(&s, 1), vec![2, added.get(), 4]);
        assert_eq!(s.node(added).unwrap().number.as_deref(), Some("3"));
    }

    #[test]
    fn duplicate_copies_subtree_with_fresh_ids() {
        let mut s = session();
        let copy = s.duplicate(id(2)).unwrap();
        assert_eq!(child_ids(&s, 1), vec![2, copy.get(), 4]);
        let node = s.node(copy).unwrap();
        assert_eq!(node.name, "General (Copy)");
        assert_eq!(node.number.as_deref(), Some("3"));
        assert_eq!(node.children.len(), 1);
        assert!(node.children[0].id.is_temporary());
        assert_eq!(node.children[0].number.as_deref(), Some("1"));

        let again = s.duplicate(id(2)).unwrap();
        assert_eq!(s.node(again).unwrap().name, "General (Copy 2)");
    }

    #[test]
    fn delete_ledgers_subtree_and_reports_cascade() {
        let mut s = session();
        s.select(id(3)).unwrap();
        let stats = s.delete(id(2)).unwrap();
        assert_eq!(stats.descendants, 1);
        assert_eq!(s.ledger().len(), 2);
        assert_eq!(s.selected().map(|n| n.id), Some(id(1)));
        assert!(matches!(
            s.delete(id(1)),
            Err(EngineError::Core(CoreError::RootImmutable(_)))
        ));
    }

    #[test]
    fn boundary_moves_are_no_ops() {
        let mut s = session();
        assert!(!s.move_up(id(2)).unwrap());
        assert!(!s.move_down(id(4)).unwrap());
        assert!(s.undo_log().is_empty());

        assert!(s.move_down(id(2)).unwrap());
        assert_eq!(child_ids(&s, 1), vec![4, 2]);
        assert!(s.node(id(2)).unwrap().order_changed);
        assert!(s.node(id(4)).unwrap().order_changed);
    }

    #[test]
    fn drop_rules() {
        let mut s = session();
        assert_eq!(s.can_drop(id(2), id(2)), Err(CoreError::InvalidDrop("a node cannot be dropped onto itself")));
        assert!(matches!(s.can_drop(id(3), id(1)), Err(CoreError::InvalidDrop(_))));
        assert!(matches!(s.can_drop(id(1), id(2)), Err(CoreError::RootImmutable(_))));
        s.move_to_parent(id(3), id(4)).unwrap();
        assert_eq!(child_ids(&s, 4), vec![3]);
        assert!(s.node(id(3)).unwrap().order_changed);
    }

    #[test]
    fn edit_records_only_real_changes() {
        let mut s = session();
        assert!(!s.edit(id(2), vec![(NodeField::Name, Some("General".into()))]).unwrap());
        assert!(s.undo_log().is_empty());

        assert!(s
            .edit(
                id(2),
                vec![
                    (NodeField::Name, Some("Preliminary".into())),
                    (NodeField::Number, Some("1".into())),
                ]
            )
            .unwrap());
        let Some(OperationRecord {
            payload: OperationPayload::Edit { updates, .. },
            ..
        }) = s.undo_log().peek()
        else {
            panic!("expected an edit record");
        };
        assert_eq!(updates, &vec![(NodeField::Name, Some("Preliminary".to_string()))]);

        assert!(matches!(
            s.edit(id(2), vec![(NodeField::Content, Some("x".into()))]),
            Err(EngineError::Core(CoreError::FieldNotApplicable { .. }))
        ));
        assert!(matches!(s.rename(id(2), "  "), Err(EngineError::Core(CoreError::EmptyName))));
    }

    #[test]
    fn renumber_only_records_when_something_changes() {
        let mut s = session();
        assert_eq!(s.renumber_children(id(1)).unwrap(), 0);
        assert!(s.undo_log().is_empty());
        s.move_down(id(2)).unwrap();
        assert_eq!(s.renumber_children(id(1)).unwrap(), 2);
        s.undo().unwrap();
        assert_eq!(s.node(id(4)).unwrap().number.as_deref(), Some("2"));
    }

    #[test]
    fn batch_and_template_undo_as_one_step() {
        let mut s = session();
        let specs = BatchSpec::series(NodeType::Chapter, "Division", 3, Some(5));
        let created = s.add_batch(id(4), &specs).unwrap();
        assert_eq!(created.len(), 3);
        assert_eq!(s.node(created[2]).unwrap().number.as_deref(), Some("7"));
        assert_eq!(s.undo().unwrap(), Some("batch_add"));
        assert!(child_ids(&s, 4).is_empty());

        let root = s.add_template(id(1), "basic_part").unwrap();
        assert!(!s.node(root).unwrap().children.is_empty());
        assert!(matches!(
            s.add_template(id(1), "nonexistent"),
            Err(EngineError::Core(CoreError::UnknownTemplate(_)))
        ));
        assert_eq!(s.undo().unwrap(), Some("add_template"));
        assert_eq!(child_ids(&s, 1), vec![2, 4]);
    }

    #[test]
    fn navigation_follows_preorder() {
        let mut s = session();
        assert_eq!(s.visible_order(), vec![id(1), id(2), id(3), id(4)]);
        assert_eq!(s.select_next(), Some(id(1)));
        assert_eq!(s.select_next(), Some(id(2)));
        assert_eq!(s.select_previous(), Some(id(1)));
        assert_eq!(s.select_previous(), None);
        assert_eq!(s.selected().map(|n| n.id), Some(id(1)));
    }

    #[test]
    fn second_prepare_is_refused() {
        let mut s = session();
        let pending = s.prepare_save().unwrap();
        assert_eq!(pending.revision, 0);
        assert!(matches!(s.prepare_save(), Err(EngineError::SaveInFlight)));
    }

    #[test]
    fn blank_name_blocks_prepare() {
        let mut s = session();
        s.tree.children[1].name = String::new();
        let err = s.prepare_save().unwrap_err();
        assert!(matches!(err, EngineError::Validation { count: 1, .. }));
        assert!(!s.is_saving());
    }
}
