use std::sync::Arc;

use tempfile::TempDir;

use statute_core::{ManualClock, Node, NodeId, NodeType, SaveId, SaveRequest};
use statute_engine::{EditSession, EditorConfig, EngineError, LocalEndpoint, SaveReport};
use statute_storage::{NewStatute, SaveOptions, SqliteStorage, StatuteStore, StorageError};

/// The statute every fixture starts from, with temporary ids:
///
/// ```text
/// Roads Act
/// ├── Part 1 General
/// │   └── Chapter 1 Preliminary
/// │       └── Set 1 Definitions
/// │           ├── Section 1 Interpretation
/// │           │   ├── Subsection 1 (content)
/// │           │   └── Subsection 2
/// │           └── Section 2 Application
/// ├── Part 2 Offences
/// └── Schedule Part 1 Forms
/// ```
pub fn seed_tree(statute: NodeId) -> Node {
    let temp = |raw: i64| NodeId::new(-raw);
    Node::new(statute, NodeType::Statute, "Roads Act")
        .with_child(
            Node::new(temp(1), NodeType::Part, "General")
                .with_number("1")
                .with_child(
                    Node::new(temp(2), NodeType::Chapter, "Preliminary")
                        .with_number("1")
                        .with_child(
                            Node::new(temp(3), NodeType::Set, "Definitions")
                                .with_number("1")
                                .with_child(
                                    Node::new(temp(4), NodeType::Section, "Interpretation")
                                        .with_number("1")
                                        .with_child(
                                            Node::new(temp(5), NodeType::Subsection, "Meaning of road")
                                                .with_number("1")
                                                .with_content("In this Act, road includes any highway."),
                                        )
                                        .with_child(
                                            Node::new(temp(6), NodeType::Subsection, "Meaning of vehicle")
                                                .with_number("2"),
                                        ),
                                )
                                .with_child(
                                    Node::new(temp(7), NodeType::Section, "Application").with_number("2"),
                                ),
                        ),
                ),
        )
        .with_child(Node::new(temp(8), NodeType::Part, "Offences").with_number("2"))
        .with_child(Node::new(temp(9), NodeType::SchPart, "Forms").with_number("1"))
}

/// One editing session wired to an in-memory store that already holds the
/// seeded statute.
pub struct TestEditor {
    pub session: EditSession,
    pub endpoint: LocalEndpoint,
    pub clock: Arc<ManualClock>,
    pub config: EditorConfig,
}

impl TestEditor {
    pub fn new() -> Result<Self, Box<dyn std::error::Error>> {
        Self::with_config(EditorConfig::default())
    }

    pub fn with_config(config: EditorConfig) -> Result<Self, Box<dyn std::error::Error>> {
        Self::seeded(SqliteStorage::open_in_memory()?, config)
    }

    /// Same fixture backed by a database file in a scratch directory. The
    /// directory is removed when the returned guard drops.
    pub fn on_disk() -> Result<(Self, TempDir), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("statutes.db");
        let storage = SqliteStorage::open(&path.to_string_lossy())?;
        Ok((Self::seeded(storage, EditorConfig::default())?, dir))
    }

    fn seeded(mut storage: SqliteStorage, config: EditorConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let statute = storage.create_statute(&NewStatute {
            name: "Roads Act".into(),
            act_no: Some("12 of 2024".into()),
            ..NewStatute::default()
        })?;
        let request = SaveRequest {
            tree: seed_tree(statute.id),
            deleted_items: Vec::new(),
        };
        storage.save_tree(statute.id, &request, &SaveOptions::new(SaveId::new()))?;
        let tree = storage.load_tree(statute.id)?;

        let clock = Arc::new(ManualClock::new(1_000));
        let session = EditSession::with_clock(tree, &config, clock.clone())?;
        Ok(Self {
            session,
            endpoint: LocalEndpoint::new(storage, config.temp_order_offset),
            clock,
            config,
        })
    }

    pub fn statute_id(&self) -> NodeId {
        self.session.statute_id()
    }

    /// Id of the first node, in tree order, named `name`.
    pub fn id(&self, name: &str) -> Result<NodeId, String> {
        let mut found = None;
        self.session.tree().walk(&mut |n| {
            if found.is_none() && n.name == name {
                found = Some(n.id);
            }
        });
        found.ok_or_else(|| format!("no node named {name:?}"))
    }

    /// Names of a node's children, in order.
    pub fn child_names(&self, parent: NodeId) -> Vec<String> {
        self.session
            .node(parent)
            .map(|n| n.children.iter().map(|c| c.name.clone()).collect())
            .unwrap_or_default()
    }

    pub fn save(&mut self) -> Result<SaveReport, EngineError> {
        self.session.save(&mut self.endpoint)
    }

    pub fn storage(&self) -> &SqliteStorage {
        self.endpoint.storage()
    }

    pub fn storage_mut(&mut self) -> &mut SqliteStorage {
        self.endpoint.storage_mut()
    }

    pub fn stored_tree(&self) -> Result<Node, StorageError> {
        self.storage().load_tree(self.statute_id())
    }

    /// A fresh session over what is currently stored, as if the editor
    /// were reopened.
    pub fn reopen(&self) -> Result<EditSession, EngineError> {
        EditSession::with_clock(self.stored_tree()?, &self.config, self.clock.clone())
    }
}
