use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use crate::error::CoreError;
use crate::ids::{NodeId, TempIds};
use crate::taxonomy::{NodeType, NumberField};

/// One element of the statute hierarchy.
///
/// Children are ordered; a child's position is its persisted order number
/// (1-based). The number field, content and statute metadata are only
/// populated for the types that carry them.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "WireNode")]
pub struct Node {
    pub id: NodeId,
    pub node_type: NodeType,
    pub name: String,
    pub number: Option<String>,
    pub content: Option<String>,
    pub act_no: Option<String>,
    pub date: Option<String>,
    pub preface: Option<String>,
    /// Set when an operation moved this node among its siblings. Never persisted.
    pub order_changed: bool,
    pub children: Vec<Node>,
}

/// An editable scalar on a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeField {
    Name,
    Number,
    Content,
    ActNo,
    Date,
    Preface,
}

impl NodeField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Number => "number",
            Self::Content => "content",
            Self::ActNo => "act_no",
            Self::Date => "date",
            Self::Preface => "preface",
        }
    }

    pub fn applies_to(&self, node_type: NodeType) -> bool {
        match self {
            Self::Name => true,
            Self::Number => node_type.number_field().is_some(),
            Self::Content => node_type.has_content(),
            Self::ActNo | Self::Date | Self::Preface => node_type == NodeType::Statute,
        }
    }
}

impl Node {
    pub fn new(id: NodeId, node_type: NodeType, name: impl Into<String>) -> Self {
        Self {
            id,
            node_type,
            name: name.into(),
            number: None,
            content: node_type.has_content().then(String::new),
            act_no: None,
            date: None,
            preface: None,
            order_changed: false,
            children: Vec::new(),
        }
    }

    pub fn with_number(mut self, number: impl Into<String>) -> Self {
        self.number = Some(number.into());
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn with_child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    pub fn is_root(&self) -> bool {
        self.node_type == NodeType::Statute
    }

    pub fn number_field(&self) -> Option<NumberField> {
        self.node_type.number_field()
    }

    pub fn field(&self, field: NodeField) -> Option<&str> {
        match field {
            NodeField::Name => Some(self.name.as_str()),
            NodeField::Number => self.number.as_deref(),
            NodeField::Content => self.content.as_deref(),
            NodeField::ActNo => self.act_no.as_deref(),
            NodeField::Date => self.date.as_deref(),
            NodeField::Preface => self.preface.as_deref(),
        }
    }

    /// Writes one field. `None` clears optional fields; the name is never cleared.
    pub fn set_field(&mut self, field: NodeField, value: Option<String>) -> Result<(), CoreError> {
        if !field.applies_to(self.node_type) {
            return Err(CoreError::FieldNotApplicable {
                field: field.as_str(),
                node_type: self.node_type,
            });
        }
        match field {
            NodeField::Name => self.name = value.unwrap_or_default(),
            NodeField::Number => self.number = value,
            NodeField::Content => self.content = value,
            NodeField::ActNo => self.act_no = value,
            NodeField::Date => self.date = value,
            NodeField::Preface => self.preface = value,
        }
        Ok(())
    }

    /// `"<number>. <name>"` when numbered, else the name.
    pub fn display_name(&self) -> String {
        let name = if self.name.is_empty() { "Unnamed" } else { self.name.as_str() };
        match self.number.as_deref() {
            Some(number) if !number.is_empty() => format!("{number}. {name}"),
            _ => name.to_string(),
        }
    }

    pub fn has_text_content(&self) -> bool {
        self.content.as_deref().is_some_and(|c| !c.trim().is_empty())
    }

    /// Recursive copy that gives the copy and every descendant a fresh temporary id.
    pub fn copy_with_fresh_ids(&self, ids: &mut TempIds) -> Node {
        Node {
            id: ids.allocate(),
            node_type: self.node_type,
            name: self.name.clone(),
            number: self.number.clone(),
            content: self.content.clone(),
            act_no: self.act_no.clone(),
            date: self.date.clone(),
            preface: self.preface.clone(),
            order_changed: false,
            children: self
                .children
                .iter()
                .map(|child| child.copy_with_fresh_ids(ids))
                .collect(),
        }
    }

    /// Pre-order visit of this node and all descendants.
    pub fn walk<'a>(&'a self, f: &mut impl FnMut(&'a Node)) {
        f(self);
        for child in &self.children {
            child.walk(f);
        }
    }

    pub fn walk_mut(&mut self, f: &mut impl FnMut(&mut Node)) {
        f(self);
        for child in &mut self.children {
            child.walk_mut(f);
        }
    }

    /// Ids of this node and all descendants that already exist in the store.
    pub fn persisted_ids(&self) -> Vec<(NodeId, NodeType)> {
        let mut out = Vec::new();
        self.walk(&mut |n| {
            if n.id.is_persisted() {
                out.push((n.id, n.node_type));
            }
        });
        out
    }

    pub fn lowest_id(&self) -> NodeId {
        let mut lowest = self.id;
        self.walk(&mut |n| lowest = lowest.min(n.id));
        lowest
    }

    pub fn clear_order_markers(&mut self) {
        self.walk_mut(&mut |n| n.order_changed = false);
    }
}

#[derive(Deserialize)]
struct WireNode {
    id: NodeId,
    #[serde(rename = "type")]
    node_type: NodeType,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    part_no: Option<String>,
    #[serde(default)]
    chapter_no: Option<String>,
    #[serde(default)]
    set_no: Option<String>,
    #[serde(default)]
    section_no: Option<String>,
    #[serde(default)]
    subsection_no: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    act_no: Option<String>,
    #[serde(default)]
    date: Option<String>,
    #[serde(default)]
    preface: Option<String>,
    #[serde(rename = "_orderChanged", default)]
    order_changed: bool,
    #[serde(default)]
    children: Vec<Node>,
}

impl TryFrom<WireNode> for Node {
    type Error = CoreError;

    fn try_from(wire: WireNode) -> Result<Self, Self::Error> {
        let numbers = [
            (NumberField::PartNo, wire.part_no),
            (NumberField::ChapterNo, wire.chapter_no),
            (NumberField::SetNo, wire.set_no),
            (NumberField::SectionNo, wire.section_no),
            (NumberField::SubsectionNo, wire.subsection_no),
        ];
        let own_field = wire.node_type.number_field();
        let mut number = None;
        for (field, value) in numbers {
            if value.is_none() {
                continue;
            }
            if Some(field) != own_field {
                return Err(CoreError::FieldNotApplicable {
                    field: field.column(),
                    node_type: wire.node_type,
                });
            }
            number = value;
        }

        let mut node = Node {
            id: wire.id,
            node_type: wire.node_type,
            name: wire.name.unwrap_or_default(),
            number,
            content: None,
            act_no: None,
            date: None,
            preface: None,
            order_changed: wire.order_changed,
            children: wire.children,
        };
        for (field, value) in [
            (NodeField::Content, wire.content),
            (NodeField::ActNo, wire.act_no),
            (NodeField::Date, wire.date),
            (NodeField::Preface, wire.preface),
        ] {
            if value.is_some() {
                node.set_field(field, value)?;
            }
        }
        Ok(node)
    }
}

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("id", &self.id)?;
        map.serialize_entry("type", &self.node_type)?;
        map.serialize_entry("name", &self.name)?;
        if let (Some(field), Some(number)) = (self.number_field(), &self.number) {
            map.serialize_entry(field.column(), number)?;
        }
        for (key, value) in [
            ("content", &self.content),
            ("act_no", &self.act_no),
            ("date", &self.date),
            ("preface", &self.preface),
        ] {
            if let Some(value) = value {
                map.serialize_entry(key, value)?;
            }
        }
        if self.order_changed {
            map.serialize_entry("_orderChanged", &true)?;
        }
        map.serialize_entry("children", &self.children)?;
        map.end()
    }
}
