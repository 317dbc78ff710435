//! Nested structure descriptions that expand into real nodes: the built-in
//! structure templates and the add-several dialog's series.

use crate::ids::TempIds;
use crate::naming::fresh_node;
use crate::node::Node;
use crate::taxonomy::NodeType;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateNode {
    pub node_type: NodeType,
    /// Fixed name; generated like a single add when absent.
    pub name: Option<String>,
    pub children: Vec<TemplateNode>,
}

impl TemplateNode {
    pub fn new(node_type: NodeType) -> Self {
        Self {
            node_type,
            name: None,
            children: Vec::new(),
        }
    }

    pub fn named(node_type: NodeType, name: &str) -> Self {
        Self {
            node_type,
            name: Some(name.to_string()),
            children: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<TemplateNode>) -> Self {
        self.children = children;
        self
    }

    /// Number of nodes this template creates.
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(TemplateNode::size).sum::<usize>()
    }

    /// Expand into a node that is about to join `siblings`. Children are
    /// numbered among the children built before them.
    pub fn instantiate(&self, ids: &mut TempIds, base: &str, siblings: &[Node]) -> Node {
        let mut node = fresh_node(ids, base, siblings, self.node_type);
        if let Some(name) = &self.name {
            node.name = name.clone();
        }
        for child in &self.children {
            let built = child.instantiate(ids, base, &node.children);
            node.children.push(built);
        }
        node
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructureTemplate {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub root: TemplateNode,
}

/// Templates whose root type may be added under `target`.
pub fn builtin_templates(target: NodeType) -> Vec<StructureTemplate> {
    all_templates()
        .into_iter()
        .filter(|t| target.accepts_child(t.root.node_type))
        .collect()
}

pub fn find_template(target: NodeType, id: &str) -> Option<StructureTemplate> {
    builtin_templates(target).into_iter().find(|t| t.id == id)
}

/// Looks a template up regardless of where it would be added.
pub fn template_by_id(id: &str) -> Option<StructureTemplate> {
    all_templates().into_iter().find(|t| t.id == id)
}

fn all_templates() -> Vec<StructureTemplate> {
    use NodeType::*;
    let leaf = TemplateNode::named;
    let branch = |t, name, children| TemplateNode::named(t, name).with_children(children);

    vec![
        StructureTemplate {
            id: "basic_part",
            name: "Basic Part",
            description: "Part with definitions and general provisions",
            root: TemplateNode::new(Part).with_children(vec![
                branch(
                    Chapter,
                    "Definitions",
                    vec![branch(Set, "General", vec![leaf(Section, "Interpretation")])],
                ),
                branch(
                    Chapter,
                    "General Provisions",
                    vec![branch(
                        Set,
                        "Application",
                        vec![leaf(Section, "Scope of Application")],
                    )],
                ),
            ]),
        },
        StructureTemplate {
            id: "schedule_part",
            name: "Schedule Part",
            description: "Schedule with forms and procedures",
            root: TemplateNode::new(SchPart).with_children(vec![
                branch(SchChapter, "Forms", vec![leaf(SchSet, "Application Forms")]),
                branch(SchChapter, "Procedures", vec![leaf(SchSet, "Filing Procedures")]),
            ]),
        },
        StructureTemplate {
            id: "multi_set_chapter",
            name: "Multi-Set Chapter",
            description: "Chapter with multiple thematic sets",
            root: TemplateNode::new(Chapter).with_children(vec![
                branch(
                    Set,
                    "Preliminary Provisions",
                    vec![leaf(Section, "Definitions"), leaf(Section, "Application")],
                ),
                branch(
                    Set,
                    "Main Provisions",
                    vec![leaf(Section, "Powers and Duties"), leaf(Section, "Procedures")],
                ),
                branch(
                    Set,
                    "Final Provisions",
                    vec![leaf(Section, "Penalties"), leaf(Section, "Commencement")],
                ),
            ]),
        },
    ]
}

/// One node requested through the add-several dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchSpec {
    pub node_type: NodeType,
    pub name: Option<String>,
    pub number: Option<String>,
}

impl BatchSpec {
    pub fn new(node_type: NodeType) -> Self {
        Self {
            node_type,
            name: None,
            number: None,
        }
    }

    /// `quantity` specs named `"<base>"` (for one) or `"<base> 1"`, `"<base> 2"`, ...
    /// and numbered from `start_number` when given.
    pub fn series(
        node_type: NodeType,
        base_name: &str,
        quantity: usize,
        start_number: Option<i64>,
    ) -> Vec<BatchSpec> {
        (0..quantity)
            .map(|i| BatchSpec {
                node_type,
                name: Some(if quantity == 1 {
                    base_name.to_string()
                } else {
                    format!("{base_name} {}", i + 1)
                }),
                number: start_number.map(|start| (start + i as i64).to_string()),
            })
            .collect()
    }

    pub fn instantiate(&self, ids: &mut TempIds, base: &str, siblings: &[Node]) -> Node {
        let mut node = fresh_node(ids, base, siblings, self.node_type);
        if let Some(name) = &self.name {
            node.name = name.clone();
        }
        if self.number.is_some() && node.number.is_some() {
            node.number = self.number.clone();
        }
        node
    }
}
