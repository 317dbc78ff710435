use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CoreError;

/// The closed set of statute component types.
///
/// Two parallel families hang off the statute root: the plain family
/// (`part` .. `subsection`) and the schedule family (`sch_part` ..
/// `sch_subsection`). The families never cross-link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    Statute,
    Part,
    SchPart,
    Chapter,
    SchChapter,
    Set,
    SchSet,
    Section,
    SchSection,
    Subsection,
    SchSubsection,
}

/// The type-specific numbering column carried by every non-root node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumberField {
    PartNo,
    ChapterNo,
    SetNo,
    SectionNo,
    SubsectionNo,
}

impl NumberField {
    pub fn column(&self) -> &'static str {
        match self {
            Self::PartNo => "part_no",
            Self::ChapterNo => "chapter_no",
            Self::SetNo => "set_no",
            Self::SectionNo => "section_no",
            Self::SubsectionNo => "subsection_no",
        }
    }
}

impl NodeType {
    pub const ALL: [NodeType; 11] = [
        Self::Statute,
        Self::Part,
        Self::SchPart,
        Self::Chapter,
        Self::SchChapter,
        Self::Set,
        Self::SchSet,
        Self::Section,
        Self::SchSection,
        Self::Subsection,
        Self::SchSubsection,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Statute => "statute",
            Self::Part => "part",
            Self::SchPart => "sch_part",
            Self::Chapter => "chapter",
            Self::SchChapter => "sch_chapter",
            Self::Set => "set",
            Self::SchSet => "sch_set",
            Self::Section => "section",
            Self::SchSection => "sch_section",
            Self::Subsection => "subsection",
            Self::SchSubsection => "sch_subsection",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CoreError> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| CoreError::UnknownNodeType(s.to_string()))
    }

    /// Legal child types, in the order they are offered to the user.
    pub fn child_types(&self) -> &'static [NodeType] {
        match self {
            Self::Statute => &[Self::Part, Self::SchPart],
            Self::Part => &[Self::Chapter],
            Self::SchPart => &[Self::SchChapter],
            Self::Chapter => &[Self::Set],
            Self::SchChapter => &[Self::SchSet],
            Self::Set => &[Self::Section],
            Self::SchSet => &[Self::SchSection],
            Self::Section => &[Self::Subsection],
            Self::SchSection => &[Self::SchSubsection],
            Self::Subsection | Self::SchSubsection => &[],
        }
    }

    pub fn accepts_child(&self, child: NodeType) -> bool {
        self.child_types().contains(&child)
    }

    pub fn is_leaf(&self) -> bool {
        self.child_types().is_empty()
    }

    /// The one parent type a node of this type may hang under. `None` for the root.
    pub fn expected_parent(&self) -> Option<NodeType> {
        match self {
            Self::Statute => None,
            Self::Part | Self::SchPart => Some(Self::Statute),
            Self::Chapter => Some(Self::Part),
            Self::SchChapter => Some(Self::SchPart),
            Self::Set => Some(Self::Chapter),
            Self::SchSet => Some(Self::SchChapter),
            Self::Section => Some(Self::Set),
            Self::SchSection => Some(Self::SchSet),
            Self::Subsection => Some(Self::Section),
            Self::SchSubsection => Some(Self::SchSection),
        }
    }

    pub fn number_field(&self) -> Option<NumberField> {
        match self {
            Self::Statute => None,
            Self::Part | Self::SchPart => Some(NumberField::PartNo),
            Self::Chapter | Self::SchChapter => Some(NumberField::ChapterNo),
            Self::Set | Self::SchSet => Some(NumberField::SetNo),
            Self::Section | Self::SchSection => Some(NumberField::SectionNo),
            Self::Subsection | Self::SchSubsection => Some(NumberField::SubsectionNo),
        }
    }

    /// Only subsection-family nodes carry body text.
    pub fn has_content(&self) -> bool {
        matches!(self, Self::Subsection | Self::SchSubsection)
    }

    pub fn is_schedule(&self) -> bool {
        matches!(
            self,
            Self::SchPart | Self::SchChapter | Self::SchSet | Self::SchSection | Self::SchSubsection
        )
    }

    /// Column on this type's table that references the parent row.
    pub fn parent_column(&self) -> Option<&'static str> {
        match self {
            Self::Statute => None,
            Self::Part | Self::SchPart => Some("statute_id"),
            Self::Chapter => Some("part_id"),
            Self::SchChapter => Some("sch_part_id"),
            Self::Set => Some("chapter_id"),
            Self::SchSet => Some("sch_chapter_id"),
            Self::Section => Some("set_id"),
            Self::SchSection => Some("sch_set_id"),
            Self::Subsection => Some("section_id"),
            Self::SchSubsection => Some("sch_section_id"),
        }
    }

    /// Human-readable type name ("Schedule Part").
    pub fn label(&self) -> &'static str {
        match self {
            Self::Statute => "Statute",
            Self::Part => "Part",
            Self::SchPart => "Schedule Part",
            Self::Chapter => "Chapter",
            Self::SchChapter => "Schedule Chapter",
            Self::Set => "Set",
            Self::SchSet => "Schedule Set",
            Self::Section => "Section",
            Self::SchSection => "Schedule Section",
            Self::Subsection => "Subsection",
            Self::SchSubsection => "Schedule Subsection",
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expected_parent_inverts_child_table() {
        for parent in NodeType::ALL {
            for child in parent.child_types() {
                assert_eq!(child.expected_parent(), Some(parent));
            }
        }
        for child in NodeType::ALL {
            if let Some(parent) = child.expected_parent() {
                assert!(parent.accepts_child(child), "{parent:?} should accept {child:?}");
            }
        }
    }

    #[test]
    fn families_never_cross() {
        for parent in NodeType::ALL {
            if parent == NodeType::Statute {
                continue;
            }
            for child in parent.child_types() {
                assert_eq!(parent.is_schedule(), child.is_schedule());
            }
        }
    }

    #[test]
    fn parse_roundtrips_names() {
        for t in NodeType::ALL {
            assert_eq!(NodeType::parse(t.as_str()), Ok(t));
        }
        assert!(NodeType::parse("article").is_err());
    }

    #[test]
    fn leaves_and_labels() {
        assert!(NodeType::Subsection.is_leaf());
        assert!(NodeType::SchSubsection.is_leaf());
        assert!(!NodeType::Section.is_leaf());
        assert_eq!(NodeType::SchPart.label(), "Schedule Part");
        assert_eq!(NodeType::Subsection.to_string(), "Subsection");
    }
}
