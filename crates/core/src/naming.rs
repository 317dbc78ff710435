//! Default names and sequence numbers for new and duplicated nodes.

use crate::ids::TempIds;
use crate::node::Node;
use crate::taxonomy::NodeType;

pub const DEFAULT_BASE_NAME: &str = "Pseudo";

/// Leading integer of a number string, the way a lenient form field reads it
/// ("12a" is 12, "iv" is nothing).
pub fn leading_number(value: &str) -> Option<i64> {
    let trimmed = value.trim_start();
    let (sign, digits) = match trimmed.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let end = digits
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map_or(digits.len(), |(i, _)| i);
    digits[..end].parse::<i64>().ok().map(|n| sign * n)
}

/// `max(numeric numbers of same-type siblings) + 1`, or 1 when there are none.
pub fn next_number(siblings: &[Node], node_type: NodeType) -> String {
    let max = siblings
        .iter()
        .filter(|s| s.node_type == node_type)
        .filter_map(|s| s.number.as_deref().and_then(leading_number))
        .fold(0, i64::max);
    (max + 1).to_string()
}

/// `"<base>"` for the first node of its type among the siblings, then
/// `"<base> 2"`, `"<base> 3"`, ...
pub fn default_name(base: &str, siblings: &[Node], node_type: NodeType) -> String {
    let base = if node_type == NodeType::Statute { node_type.label() } else { base };
    let same_type = siblings.iter().filter(|s| s.node_type == node_type).count();
    if same_type == 0 {
        base.to_string()
    } else {
        format!("{base} {}", same_type + 1)
    }
}

/// A fresh node of `node_type` named and numbered relative to the siblings it
/// is about to join.
pub fn fresh_node(ids: &mut TempIds, base: &str, siblings: &[Node], node_type: NodeType) -> Node {
    let mut node = Node::new(ids.allocate(), node_type, default_name(base, siblings, node_type));
    if node_type.number_field().is_some() {
        node.number = Some(next_number(siblings, node_type));
    }
    node
}

/// Splits `"<base> (Copy)"` / `"<base> (Copy N)"` into the base and the
/// counter the next copy should start from.
fn split_copy_suffix(name: &str) -> Option<(&str, u64)> {
    if let Some(base) = name.strip_suffix(" (Copy)") {
        return Some((base, 2));
    }
    let inner = name.strip_suffix(')')?;
    let at = inner.rfind(" (Copy ")?;
    let digits = &inner[at + " (Copy ".len()..];
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let n: u64 = digits.parse().ok()?;
    Some((&inner[..at], n + 1))
}

/// Name for a copy of `original` that no sibling already uses.
pub fn duplicate_name(original: &str, siblings: &[Node]) -> String {
    let (base, mut counter) = split_copy_suffix(original).unwrap_or((original, 1));
    let mut name = if counter == 1 {
        format!("{base} (Copy)")
    } else {
        format!("{base} (Copy {counter})")
    };
    while siblings.iter().any(|s| s.name == name) {
        counter += 1;
        name = format!("{base} (Copy {counter})");
    }
    name
}
