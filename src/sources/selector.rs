// src/sources/selector.rs
//! Structural description of a clicked element

use crate::host::environment::ElementNode;

/// Ancestors considered when no stable identifier is found sooner.
const MAX_SELECTOR_DEPTH: usize = 5;

/// Classes included per node.
const MAX_SELECTOR_CLASSES: usize = 3;

/// Cap on captured visible text.
const MAX_TEXT_CHARS: usize = 200;

/// Build a best-effort structural selector from an ancestor chain (target
/// first). Walks at most five nodes outward and stops early at the first
/// one bearing an id, which anchors the selector.
pub fn build_selector(path: &[ElementNode]) -> String {
    let mut parts: Vec<String> = Vec::new();

    for node in path.iter().take(MAX_SELECTOR_DEPTH) {
        let mut part = node.tag.to_ascii_lowercase();

        if let Some(id) = node.id.as_deref().filter(|id| !id.is_empty()) {
            parts.push(format!("{}#{}", part, id));
            break;
        }

        let classes: Vec<&str> = node
            .classes
            .iter()
            .map(String::as_str)
            .filter(|class| !class.is_empty())
            .take(MAX_SELECTOR_CLASSES)
            .collect();
        if !classes.is_empty() {
            part.push('.');
            part.push_str(&classes.join("."));
        }
        parts.push(part);
    }

    parts.reverse();
    parts.join(" > ")
}

/// Nearest enclosing link target, walking from the target outward.
pub fn nearest_link_target(path: &[ElementNode]) -> Option<String> {
    path.iter().find_map(|node| {
        node.link_target
            .as_deref()
            .filter(|target| !target.is_empty())
            .map(str::to_string)
    })
}

/// Trimmed visible text of the target, capped at 200 characters.
pub fn visible_text(node: &ElementNode) -> String {
    node.text
        .as_deref()
        .unwrap_or("")
        .trim()
        .chars()
        .take(MAX_TEXT_CHARS)
        .collect()
}
