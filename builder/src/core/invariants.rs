//! Structural invariants of a project tree that serde cannot express.

use std::collections::HashSet;

use crate::tree::{FileTree, FileTreeNode};

/// Check tree invariants:
/// - No two nodes share a path
/// - Every path is the parent's path plus `/` plus the node name (`/name` at the root)
/// - Names are non-empty and contain no `/`
/// - Files carry content and no children; folders carry children and no content
pub fn validate_invariants(tree: &FileTree) -> Vec<String> {
    let mut errors = Vec::new();
    let mut seen = HashSet::new();
    for node in &tree.nodes {
        validate_node(node, "", &mut seen, &mut errors);
    }
    errors
}

fn validate_node<'a>(
    node: &'a FileTreeNode,
    parent_path: &str,
    seen: &mut HashSet<&'a str>,
    errors: &mut Vec<String>,
) {
    if !seen.insert(node.path.as_str()) {
        errors.push(format!("duplicate path '{}'", node.path));
    }

    if node.name.is_empty() || node.name.contains('/') {
        errors.push(format!("{}: invalid name '{}'", node.path, node.name));
    }

    let expected = format!("{}/{}", parent_path, node.name);
    if node.path != expected {
        errors.push(format!(
            "{}: path does not match parent, expected '{}'",
            node.path, expected
        ));
    }

    if node.is_file() {
        if node.content.is_none() {
            errors.push(format!("{}: file is missing content", node.path));
        }
        if node.children.is_some() {
            errors.push(format!("{}: file must not have children", node.path));
        }
    } else {
        if node.content.is_some() {
            errors.push(format!("{}: folder must not have content", node.path));
        }
        if node.children.is_none() {
            errors.push(format!("{}: folder is missing children", node.path));
        }
    }

    for child in node.children() {
        validate_node(child, &node.path, seen, errors);
    }
}
