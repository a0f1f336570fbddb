//! Editor write-back: replace the content of one existing file.

use crate::core::path::normalize;
use crate::tree::{FileTree, FileTreeNode};

/// Return a copy of `tree` with the file at `path` holding `content`.
///
/// Returns `None` when no file node has that path; folders are never edited.
pub fn update_file_content(tree: &FileTree, path: &str, content: &str) -> Option<FileTree> {
    let target = normalize(path)?;
    let mut updated = tree.clone();
    let node = find_file_mut(&mut updated.nodes, &target)?;
    node.content = Some(content.to_string());
    Some(updated)
}

fn find_file_mut<'a>(nodes: &'a mut [FileTreeNode], path: &str) -> Option<&'a mut FileTreeNode> {
    for node in nodes {
        if node.is_file() {
            if node.path == path {
                return Some(node);
            }
        } else if path.starts_with(&format!("{}/", node.path)) {
            let children = node.children.as_deref_mut()?;
            return find_file_mut(children, path);
        }
    }
    None
}
