//! Convert the project tree into the nested description a sandbox mounts.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::tree::{FileTree, FileTreeNode};

/// Directory listing keyed by entry name.
pub type MountDescription = BTreeMap<String, MountEntry>;

/// One entry of a mount description.
///
/// Serializes as `{"file": {"contents": ".."}}` or
/// `{"directory": {..nested entries..}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MountEntry {
    File(FileContents),
    Directory(MountDescription),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileContents {
    pub contents: String,
}

/// Build the mount description for `tree`.
///
/// Files without content are mounted as empty strings.
pub fn to_mount_description(tree: &FileTree) -> MountDescription {
    describe(&tree.nodes)
}

fn describe(nodes: &[FileTreeNode]) -> MountDescription {
    nodes
        .iter()
        .map(|node| {
            let entry = if node.is_folder() {
                MountEntry::Directory(describe(node.children()))
            } else {
                MountEntry::File(FileContents {
                    contents: node.content.clone().unwrap_or_default(),
                })
            };
            (node.name.clone(), entry)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn single_file_matches_sandbox_shape() {
        let tree = FileTree::new(vec![FileTreeNode::file("a.txt", "/a.txt", "hello")]);
        let value = serde_json::to_value(to_mount_description(&tree)).expect("serialize");
        assert_eq!(value, json!({ "a.txt": { "file": { "contents": "hello" } } }));
    }

    #[test]
    fn nests_folders_and_defaults_missing_content() {
        let mut empty = FileTreeNode::file("empty.ts", "/src/empty.ts", "");
        empty.content = None;
        let tree = FileTree::new(vec![FileTreeNode::folder(
            "src",
            "/src",
            vec![
                FileTreeNode::folder("lib", "/src/lib", Vec::new()),
                empty,
            ],
        )]);
        let value = serde_json::to_value(to_mount_description(&tree)).expect("serialize");
        assert_eq!(
            value,
            json!({
                "src": { "directory": {
                    "lib": { "directory": {} },
                    "empty.ts": { "file": { "contents": "" } }
                } }
            })
        );
    }
}
