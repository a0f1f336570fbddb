//! Materialize `CreateFile` steps into the project tree.

use tracing::{debug, warn};

use crate::core::path::{join_absolute, segments};
use crate::core::types::{Step, StepKind};
use crate::tree::{FileTree, FileTreeNode};

/// Result of merging one batch of steps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    /// The new tree. The input tree is left untouched.
    pub tree: FileTree,
    /// Ids of the steps that were applied, in step order.
    pub completed: Vec<u32>,
}

/// How a single file step landed in the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Applied {
    Created,
    Overwritten,
}

/// Apply `steps` to a copy of `tree`.
///
/// Only `CreateFile` steps touch the tree; folders are created on demand from
/// file paths. A later step for the same path overwrites an earlier one. Steps
/// without a path or code, or whose path collides with a node of the other
/// kind, are skipped and left out of `completed`.
pub fn merge(tree: &FileTree, steps: &[Step]) -> MergeOutcome {
    let mut updated = tree.clone();
    let mut completed = Vec::new();

    for step in steps.iter().filter(|step| step.kind == StepKind::CreateFile) {
        let (Some(path), Some(code)) = (step.path.as_deref(), step.code.as_deref()) else {
            warn!(step_id = step.id, "skipping file step without path or code");
            continue;
        };
        match apply_file(&mut updated.nodes, path, code) {
            Ok(applied) => {
                debug!(step_id = step.id, path, ?applied, "applied file step");
                completed.push(step.id);
            }
            Err(reason) => warn!(step_id = step.id, path, %reason, "skipping file step"),
        }
    }

    MergeOutcome {
        tree: updated,
        completed,
    }
}

fn apply_file(roots: &mut Vec<FileTreeNode>, path: &str, code: &str) -> Result<Applied, String> {
    let parts = segments(path);
    let Some((file_name, folders)) = parts.split_last() else {
        return Err("path has no segments".to_string());
    };
    check_conflicts(roots, &parts)?;

    let mut current = roots;
    for (depth, name) in folders.iter().enumerate() {
        let existing = current
            .iter()
            .position(|node| node.is_folder() && node.name == *name);
        let index = match existing {
            Some(index) => index,
            None => {
                let folder_path = join_absolute(&parts[..=depth]);
                current.push(FileTreeNode::folder(name, &folder_path, Vec::new()));
                current.len() - 1
            }
        };
        current = current[index].children.get_or_insert_with(Vec::new);
    }

    if let Some(existing) = current
        .iter_mut()
        .find(|node| node.is_file() && node.name == *file_name)
    {
        existing.content = Some(code.to_string());
        return Ok(Applied::Overwritten);
    }
    current.push(FileTreeNode::file(file_name, &join_absolute(&parts), code));
    Ok(Applied::Created)
}

/// Reject paths that would put a file and a folder at the same path.
///
/// Runs before any folder is created so a rejected step leaves no trace.
fn check_conflicts(roots: &[FileTreeNode], parts: &[&str]) -> Result<(), String> {
    let mut level = roots;
    let last = parts.len() - 1;
    for (depth, name) in parts.iter().enumerate() {
        let folder = level
            .iter()
            .find(|node| node.is_folder() && node.name == *name);
        let file = level
            .iter()
            .find(|node| node.is_file() && node.name == *name);
        let here = || join_absolute(&parts[..=depth]);
        if depth < last {
            match (folder, file) {
                (Some(folder), _) => level = folder.children(),
                (None, Some(_)) => return Err(format!("a file already exists at {}", here())),
                (None, None) => return Ok(()),
            }
        } else if folder.is_some() && file.is_none() {
            return Err(format!("a folder already exists at {}", here()));
        }
    }
    Ok(())
}
