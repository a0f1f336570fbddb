//! Plain-text views of the tree and the step log for terminal output.

use std::fmt::Write as _;

use crate::core::types::{StepKind, StepLog};
use crate::tree::{FileTree, FileTreeNode};

/// Render the tree with folders before files, each group sorted by name.
///
/// Display only: the stored order of children is not changed.
pub fn render_tree(tree: &FileTree) -> String {
    let mut out = String::new();
    render_level(&tree.nodes, 0, &mut out);
    out
}

fn render_level(nodes: &[FileTreeNode], depth: usize, out: &mut String) {
    let mut sorted: Vec<&FileTreeNode> = nodes.iter().collect();
    sorted.sort_by(|a, b| {
        b.is_folder()
            .cmp(&a.is_folder())
            .then_with(|| a.name.cmp(&b.name))
    });
    for node in sorted {
        let indent = "  ".repeat(depth);
        if node.is_folder() {
            let _ = writeln!(out, "{indent}{}/", node.name);
            render_level(node.children(), depth + 1, out);
        } else {
            let _ = writeln!(out, "{indent}{}", node.name);
        }
    }
}

/// Render the step log, one line per step: `round.id [status] title detail`.
pub fn render_steps(log: &StepLog) -> String {
    let mut out = String::new();
    for entry in log.entries() {
        let step = &entry.step;
        let detail = match step.kind {
            StepKind::RunScript => step.description.as_str(),
            StepKind::CreateFile | StepKind::CreateFolder => step.path.as_deref().unwrap_or("-"),
        };
        let _ = writeln!(
            out,
            "{}.{} [{}] {} {}",
            entry.round,
            step.id,
            step.status.as_str(),
            step.title,
            detail
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{file_step, shell_step};

    #[test]
    fn folders_first_then_alphabetical() {
        let tree = FileTree::new(vec![
            FileTreeNode::file("b.txt", "/b.txt", ""),
            FileTreeNode::folder(
                "src",
                "/src",
                vec![
                    FileTreeNode::file("main.ts", "/src/main.ts", ""),
                    FileTreeNode::file("App.ts", "/src/App.ts", ""),
                ],
            ),
            FileTreeNode::file("a.txt", "/a.txt", ""),
            FileTreeNode::folder("docs", "/docs", Vec::new()),
        ]);
        assert_eq!(
            render_tree(&tree),
            "docs/\nsrc/\n  App.ts\n  main.ts\na.txt\nb.txt\n"
        );
    }

    #[test]
    fn steps_show_round_status_and_detail() {
        let mut log = StepLog::default();
        log.append_round(vec![
            file_step(1, "/src/App.tsx", "x"),
            shell_step(2, "npm install\nnpm run dev"),
        ]);
        log.mark_completed(1, &[1]);
        assert_eq!(
            render_steps(&log),
            "1.1 [completed] App.tsx /src/App.tsx\n1.2 [pending] Run Command npm install\n"
        );
    }
}
