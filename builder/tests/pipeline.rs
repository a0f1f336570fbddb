//! Parse → merge → mount pipeline tests over realistic model output.

use builder::core::invariants::validate_invariants;
use builder::core::merge::merge;
use builder::core::mount::to_mount_description;
use builder::core::parser::parse;
use builder::core::types::{StepKind, StepStatus};
use builder::session::{BuilderSession, RoundOutcome};
use builder::tree::{FileTree, FileTreeNode};
use serde_json::json;

#[test]
fn single_action_flows_through_to_mount() {
    let raw = "<boltArtifact><boltAction type=\"file\" filePath=\"/a.txt\">hello</boltAction></boltArtifact>";

    let steps = parse(raw);
    assert_eq!(steps.len(), 1);
    assert_eq!(steps[0].kind, StepKind::CreateFile);
    assert_eq!(steps[0].path.as_deref(), Some("/a.txt"));
    assert_eq!(steps[0].code.as_deref(), Some("hello"));

    let outcome = merge(&FileTree::default(), &steps);
    assert_eq!(
        outcome.tree,
        FileTree::new(vec![FileTreeNode::file("a.txt", "/a.txt", "hello")])
    );

    let mount = serde_json::to_value(to_mount_description(&outcome.tree)).expect("serialize");
    assert_eq!(mount, json!({ "a.txt": { "file": { "contents": "hello" } } }));
}

#[test]
fn mixed_reply_dedups_and_strips_fences() {
    let raw = r#"Here is your app.

<boltArtifact id="app" title="App">
<boltAction type="file" filePath="src/App.tsx">
```tsx
import { Route } from "react-router-dom";
export const App = () => <Route path="/" element={<Home />} />;
```
</boltAction>
<boltAction type="shell">npm install react-router-dom</boltAction>
</boltArtifact>

And the helper:

<file path="src/App.tsx" />
```tsx
// ignored duplicate
```

<file path="src/lib/format.ts" />
```ts
export const format = (n: number) => n.toFixed(2);
```
"#;

    let steps = parse(raw);
    let summary: Vec<(StepKind, Option<&str>)> = steps
        .iter()
        .map(|step| (step.kind, step.path.as_deref()))
        .collect();
    assert_eq!(
        summary,
        vec![
            (StepKind::CreateFile, Some("src/App.tsx")),
            (StepKind::RunScript, None),
            (StepKind::CreateFile, Some("src/lib/format.ts")),
        ]
    );
    assert_eq!(
        steps[0].code.as_deref(),
        Some(
            "import { Route } from \"react-router-dom\";\nexport const App = () => <Route path=\"/\" element={<Home />} />;"
        )
    );
    assert_eq!(
        steps[2].code.as_deref(),
        Some("export const format = (n: number) => n.toFixed(2);")
    );
    let ids: Vec<u32> = steps.iter().map(|step| step.id).collect();
    assert_eq!(ids, vec![1, 2, 3]);

    let outcome = merge(&FileTree::default(), &steps);
    assert_eq!(outcome.completed, vec![1, 3]);
    assert!(validate_invariants(&outcome.tree).is_empty());
    assert_eq!(outcome.tree.file_paths(), vec!["/src/App.tsx", "/src/lib/format.ts"]);
}

#[test]
fn repeated_rounds_keep_tree_valid_and_stable() {
    let reply = r#"<boltArtifact>
<boltAction type="file" filePath="/src/App.tsx">v1</boltAction>
<boltAction type="file" filePath="/src/App.tsx">v2</boltAction>
<boltAction type="file" filePath="src//components/Nav.tsx">nav</boltAction>
</boltArtifact>"#;

    let mut session = BuilderSession::new(());
    let first = session.apply_response(reply);
    assert_eq!(
        first,
        RoundOutcome::Applied {
            round: 1,
            steps: 3,
            files_written: 3,
            still_pending: 0,
        }
    );
    let after_first = session.tree().clone();
    assert_eq!(
        after_first
            .find("/src/App.tsx")
            .and_then(|node| node.content.as_deref()),
        Some("v2")
    );

    let second = session.apply_response(reply);
    assert!(matches!(second, RoundOutcome::Applied { round: 2, .. }));
    assert_eq!(session.tree(), &after_first);
    assert!(validate_invariants(session.tree()).is_empty());
    assert!(
        session
            .steps()
            .entries()
            .iter()
            .all(|entry| entry.step.status == StepStatus::Completed)
    );
}

#[test]
fn malformed_reply_leaves_session_untouched() {
    let mut session = BuilderSession::new(());
    let before = session.state().clone();

    let outcome = session.apply_response("<boltAction filePath=\"/x.ts\">no type</boltAction>");
    assert_eq!(outcome, RoundOutcome::NoSteps);
    assert_eq!(session.state(), &before);
}
