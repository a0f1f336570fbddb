//! Build-step extraction from raw model output.
//!
//! Model output is inconsistent, so two independent passes run over the text
//! and their results are concatenated:
//!
//! - **Pass A**: `<boltAction type=".." filePath="..">body</boltAction>` tags,
//!   optionally wrapped in a `<boltArtifact>` container.
//! - **Pass B**: self-closing markers carrying a `path`/`filePath` attribute,
//!   each paired with the next fenced code block after it.
//!
//! Pass B never yields a second step for a path Pass A (or an earlier Pass-B
//! marker) already produced. Parsing never fails; unrecognized input yields
//! fewer steps, possibly none.

use std::collections::HashSet;
use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::core::fence::{clean_payload, fenced_spans, next_fenced_block};
use crate::core::path::{file_title, normalize};
use crate::core::types::{Step, StepKind, StepStatus};

static CONTAINER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<boltArtifact\b[^>]*>([\s\S]*?)</boltArtifact>").unwrap());

// The last attribute character must not be `/`, so self-closing markers are
// left for Pass B.
static ACTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<boltAction\b([^>]*[^/>])?>([\s\S]*?)</boltAction>").unwrap()
});

static MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[A-Za-z][\w:-]*\b([^>]*?)/>").unwrap());

static ATTR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"([A-Za-z_][\w:-]*)\s*=\s*"([^"]*)""#).unwrap());

const RUN_COMMAND_TITLE: &str = "Run Command";
const RUN_COMMAND_DESCRIPTION: &str = "Execute shell command";

/// A step before numbering.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Candidate {
    kind: StepKind,
    path: Option<String>,
    code: String,
}

/// Parse raw model text into an ordered sequence of pending steps.
///
/// Pass A matches come first in textual order, then the non-duplicate Pass B
/// matches in textual order. Ids are a 1-based counter across both.
pub fn parse(raw: &str) -> Vec<Step> {
    let tagged = extract_tagged_actions(raw);
    let mut seen: HashSet<String> = tagged
        .iter()
        .filter_map(|candidate| candidate.path.as_deref().and_then(normalize))
        .collect();

    let mut candidates = tagged;
    for candidate in extract_marker_blocks(raw) {
        let Some(key) = candidate.path.as_deref().and_then(normalize) else {
            continue;
        };
        if !seen.insert(key) {
            debug!(path = ?candidate.path, "skipping duplicate path marker");
            continue;
        }
        candidates.push(candidate);
    }

    let steps: Vec<Step> = candidates
        .into_iter()
        .zip(1u32..)
        .map(|(candidate, id)| into_step(id, candidate))
        .collect();
    debug!(steps = steps.len(), "parsed build steps");
    steps
}

/// Pass A: tag-enclosed actions inside the (optional) container.
fn extract_tagged_actions(raw: &str) -> Vec<Candidate> {
    let container = CONTAINER_RE
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .map_or(raw, |body| body.as_str());

    let mut candidates = Vec::new();
    for caps in ACTION_RE.captures_iter(container) {
        let attrs = caps.get(1).map_or("", |m| m.as_str());
        let body = caps.get(2).map_or("", |m| m.as_str());
        let Some(action_type) = attribute(attrs, "type") else {
            debug!("skipping action without type");
            continue;
        };
        match action_type {
            "file" | "createFile" | "updateFile" | "tool_code" => {
                let Some(path) = attribute(attrs, "filePath").filter(|p| !p.is_empty()) else {
                    debug!(action_type, "skipping file action without filePath");
                    continue;
                };
                candidates.push(Candidate {
                    kind: StepKind::CreateFile,
                    path: Some(path.to_string()),
                    code: clean_payload(body),
                });
            }
            "shell" => candidates.push(Candidate {
                kind: StepKind::RunScript,
                path: None,
                code: clean_payload(body),
            }),
            other => debug!(action_type = other, "skipping unknown action type"),
        }
    }
    debug!(count = candidates.len(), "tag-enclosed actions");
    candidates
}

/// Pass B: self-closing path markers, each followed by a fenced block.
///
/// Markers inside action bodies or code blocks are payload text (JSX such as
/// `<Route path="/" element={<Home />} />`), not markers.
fn extract_marker_blocks(raw: &str) -> Vec<Candidate> {
    let action_spans: Vec<Range<usize>> = ACTION_RE.find_iter(raw).map(|m| m.range()).collect();
    let masked: Vec<Range<usize>> = action_spans
        .iter()
        .cloned()
        .chain(fenced_spans(raw))
        .collect();
    let mut candidates = Vec::new();
    for caps in MARKER_RE.captures_iter(raw) {
        let Some(marker) = caps.get(0) else {
            continue;
        };
        if masked.iter().any(|span| span.contains(&marker.start())) {
            continue;
        }
        let attrs = caps.get(1).map_or("", |m| m.as_str());
        let Some(path) = attribute(attrs, "path")
            .or_else(|| attribute(attrs, "filePath"))
            .filter(|p| !p.is_empty())
        else {
            continue;
        };
        let Some(interior) = next_free_block(raw, marker.end(), &action_spans) else {
            debug!(path, "path marker without a following code block");
            continue;
        };
        candidates.push(Candidate {
            kind: StepKind::CreateFile,
            path: Some(path.to_string()),
            code: clean_payload(interior),
        });
    }
    debug!(count = candidates.len(), "path markers with code blocks");
    candidates
}

/// Next fenced block after `from` that does not open inside an action body.
fn next_free_block<'a>(
    raw: &'a str,
    from: usize,
    action_spans: &[Range<usize>],
) -> Option<&'a str> {
    let mut from = from;
    while let Some((interior, block)) = next_fenced_block(raw, from) {
        if !action_spans.iter().any(|span| span.contains(&block.start)) {
            return Some(interior);
        }
        from = block.end;
    }
    None
}

fn attribute<'a>(attrs: &'a str, name: &str) -> Option<&'a str> {
    ATTR_RE
        .captures_iter(attrs)
        .find(|caps| caps.get(1).is_some_and(|key| key.as_str() == name))
        .and_then(|caps| caps.get(2))
        .map(|value| value.as_str())
}

fn into_step(id: u32, candidate: Candidate) -> Step {
    match candidate.kind {
        StepKind::RunScript => Step {
            id,
            kind: StepKind::RunScript,
            title: RUN_COMMAND_TITLE.to_string(),
            description: command_description(&candidate.code),
            status: StepStatus::Pending,
            path: None,
            code: Some(candidate.code),
        },
        kind => {
            let path = candidate.path.unwrap_or_default();
            Step {
                id,
                kind,
                title: file_title(&path),
                description: format!("Update {path}"),
                status: StepStatus::Pending,
                path: Some(path),
                code: Some(candidate.code),
            }
        }
    }
}

fn command_description(command: &str) -> String {
    command
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map_or_else(|| RUN_COMMAND_DESCRIPTION.to_string(), str::to_string)
}
