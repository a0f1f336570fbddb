//! Markdown fence handling for extracted payloads.

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

const FENCE: &str = "```";

// Fences only count at the start of a line; inline triple backticks in prose
// are text.
static FENCED_BLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*```[^\n`]*\r?\n([\s\S]*?)^[ \t]*```").unwrap()
});

/// Clean a raw payload: trim it, then strip at most one leading fence line
/// and at most one trailing fence.
///
/// Fences in the interior of the payload are left alone.
pub fn clean_payload(raw: &str) -> String {
    let mut content = raw.trim();
    if let Some(rest) = content.strip_prefix(FENCE) {
        content = strip_opening_line(rest);
    }
    if let Some(rest) = content.strip_suffix(FENCE) {
        content = rest;
    }
    content.trim().to_string()
}

/// Drop the whole opening fence line, info string included.
///
/// Without a line break the payload started on the fence line itself, so only
/// the delimiter goes.
fn strip_opening_line(rest: &str) -> &str {
    match rest.split_once('\n') {
        Some((_, remainder)) => remainder,
        None => rest,
    }
}

/// Interior of the first fenced block starting at or after byte `from`.
///
/// Returns the raw interior and the byte range of the whole block.
pub fn next_fenced_block(text: &str, from: usize) -> Option<(&str, Range<usize>)> {
    let caps = FENCED_BLOCK_RE.captures_at(text, from)?;
    let whole = caps.get(0)?;
    let interior = caps.get(1)?;
    Some((interior.as_str(), whole.range()))
}

/// Byte ranges of every line-anchored fenced block, pairing fences left to
/// right.
pub fn fenced_spans(text: &str) -> Vec<Range<usize>> {
    FENCED_BLOCK_RE
        .find_iter(text)
        .map(|m| m.range())
        .collect()
}
