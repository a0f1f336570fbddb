//! Session load/save helpers with schema + invariant validation.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use jsonschema::validator_for;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::provider::{ChatMessage, ProjectTemplate};
use crate::core::invariants::validate_invariants;
use crate::core::types::StepLog;
use crate::tree::{FileTree, boilerplate_tree};

/// Persisted state of one builder session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    /// Project template chosen when the session was started, if any.
    #[serde(default)]
    pub template: Option<ProjectTemplate>,
    pub tree: FileTree,
    pub steps: StepLog,
    pub messages: Vec<ChatMessage>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            template: None,
            tree: boilerplate_tree(),
            steps: StepLog::default(),
            messages: Vec::new(),
        }
    }
}

/// Load and validate a session from disk (schema + invariants).
pub fn load_session(schema_path: &Path, session_path: &Path) -> Result<SessionState> {
    let contents = fs::read_to_string(session_path)
        .with_context(|| format!("read session {}", session_path.display()))?;
    let value: Value = serde_json::from_str(&contents)
        .with_context(|| format!("parse session {}", session_path.display()))?;
    validate_schema(schema_path, &value)
        .with_context(|| format!("validate session {}", session_path.display()))?;
    let state: SessionState = serde_json::from_value(value)
        .with_context(|| format!("deserialize session {}", session_path.display()))?;
    validate_state(&state)
        .with_context(|| format!("validate session {}", session_path.display()))?;
    Ok(state)
}

/// Atomically write a session to disk as pretty JSON.
pub fn write_session(session_path: &Path, state: &SessionState) -> Result<()> {
    let mut buf = serde_json::to_string_pretty(state).context("serialize session")?;
    buf.push('\n');
    super::write_atomic(session_path, &buf)
}

fn validate_schema(schema_path: &Path, session: &Value) -> Result<()> {
    let schema_contents = fs::read_to_string(schema_path)
        .with_context(|| format!("read schema {}", schema_path.display()))?;
    let schema_value: Value = serde_json::from_str(&schema_contents)
        .with_context(|| format!("parse schema {}", schema_path.display()))?;
    let compiled =
        validator_for(&schema_value).map_err(|err| anyhow!("invalid schema: {}", err))?;
    if !compiled.is_valid(session) {
        let messages = compiled
            .iter_errors(session)
            .map(|err| err.to_string())
            .collect::<Vec<_>>();
        return Err(anyhow!(
            "session schema validation failed: {}",
            messages.join("; ")
        ));
    }
    Ok(())
}

fn validate_state(state: &SessionState) -> Result<()> {
    let mut errors = validate_invariants(&state.tree);
    errors.extend(state.steps.validate());
    if errors.is_empty() {
        return Ok(());
    }
    Err(anyhow!("session invariants failed: {}", errors.join("; ")))
}
