//! Test-only helpers for constructing steps, trees and scripted generators.

use std::cell::RefCell;
use std::collections::VecDeque;

use anyhow::{Result, anyhow};
use tempfile::TempDir;

use crate::core::path::file_title;
use crate::core::types::{Step, StepKind, StepStatus};
use crate::io::paths::{BuilderPaths, InitOptions, init_builder};
use crate::io::provider::{ChatMessage, TextGenerator};

/// A pending `CreateFile` step.
pub fn file_step(id: u32, path: &str, code: &str) -> Step {
    Step {
        id,
        kind: StepKind::CreateFile,
        title: file_title(path),
        description: format!("Update {path}"),
        status: StepStatus::Pending,
        path: Some(path.to_string()),
        code: Some(code.to_string()),
    }
}

/// A pending `CreateFolder` step (informational only).
pub fn folder_step(id: u32, path: &str) -> Step {
    Step {
        id,
        kind: StepKind::CreateFolder,
        title: file_title(path),
        description: format!("Create {path}"),
        status: StepStatus::Pending,
        path: Some(path.to_string()),
        code: None,
    }
}

/// A pending `RunScript` step.
pub fn shell_step(id: u32, command: &str) -> Step {
    let first_line = command
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("Execute shell command");
    Step {
        id,
        kind: StepKind::RunScript,
        title: "Run Command".to_string(),
        description: first_line.to_string(),
        status: StepStatus::Pending,
        path: None,
        code: Some(command.to_string()),
    }
}

/// Model text wrapping one file action per `(path, content)` pair.
pub fn artifact(files: &[(&str, &str)]) -> String {
    let mut text = String::from("<boltArtifact id=\"project\" title=\"Project\">\n");
    for (path, content) in files {
        text.push_str(&format!(
            "<boltAction type=\"file\" filePath=\"{path}\">{content}</boltAction>\n"
        ));
    }
    text.push_str("</boltArtifact>");
    text
}

/// A temporary project root with `.builder/` scaffolding in place.
pub fn initialized_root() -> (TempDir, BuilderPaths) {
    let temp = tempfile::tempdir().expect("tempdir");
    let paths = init_builder(temp.path(), &InitOptions { force: false }).expect("init builder");
    (temp, paths)
}

/// One recorded call to a [`ScriptedGenerator`].
#[derive(Debug, Clone)]
pub struct GenerateCall {
    pub conversation: Vec<ChatMessage>,
    pub system: Option<String>,
}

/// Generator that replays scripted replies in order and records every call.
///
/// `Err` entries fail the call with that message. Running out of replies is
/// also an error.
#[derive(Debug, Default)]
pub struct ScriptedGenerator {
    replies: RefCell<VecDeque<Result<String, String>>>,
    calls: RefCell<Vec<GenerateCall>>,
}

impl ScriptedGenerator {
    pub fn new(replies: Vec<Result<String, String>>) -> Self {
        Self {
            replies: RefCell::new(replies.into()),
            calls: RefCell::new(Vec::new()),
        }
    }

    /// Generator that answers every call with the same failure.
    pub fn failing(message: &str, times: usize) -> Self {
        Self::new(vec![Err(message.to_string()); times])
    }

    pub fn calls(&self) -> Vec<GenerateCall> {
        self.calls.borrow().clone()
    }
}

impl TextGenerator for ScriptedGenerator {
    fn generate(&self, conversation: &[ChatMessage], system: Option<&str>) -> Result<String> {
        self.calls.borrow_mut().push(GenerateCall {
            conversation: conversation.to_vec(),
            system: system.map(str::to_string),
        });
        match self.replies.borrow_mut().pop_front() {
            Some(Ok(text)) => Ok(text),
            Some(Err(message)) => Err(anyhow!(message)),
            None => Err(anyhow!("scripted generator has no replies left")),
        }
    }
}
