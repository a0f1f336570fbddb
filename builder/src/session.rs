//! Orchestration for one builder session.
//!
//! A [`BuilderSession`] owns the project tree, the step log and the
//! conversation. Every tree change goes through the merger's
//! copy-and-replace protocol; user-facing notices are sent over an explicit
//! channel instead of being printed.

use std::sync::mpsc::Sender;

use anyhow::Result;
use tracing::{debug, info, instrument, warn};

use crate::core::edit::update_file_content;
use crate::core::merge::merge;
use crate::core::mount::{MountDescription, to_mount_description};
use crate::core::parser::parse;
use crate::core::types::{Step, StepLog};
use crate::io::prompt::{PromptEngine, base_artifact};
use crate::io::provider::{ChatMessage, TextGenerator, determine_template};
use crate::io::session_store::SessionState;
use crate::tree::FileTree;

/// Assistant turn recorded when text generation fails.
pub const FAILURE_PLACEHOLDER: &str = "Sorry, I encountered an error. Please try again.";
const NO_FILES_WARNING: &str = "No files found in response. Try rephrasing your request.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A short user-facing message about something the session did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

/// What one round of model output did to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoundOutcome {
    /// Steps were logged under `round` and pending steps were merged.
    Applied {
        round: u32,
        steps: usize,
        files_written: usize,
        still_pending: usize,
    },
    /// The reply held no recognizable steps; nothing changed.
    NoSteps,
    /// Text generation failed; tree and step log are unchanged.
    Failed { reason: String },
}

pub struct BuilderSession<G> {
    generator: G,
    prompts: PromptEngine,
    state: SessionState,
    notices: Option<Sender<Notice>>,
}

impl<G> BuilderSession<G> {
    /// Fresh session holding the boilerplate tree.
    pub fn new(generator: G) -> Self {
        Self::from_state(generator, SessionState::default())
    }

    pub fn from_state(generator: G, state: SessionState) -> Self {
        Self {
            generator,
            prompts: PromptEngine::new(),
            state,
            notices: None,
        }
    }

    /// Deliver notices to `sender`.
    pub fn with_notices(mut self, sender: Sender<Notice>) -> Self {
        self.notices = Some(sender);
        self
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn into_state(self) -> SessionState {
        self.state
    }

    pub fn tree(&self) -> &FileTree {
        &self.state.tree
    }

    pub fn steps(&self) -> &StepLog {
        &self.state.steps
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.state.messages
    }

    /// Parse model output and merge it into the tree.
    ///
    /// With no steps nothing changes and a warning is sent. Otherwise the
    /// steps are logged as a new round and every pending step, oldest round
    /// first, goes through the merger.
    pub fn apply_response(&mut self, text: &str) -> RoundOutcome {
        let steps = parse(text);
        if steps.is_empty() {
            warn!(chars = text.len(), "no steps found in response");
            self.notify(NoticeLevel::Warning, NO_FILES_WARNING.to_string());
            return RoundOutcome::NoSteps;
        }
        let outcome = self.apply_steps(steps);
        if let RoundOutcome::Applied { files_written, .. } = outcome {
            let noun = if files_written == 1 { "file" } else { "files" };
            self.notify(
                NoticeLevel::Success,
                format!("Added {files_written} {noun} to project"),
            );
        }
        outcome
    }

    /// Replace the content of an existing file. Returns `false` (and leaves
    /// the tree alone) when no file has that path.
    pub fn edit_file(&mut self, path: &str, content: &str) -> bool {
        match update_file_content(&self.state.tree, path, content) {
            Some(tree) => {
                self.state.tree = tree;
                true
            }
            None => {
                debug!(path, "edit target not found");
                false
            }
        }
    }

    pub fn mount_description(&self) -> MountDescription {
        to_mount_description(&self.state.tree)
    }

    fn apply_steps(&mut self, steps: Vec<Step>) -> RoundOutcome {
        let count = steps.len();
        let round = self.state.steps.append_round(steps);

        let mut tree = self.state.tree.clone();
        let mut files_written = 0;
        for (pending_round, pending) in self.state.steps.pending_rounds() {
            let outcome = merge(&tree, &pending);
            files_written += self
                .state
                .steps
                .mark_completed(pending_round, &outcome.completed);
            tree = outcome.tree;
        }
        self.state.tree = tree;

        let still_pending = self.state.steps.pending_count();
        info!(round, steps = count, files_written, still_pending, "applied round");
        RoundOutcome::Applied {
            round,
            steps: count,
            files_written,
            still_pending,
        }
    }

    fn fail_round(&self, err: &anyhow::Error) -> RoundOutcome {
        let reason = format!("{err:#}");
        warn!(%reason, "text generation failed");
        self.notify(
            NoticeLevel::Error,
            "Failed to generate files. Please try again.".to_string(),
        );
        RoundOutcome::Failed { reason }
    }

    fn notify(&self, level: NoticeLevel, message: String) {
        if let Some(sender) = &self.notices
            && sender.send(Notice { level, message }).is_err()
        {
            debug!("notice receiver dropped");
        }
    }
}

impl<G: TextGenerator> BuilderSession<G> {
    /// Start a project for `task`.
    ///
    /// Resets to the boilerplate tree, asks the generator for a template,
    /// applies the template's starter files as round 1, then sends the
    /// opening prompts plus the task and applies the reply as round 2.
    /// Template detection failures are errors; a failed chat call is a
    /// [`RoundOutcome::Failed`].
    #[instrument(skip_all)]
    pub fn initialize(&mut self, task: &str) -> Result<RoundOutcome> {
        self.state = SessionState::default();

        let classify_prompt = self.prompts.classify(task)?;
        let template = match determine_template(&self.generator, &classify_prompt) {
            Ok(template) => template,
            Err(err) => {
                self.notify(NoticeLevel::Error, format!("Error initializing project: {err}"));
                return Err(err);
            }
        };
        self.state.template = Some(template);
        self.notify(
            NoticeLevel::Info,
            format!("Using the {} template", template.as_str()),
        );

        let starter = parse(base_artifact(template));
        let starter_outcome = self.apply_steps(starter);
        debug!(?starter_outcome, "applied starter files");

        let mut conversation: Vec<ChatMessage> = self
            .prompts
            .opening_prompts(template)?
            .into_iter()
            .map(ChatMessage::user)
            .collect();
        conversation.push(ChatMessage::user(task));
        let system = self.prompts.system_prompt(&self.state.tree)?;

        match self.generator.generate(&conversation, Some(system.as_str())) {
            Ok(reply) => {
                self.state.messages = vec![ChatMessage::user(task), ChatMessage::assistant(&reply)];
                Ok(self.apply_response(&reply))
            }
            Err(err) => {
                self.state.messages = vec![
                    ChatMessage::user(task),
                    ChatMessage::assistant(FAILURE_PLACEHOLDER),
                ];
                Ok(self.fail_round(&err))
            }
        }
    }

    /// Send a follow-up message and apply the reply.
    ///
    /// The format reminder is appended to the user turn before it is stored.
    /// Errors only come from prompt rendering; generation failures become
    /// [`RoundOutcome::Failed`].
    #[instrument(skip_all, fields(turns = self.state.messages.len()))]
    pub fn send_message(&mut self, message: &str) -> Result<RoundOutcome> {
        let user_turn = self.prompts.format_reminder(message)?;
        self.state.messages.push(ChatMessage::user(user_turn));
        let system = self.prompts.system_prompt(&self.state.tree)?;

        match self.generator.generate(&self.state.messages, Some(system.as_str())) {
            Ok(reply) => {
                self.state.messages.push(ChatMessage::assistant(&reply));
                Ok(self.apply_response(&reply))
            }
            Err(err) => {
                self.state
                    .messages
                    .push(ChatMessage::assistant(FAILURE_PLACEHOLDER));
                Ok(self.fail_round(&err))
            }
        }
    }
}
