//! Prompt rendering for text generation calls.

use anyhow::Result;
use minijinja::{Environment, context};

use super::provider::ProjectTemplate;
use crate::tree::FileTree;

const SYSTEM_TEMPLATE: &str = include_str!("prompts/system.md");
const FORMAT_REMINDER_TEMPLATE: &str = include_str!("prompts/format_reminder.md");
const TEMPLATE_CONTEXT_TEMPLATE: &str = include_str!("prompts/template_context.md");
const CLASSIFY_TEMPLATE: &str = include_str!("prompts/classify.md");

/// Extra guidance sent ahead of the first message of a React project.
pub const DESIGN_PROMPT: &str = include_str!("prompts/design.md");
const REACT_BASE_ARTIFACT: &str = include_str!("prompts/react_base.xml");
const NODE_BASE_ARTIFACT: &str = include_str!("prompts/node_base.xml");

/// Files the sandbox creates on its own; the model is told they exist.
const HIDDEN_FILES: &[&str] = &[".gitignore", "package-lock.json"];

/// Starter project for `template`, as model-style artifact text.
pub fn base_artifact(template: ProjectTemplate) -> &'static str {
    match template {
        ProjectTemplate::React => REACT_BASE_ARTIFACT,
        ProjectTemplate::Node => NODE_BASE_ARTIFACT,
    }
}

/// Template engine wrapper around minijinja.
pub struct PromptEngine {
    env: Environment<'static>,
}

impl Default for PromptEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl PromptEngine {
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.add_template("system", SYSTEM_TEMPLATE)
            .expect("system template should be valid");
        env.add_template("format_reminder", FORMAT_REMINDER_TEMPLATE)
            .expect("format reminder template should be valid");
        env.add_template("template_context", TEMPLATE_CONTEXT_TEMPLATE)
            .expect("template context template should be valid");
        env.add_template("classify", CLASSIFY_TEMPLATE)
            .expect("classify template should be valid");
        Self { env }
    }

    /// System instruction for chat calls, listing the files of `tree`.
    pub fn system_prompt(&self, tree: &FileTree) -> Result<String> {
        let template = self.env.get_template("system")?;
        Ok(template.render(context! { files => tree.file_paths() })?)
    }

    /// User message with the artifact format restated after it.
    pub fn format_reminder(&self, message: &str) -> Result<String> {
        let template = self.env.get_template("format_reminder")?;
        Ok(template.render(context! { message => message.trim() })?)
    }

    /// Prompt asking for a one-word `react` / `node` answer.
    pub fn classify(&self, task: &str) -> Result<String> {
        let template = self.env.get_template("classify")?;
        Ok(template.render(context! { task => task.trim() })?)
    }

    /// Prompt presenting the starter project to the model.
    pub fn template_context(&self, template: ProjectTemplate) -> Result<String> {
        let rendered = self.env.get_template("template_context")?;
        Ok(rendered.render(context! {
            artifact => base_artifact(template).trim(),
            hidden_files => HIDDEN_FILES,
        })?)
    }

    /// User turns sent ahead of the task when a session starts.
    pub fn opening_prompts(&self, template: ProjectTemplate) -> Result<Vec<String>> {
        let mut prompts = Vec::new();
        if template == ProjectTemplate::React {
            prompts.push(DESIGN_PROMPT.trim().to_string());
        }
        prompts.push(self.template_context(template)?);
        Ok(prompts)
    }
}
