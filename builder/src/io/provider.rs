//! Text generation collaborators.
//!
//! The [`TextGenerator`] trait decouples the builder session from the model
//! backends. [`FallbackGenerator`] tries a primary provider and then a
//! secondary one; tests use scripted generators that never touch the network.

use std::env;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use reqwest::blocking::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

use super::config::{AnthropicConfig, GeminiConfig};

/// Longest provider error body kept in an error message.
const ERROR_BODY_LIMIT: usize = 500;

/// Speaker of one conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One conversation turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Project template chosen for a new session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectTemplate {
    React,
    Node,
}

impl ProjectTemplate {
    pub fn as_str(self) -> &'static str {
        match self {
            ProjectTemplate::React => "react",
            ProjectTemplate::Node => "node",
        }
    }

    /// Interpret a one-word classifier answer (`react` / `node`).
    pub fn from_answer(answer: &str) -> Option<Self> {
        match answer.trim().to_lowercase().as_str() {
            "react" => Some(ProjectTemplate::React),
            "node" => Some(ProjectTemplate::Node),
            _ => None,
        }
    }
}

/// Failures of the text generation boundary that callers branch on.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("both text generation providers are unavailable")]
    Unavailable { primary: String, secondary: String },
    #[error("conversation is empty")]
    EmptyConversation,
    #[error("{provider} API key is not set (expected in ${env_var})")]
    MissingApiKey {
        provider: &'static str,
        env_var: String,
    },
    #[error("could not determine project type (model answered '{0}')")]
    UnknownTemplate(String),
}

/// Anything that turns a conversation into one reply.
pub trait TextGenerator {
    /// Generate the next assistant reply for `conversation`.
    fn generate(&self, conversation: &[ChatMessage], system: Option<&str>) -> Result<String>;
}

impl<T: TextGenerator + ?Sized> TextGenerator for &T {
    fn generate(&self, conversation: &[ChatMessage], system: Option<&str>) -> Result<String> {
        (**self).generate(conversation, system)
    }
}

/// Tries `primary`, then `secondary`; fails with
/// [`GenerationError::Unavailable`] when both fail.
pub struct FallbackGenerator<P, S> {
    primary: P,
    secondary: S,
}

impl<P: TextGenerator, S: TextGenerator> FallbackGenerator<P, S> {
    pub fn new(primary: P, secondary: S) -> Self {
        Self { primary, secondary }
    }
}

impl<P: TextGenerator, S: TextGenerator> TextGenerator for FallbackGenerator<P, S> {
    #[instrument(skip_all, fields(turns = conversation.len()))]
    fn generate(&self, conversation: &[ChatMessage], system: Option<&str>) -> Result<String> {
        if conversation.is_empty() {
            return Err(GenerationError::EmptyConversation.into());
        }
        let primary_err = match self.primary.generate(conversation, system) {
            Ok(text) => return Ok(text),
            Err(err) => err,
        };
        warn!(error = %format!("{primary_err:#}"), "primary provider failed, falling back");

        match self.secondary.generate(conversation, system) {
            Ok(text) => Ok(text),
            Err(secondary_err) => {
                error!(error = %format!("{secondary_err:#}"), "secondary provider failed");
                Err(GenerationError::Unavailable {
                    primary: format!("{primary_err:#}"),
                    secondary: format!("{secondary_err:#}"),
                }
                .into())
            }
        }
    }
}

/// Ask `generator` which project template fits the rendered classifier prompt.
#[instrument(skip_all)]
pub fn determine_template(
    generator: &dyn TextGenerator,
    classify_prompt: &str,
) -> Result<ProjectTemplate> {
    let answer = generator
        .generate(&[ChatMessage::user(classify_prompt)], None)
        .context("determine project template")?;
    let template = ProjectTemplate::from_answer(&answer)
        .ok_or_else(|| GenerationError::UnknownTemplate(answer.trim().to_string()))?;
    info!(template = template.as_str(), "determined project template");
    Ok(template)
}

fn http_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .context("build http client")
}

fn read_api_key(provider: &'static str, env_var: &str) -> Result<String> {
    match env::var(env_var) {
        Ok(key) if !key.trim().is_empty() => Ok(key),
        _ => Err(GenerationError::MissingApiKey {
            provider,
            env_var: env_var.to_string(),
        }
        .into()),
    }
}

fn truncate_body(body: &str) -> &str {
    match body.char_indices().nth(ERROR_BODY_LIMIT) {
        Some((index, _)) => &body[..index],
        None => body,
    }
}

fn send_json(provider: &str, request: RequestBuilder, body: &Value) -> Result<Value> {
    let response = request
        .json(body)
        .send()
        .with_context(|| format!("send {provider} request"))?;
    let status = response.status();
    let text = response
        .text()
        .with_context(|| format!("read {provider} response"))?;
    if !status.is_success() {
        return Err(anyhow!(
            "{provider} request failed with status {status}: {}",
            truncate_body(&text)
        ));
    }
    serde_json::from_str(&text).with_context(|| format!("decode {provider} response"))
}

/// Google Gemini `generateContent` client.
pub struct GeminiClient {
    config: GeminiConfig,
    http: Client,
}

impl GeminiClient {
    pub fn new(config: &GeminiConfig, timeout: Duration) -> Result<Self> {
        Ok(Self {
            config: config.clone(),
            http: http_client(timeout)?,
        })
    }

    fn request_body(&self, conversation: &[ChatMessage], system: Option<&str>) -> Value {
        let contents: Vec<Value> = conversation
            .iter()
            .map(|message| {
                let role = match message.role {
                    Role::User => "user",
                    Role::Assistant => "model",
                };
                json!({ "role": role, "parts": [{ "text": message.content }] })
            })
            .collect();
        let mut body = json!({
            "contents": contents,
            "generationConfig": {
                "maxOutputTokens": self.config.max_output_tokens,
                "temperature": self.config.temperature,
            },
        });
        if let Some(system) = system {
            body["systemInstruction"] = json!({ "parts": [{ "text": system }] });
        }
        body
    }
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Deserialize)]
struct GeminiPart {
    text: Option<String>,
}

fn gemini_text(response: Value) -> Result<String> {
    let parsed: GeminiResponse =
        serde_json::from_value(response).context("unexpected gemini response shape")?;
    let text: String = parsed
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| content.parts.into_iter().filter_map(|part| part.text).collect())
        .unwrap_or_default();
    if text.is_empty() {
        return Err(anyhow!("gemini response contained no text"));
    }
    Ok(text)
}

impl TextGenerator for GeminiClient {
    #[instrument(skip_all, fields(model = %self.config.model, turns = conversation.len()))]
    fn generate(&self, conversation: &[ChatMessage], system: Option<&str>) -> Result<String> {
        if conversation.is_empty() {
            return Err(GenerationError::EmptyConversation.into());
        }
        let api_key = read_api_key("gemini", &self.config.api_key_env)?;
        let url = format!(
            "{}/{}:generateContent",
            self.config.endpoint.trim_end_matches('/'),
            self.config.model
        );
        let request = self.http.post(url).header("x-goog-api-key", api_key);
        let response = send_json("gemini", request, &self.request_body(conversation, system))?;
        let text = gemini_text(response)?;
        debug!(chars = text.len(), "gemini replied");
        Ok(text)
    }
}

/// Anthropic Messages API client.
pub struct AnthropicClient {
    config: AnthropicConfig,
    http: Client,
}

impl AnthropicClient {
    pub fn new(config: &AnthropicConfig, timeout: Duration) -> Result<Self> {
        Ok(Self {
            config: config.clone(),
            http: http_client(timeout)?,
        })
    }

    fn request_body(&self, conversation: &[ChatMessage], system: Option<&str>) -> Value {
        let mut body = json!({
            "model": self.config.model,
            "max_tokens": self.config.max_tokens,
            "messages": conversation,
        });
        if let Some(system) = system {
            body["system"] = json!(system);
        }
        body
    }
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    #[serde(default)]
    content: Vec<AnthropicBlock>,
}

#[derive(Debug, Deserialize)]
struct AnthropicBlock {
    #[serde(rename = "type")]
    kind: String,
    text: Option<String>,
}

fn anthropic_text(response: Value) -> Result<String> {
    let parsed: AnthropicResponse =
        serde_json::from_value(response).context("unexpected anthropic response shape")?;
    let text: String = parsed
        .content
        .into_iter()
        .filter(|block| block.kind == "text")
        .filter_map(|block| block.text)
        .collect();
    if text.is_empty() {
        return Err(anyhow!("anthropic response contained no text"));
    }
    Ok(text)
}

impl TextGenerator for AnthropicClient {
    #[instrument(skip_all, fields(model = %self.config.model, turns = conversation.len()))]
    fn generate(&self, conversation: &[ChatMessage], system: Option<&str>) -> Result<String> {
        if conversation.is_empty() {
            return Err(GenerationError::EmptyConversation.into());
        }
        let api_key = read_api_key("anthropic", &self.config.api_key_env)?;
        let request = self
            .http
            .post(&self.config.endpoint)
            .header("x-api-key", api_key)
            .header("anthropic-version", &self.config.api_version);
        let response = send_json("anthropic", request, &self.request_body(conversation, system))?;
        let text = anthropic_text(response)?;
        debug!(chars = text.len(), "anthropic replied");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedGenerator;

    const UNSET_KEY: &str = "BUILDER_TEST_KEY_THAT_IS_NEVER_SET";

    fn conversation() -> Vec<ChatMessage> {
        vec![
            ChatMessage::user("build a todo app"),
            ChatMessage::assistant("<boltArtifact></boltArtifact>"),
            ChatMessage::user("add dark mode"),
        ]
    }

    #[test]
    fn fallback_prefers_primary() {
        let primary = ScriptedGenerator::new(vec![Ok("from primary".to_string())]);
        let secondary = ScriptedGenerator::new(vec![Ok("from secondary".to_string())]);
        let generator = FallbackGenerator::new(&primary, &secondary);

        let text = generator.generate(&conversation(), Some("sys")).expect("generate");
        assert_eq!(text, "from primary");
        assert!(secondary.calls().is_empty());
        assert_eq!(primary.calls()[0].system.as_deref(), Some("sys"));
    }

    #[test]
    fn fallback_uses_secondary_when_primary_fails() {
        let primary = ScriptedGenerator::failing("quota exceeded", 1);
        let secondary = ScriptedGenerator::new(vec![Ok("from secondary".to_string())]);
        let generator = FallbackGenerator::new(&primary, &secondary);

        let text = generator.generate(&conversation(), None).expect("generate");
        assert_eq!(text, "from secondary");
        assert_eq!(secondary.calls()[0].conversation, conversation());
    }

    #[test]
    fn fallback_reports_unavailable_when_both_fail() {
        let primary = ScriptedGenerator::failing("quota exceeded", 1);
        let secondary = ScriptedGenerator::failing("overloaded", 1);
        let generator = FallbackGenerator::new(&primary, &secondary);

        let err = generator.generate(&conversation(), None).expect_err("both fail");
        assert_eq!(err.to_string(), "both text generation providers are unavailable");
        match err.downcast_ref::<GenerationError>() {
            Some(GenerationError::Unavailable { primary, secondary }) => {
                assert_eq!(primary, "quota exceeded");
                assert_eq!(secondary, "overloaded");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn empty_conversation_is_rejected_up_front() {
        let primary = ScriptedGenerator::new(vec![Ok("x".to_string())]);
        let secondary = ScriptedGenerator::new(vec![Ok("y".to_string())]);
        let generator = FallbackGenerator::new(&primary, &secondary);
        let err = generator.generate(&[], None).expect_err("empty");
        assert!(matches!(
            err.downcast_ref::<GenerationError>(),
            Some(GenerationError::EmptyConversation)
        ));
        assert!(primary.calls().is_empty());
    }

    #[test]
    fn missing_api_keys_fall_through_without_network() {
        let gemini = GeminiClient::new(
            &GeminiConfig {
                api_key_env: UNSET_KEY.to_string(),
                ..GeminiConfig::default()
            },
            Duration::from_secs(1),
        )
        .expect("gemini client");
        let anthropic = AnthropicClient::new(
            &AnthropicConfig {
                api_key_env: UNSET_KEY.to_string(),
                ..AnthropicConfig::default()
            },
            Duration::from_secs(1),
        )
        .expect("anthropic client");

        let err = FallbackGenerator::new(gemini, anthropic)
            .generate(&conversation(), None)
            .expect_err("no keys");
        match err.downcast_ref::<GenerationError>() {
            Some(GenerationError::Unavailable { primary, .. }) => {
                assert!(primary.contains(UNSET_KEY), "{primary}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn gemini_body_maps_roles_and_system_instruction() {
        let client =
            GeminiClient::new(&GeminiConfig::default(), Duration::from_secs(1)).expect("client");
        let body = client.request_body(&conversation(), Some("be terse"));
        assert_eq!(body["contents"][1]["role"], "model");
        assert_eq!(body["contents"][2]["parts"][0]["text"], "add dark mode");
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "be terse");
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 8000);
    }

    #[test]
    fn anthropic_body_omits_missing_system() {
        let client = AnthropicClient::new(&AnthropicConfig::default(), Duration::from_secs(1))
            .expect("client");
        let body = client.request_body(&conversation(), None);
        assert!(body.get("system").is_none());
        assert_eq!(body["messages"][1]["role"], "assistant");
        assert_eq!(body["max_tokens"], 8000);
    }

    #[test]
    fn extracts_reply_text() {
        let gemini = json!({
            "candidates": [{ "content": { "parts": [{ "text": "hello " }, { "text": "world" }] } }]
        });
        assert_eq!(gemini_text(gemini).expect("gemini"), "hello world");
        assert!(gemini_text(json!({ "candidates": [] })).is_err());

        let anthropic = json!({
            "content": [
                { "type": "tool_use", "id": "x" },
                { "type": "text", "text": "hi" }
            ]
        });
        assert_eq!(anthropic_text(anthropic).expect("anthropic"), "hi");
    }

    #[test]
    fn determines_template_from_one_word_answer() {
        let generator = ScriptedGenerator::new(vec![Ok("  React\n".to_string())]);
        let template = determine_template(&generator, "a landing page").expect("template");
        assert_eq!(template, ProjectTemplate::React);
        assert_eq!(generator.calls()[0].conversation[0].content, "a landing page");
        assert!(generator.calls()[0].system.is_none());
    }

    #[test]
    fn unknown_template_answer_is_an_error() {
        let generator = ScriptedGenerator::new(vec![Ok("python".to_string())]);
        let err = determine_template(&generator, "a script").expect_err("unknown");
        assert!(err.to_string().contains("could not determine project type"));
    }
}
