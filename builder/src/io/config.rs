//! Builder configuration stored under `.builder/config.toml`.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

/// Builder configuration (TOML).
///
/// Missing fields default to working values, so an empty file is valid.
/// API keys are never stored here; only the names of the environment
/// variables that hold them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BuilderConfig {
    /// Per-request timeout for text generation calls, in seconds.
    pub request_timeout_secs: u64,

    pub gemini: GeminiConfig,
    pub anthropic: AnthropicConfig,
    pub sandbox: SandboxConfig,
}

/// Primary text generation provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GeminiConfig {
    pub model: String,
    pub api_key_env: String,
    /// Base URL; the model path is appended.
    pub endpoint: String,
    pub max_output_tokens: u32,
    pub temperature: f32,
}

/// Secondary text generation provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AnthropicConfig {
    pub model: String,
    pub api_key_env: String,
    pub endpoint: String,
    pub max_tokens: u32,
    pub api_version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SandboxConfig {
    /// Dependency install command (e.g. `["npm","install"]`).
    pub install_command: Vec<String>,
    /// Long-running dev server command.
    pub dev_command: Vec<String>,
    pub install_timeout_secs: u64,
    /// How long to wait for the dev server to print its URL.
    pub ready_timeout_secs: u64,
    /// Truncate captured install output beyond this many bytes.
    pub output_limit_bytes: usize,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 120,
            gemini: GeminiConfig::default(),
            anthropic: AnthropicConfig::default(),
            sandbox: SandboxConfig::default(),
        }
    }
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.0-flash".to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
            endpoint: "https://generativelanguage.googleapis.com/v1beta/models".to_string(),
            max_output_tokens: 8000,
            temperature: 0.7,
        }
    }
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            model: "claude-3-5-sonnet-20241022".to_string(),
            api_key_env: "ANTHROPIC_API_KEY".to_string(),
            endpoint: "https://api.anthropic.com/v1/messages".to_string(),
            max_tokens: 8000,
            api_version: "2023-06-01".to_string(),
        }
    }
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            install_command: vec!["npm".to_string(), "install".to_string()],
            dev_command: vec!["npm".to_string(), "run".to_string(), "dev".to_string()],
            install_timeout_secs: 10 * 60,
            ready_timeout_secs: 120,
            output_limit_bytes: 100_000,
        }
    }
}

impl BuilderConfig {
    pub fn validate(&self) -> Result<()> {
        if self.request_timeout_secs == 0 {
            return Err(anyhow!("request_timeout_secs must be > 0"));
        }
        if self.gemini.model.trim().is_empty() {
            return Err(anyhow!("gemini.model must not be empty"));
        }
        if self.gemini.max_output_tokens == 0 {
            return Err(anyhow!("gemini.max_output_tokens must be > 0"));
        }
        if !(0.0..=2.0).contains(&self.gemini.temperature) {
            return Err(anyhow!("gemini.temperature must be between 0 and 2"));
        }
        if self.anthropic.model.trim().is_empty() {
            return Err(anyhow!("anthropic.model must not be empty"));
        }
        if self.anthropic.max_tokens == 0 {
            return Err(anyhow!("anthropic.max_tokens must be > 0"));
        }
        if !is_command(&self.sandbox.install_command) {
            return Err(anyhow!("sandbox.install_command must be a non-empty array"));
        }
        if !is_command(&self.sandbox.dev_command) {
            return Err(anyhow!("sandbox.dev_command must be a non-empty array"));
        }
        if self.sandbox.install_timeout_secs == 0 {
            return Err(anyhow!("sandbox.install_timeout_secs must be > 0"));
        }
        if self.sandbox.ready_timeout_secs == 0 {
            return Err(anyhow!("sandbox.ready_timeout_secs must be > 0"));
        }
        if self.sandbox.output_limit_bytes == 0 {
            return Err(anyhow!("sandbox.output_limit_bytes must be > 0"));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn is_command(command: &[String]) -> bool {
    command.first().is_some_and(|program| !program.trim().is_empty())
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `BuilderConfig::default()`.
pub fn load_config(path: &Path) -> Result<BuilderConfig> {
    if !path.exists() {
        let cfg = BuilderConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: BuilderConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &BuilderConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    super::write_atomic(path, &buf)
}
