//! Execution sandbox collaborator.
//!
//! A [`Sandbox`] receives mount descriptions, installs dependencies and starts
//! a dev server that announces a URL once ready. [`LocalSandbox`] does this in
//! a plain directory with child processes.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Child, Command};
use std::sync::LazyLock;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use regex::Regex;
use tracing::{info, instrument, warn};

use super::config::SandboxConfig;
use super::process::{WatchOutcome, run_command_with_timeout, watch_output};
use crate::core::mount::{MountDescription, MountEntry};

static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"https?://[^\s'"<>]+"#).unwrap());

static ANSI_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\x1b\[[0-9;?]*[A-Za-z]").unwrap());

/// Notification that the dev server accepts requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerReady {
    pub url: String,
}

/// Runtime that hosts the generated project.
pub trait Sandbox {
    /// Write every file of `description` into the sandbox.
    fn mount(&mut self, description: &MountDescription) -> Result<()>;
    /// Install project dependencies.
    fn install(&mut self) -> Result<()>;
    /// Start the dev server and wait until it reports its URL.
    fn start(&mut self) -> Result<ServerReady>;
    /// Stop the dev server if it is running.
    fn stop(&mut self) -> Result<()>;
}

/// Sandbox backed by a local directory and child processes.
pub struct LocalSandbox {
    root: PathBuf,
    config: SandboxConfig,
    server: Option<Child>,
}

impl LocalSandbox {
    pub fn new(root: impl Into<PathBuf>, config: SandboxConfig) -> Self {
        Self {
            root: root.into(),
            config,
            server: None,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Block until the running dev server exits.
    pub fn wait(&mut self) -> Result<()> {
        let Some(mut child) = self.server.take() else {
            return Err(anyhow!("dev server is not running"));
        };
        let status = child.wait().context("wait for dev server")?;
        info!(%status, "dev server exited");
        Ok(())
    }

    fn command(&self, argv: &[String]) -> Result<Command> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| anyhow!("sandbox command is empty"))?;
        let mut cmd = Command::new(program);
        cmd.args(args).current_dir(&self.root);
        Ok(cmd)
    }
}

impl Sandbox for LocalSandbox {
    #[instrument(skip_all, fields(root = %self.root.display()))]
    fn mount(&mut self, description: &MountDescription) -> Result<()> {
        let files = write_description(&self.root, description)?;
        info!(files, "mounted project");
        Ok(())
    }

    #[instrument(skip_all, fields(root = %self.root.display()))]
    fn install(&mut self) -> Result<()> {
        let cmd = self.command(&self.config.install_command)?;
        let output = run_command_with_timeout(
            cmd,
            Duration::from_secs(self.config.install_timeout_secs),
            self.config.output_limit_bytes,
        )
        .context("run install command")?;

        if output.timed_out {
            return Err(anyhow!(
                "install timed out after {} seconds",
                self.config.install_timeout_secs
            ));
        }
        if !output.status.success() {
            let reason = match output.status.code() {
                Some(code) => format!("install failed with exit code {code}"),
                None => "install was terminated by a signal".to_string(),
            };
            return Err(anyhow!(output.stderr_text().trim().to_string()).context(reason));
        }
        info!("dependencies installed");
        Ok(())
    }

    #[instrument(skip_all, fields(root = %self.root.display()))]
    fn start(&mut self) -> Result<ServerReady> {
        if self.server.is_some() {
            return Err(anyhow!("dev server is already running"));
        }
        let cmd = self.command(&self.config.dev_command)?;
        let timeout = Duration::from_secs(self.config.ready_timeout_secs);
        let (mut child, outcome) =
            watch_output(cmd, timeout, find_url).context("start dev server")?;

        match outcome {
            WatchOutcome::Matched(url) => {
                info!(%url, "dev server ready");
                self.server = Some(child);
                Ok(ServerReady { url })
            }
            WatchOutcome::Closed => {
                let status = child.wait().context("wait for dev server")?;
                Err(anyhow!("dev server exited before it was ready ({status})"))
            }
            WatchOutcome::TimedOut => {
                child.kill().context("kill dev server")?;
                child.wait().context("wait for dev server after kill")?;
                Err(anyhow!(
                    "dev server did not report a URL within {} seconds",
                    self.config.ready_timeout_secs
                ))
            }
        }
    }

    fn stop(&mut self) -> Result<()> {
        if let Some(mut child) = self.server.take() {
            child.kill().context("kill dev server")?;
            child.wait().context("wait for dev server after kill")?;
            info!("dev server stopped");
        }
        Ok(())
    }
}

impl Drop for LocalSandbox {
    fn drop(&mut self) {
        if let Err(err) = self.stop() {
            warn!(error = %format!("{err:#}"), "failed to stop dev server");
        }
    }
}

/// First URL in a line of dev server output, ignoring terminal colors.
fn find_url(line: &str) -> Option<String> {
    let plain = ANSI_RE.replace_all(line, "");
    URL_RE.find(&plain).map(|m| m.as_str().to_string())
}

/// Write every file of `description` under `dir`, creating directories as
/// needed. Existing files are overwritten; nothing is deleted.
///
/// Returns the number of files written.
pub fn write_description(dir: &Path, description: &MountDescription) -> Result<usize> {
    fs::create_dir_all(dir).with_context(|| format!("create directory {}", dir.display()))?;
    let mut written = 0;
    for (name, entry) in description {
        if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
            return Err(anyhow!("refusing to mount entry with unsafe name '{name}'"));
        }
        let target = dir.join(name);
        match entry {
            MountEntry::File(file) => {
                fs::write(&target, &file.contents)
                    .with_context(|| format!("write file {}", target.display()))?;
                written += 1;
            }
            MountEntry::Directory(children) => {
                written += write_description(&target, children)?;
            }
        }
    }
    Ok(written)
}
