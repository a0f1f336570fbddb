//! Canonical `.builder/` layout and its scaffolding.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use tracing::info;

use super::config::{BuilderConfig, write_config};
use super::session_store::{SessionState, write_session};

pub(crate) const SESSION_SCHEMA: &str = include_str!("../../schemas/session.schema.json");

const BUILDER_GITIGNORE: &str = "sandbox/\n*.tmp\n";

/// All canonical paths within `.builder/` for a project root.
#[derive(Debug, Clone)]
pub struct BuilderPaths {
    pub root: PathBuf,
    pub builder_dir: PathBuf,
    pub gitignore_path: PathBuf,
    pub config_path: PathBuf,
    pub schema_path: PathBuf,
    pub session_path: PathBuf,
    /// Working directory the preview sandbox mounts into.
    pub sandbox_dir: PathBuf,
}

impl BuilderPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let builder_dir = root.join(".builder");
        Self {
            root,
            gitignore_path: builder_dir.join(".gitignore"),
            config_path: builder_dir.join("config.toml"),
            schema_path: builder_dir.join("session.schema.json"),
            session_path: builder_dir.join("session.json"),
            sandbox_dir: builder_dir.join("sandbox"),
            builder_dir,
        }
    }

    /// Fail unless `init` has been run for this root.
    pub fn ensure_initialized(&self) -> Result<()> {
        if !self.session_path.is_file() || !self.schema_path.is_file() {
            return Err(anyhow!(
                "no builder session in {} (run `builder init` first)",
                self.root.display()
            ));
        }
        Ok(())
    }
}

/// Options for `init_builder`.
#[derive(Debug, Clone)]
pub struct InitOptions {
    /// If true, overwrite existing builder-owned files.
    pub force: bool,
}

/// Create `.builder/` scaffolding in `root`: config, schema, and a session
/// holding the boilerplate tree.
///
/// Fails if `.builder/` already exists unless `options.force` is set.
pub fn init_builder(root: &Path, options: &InitOptions) -> Result<BuilderPaths> {
    let paths = BuilderPaths::new(root);
    if paths.builder_dir.exists() && !paths.builder_dir.is_dir() {
        return Err(anyhow!(
            "builder init: .builder exists but is not a directory"
        ));
    }
    if paths.builder_dir.exists() && !options.force {
        return Err(anyhow!(
            "builder init: .builder already exists (use --force to overwrite)"
        ));
    }

    fs::create_dir_all(&paths.builder_dir)
        .with_context(|| format!("create directory {}", paths.builder_dir.display()))?;
    write_file(&paths.gitignore_path, BUILDER_GITIGNORE)?;
    write_file(&paths.schema_path, SESSION_SCHEMA)?;
    write_config(&paths.config_path, &BuilderConfig::default())?;
    write_session(&paths.session_path, &SessionState::default())?;

    info!(root = %root.display(), "initialized builder");
    Ok(paths)
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    fs::write(path, contents).with_context(|| format!("write file {}", path.display()))
}
