//! Command-line front end for the project builder.
//!
//! Every command works on the `.builder/` directory of `--root` (default:
//! the current directory). Product output goes to stdout; notices and
//! diagnostics go to stderr.

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};

use anyhow::{Context, Result};
use builder::core::parser::parse;
use builder::core::summary::{render_steps, render_tree};
use builder::exit_codes;
use builder::io::config::{BuilderConfig, load_config};
use builder::io::paths::{BuilderPaths, InitOptions, init_builder};
use builder::io::provider::{
    AnthropicClient, FallbackGenerator, GeminiClient, GenerationError, TextGenerator,
};
use builder::io::sandbox::{LocalSandbox, Sandbox, write_description};
use builder::io::session_store::{SessionState, load_session, write_session};
use builder::logging;
use builder::session::{BuilderSession, Notice, NoticeLevel, RoundOutcome};
use clap::{Parser, Subcommand};
use serde::Serialize;

#[derive(Parser)]
#[command(
    name = "builder",
    version,
    about = "Turn model output into a project tree and preview it"
)]
struct Cli {
    /// Project root holding `.builder/`.
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,

    /// Log more to stderr (`-v` info, `-vv` debug). `RUST_LOG` overrides.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create `.builder/` with config, schema and a boilerplate session.
    Init {
        /// Overwrite existing files.
        #[arg(short, long)]
        force: bool,
    },
    /// Print the build steps found in a model reply (`-` reads stdin).
    Parse { input: PathBuf },
    /// Parse a model reply and merge it into the session (`-` reads stdin).
    Apply { input: PathBuf },
    /// Start a new project from a task description.
    New { task: String },
    /// Send a follow-up message and apply the reply.
    Chat { message: String },
    /// Print the project tree.
    Tree,
    /// Print the step log with statuses.
    Steps,
    /// Print the sandbox mount description as JSON.
    Mount,
    /// Write the project files into a directory.
    Export { dir: PathBuf },
    /// Mount the project into the sandbox, install, and run the dev server.
    Preview,
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    if let Err(err) = dotenvy::dotenv()
        && !err.not_found()
    {
        eprintln!("warning: ignoring .env: {err}");
    }

    let code = match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{:#}", err);
            if matches!(
                err.downcast_ref::<GenerationError>(),
                Some(GenerationError::Unavailable { .. })
            ) {
                exit_codes::UNAVAILABLE
            } else {
                exit_codes::INVALID
            }
        }
    };
    std::process::exit(code);
}

fn run(cli: Cli) -> Result<i32> {
    let paths = BuilderPaths::new(&cli.root);
    match cli.command {
        Command::Init { force } => cmd_init(&cli.root, force),
        Command::Parse { input } => cmd_parse(&input),
        Command::Apply { input } => cmd_apply(&paths, &input),
        Command::New { task } => cmd_new(&paths, &task),
        Command::Chat { message } => cmd_chat(&paths, &message),
        Command::Tree => {
            print!("{}", render_tree(&load(&paths)?.tree));
            Ok(exit_codes::OK)
        }
        Command::Steps => {
            print!("{}", render_steps(&load(&paths)?.steps));
            Ok(exit_codes::OK)
        }
        Command::Mount => {
            let session = BuilderSession::from_state((), load(&paths)?);
            print_json(&session.mount_description())?;
            Ok(exit_codes::OK)
        }
        Command::Export { dir } => cmd_export(&paths, &dir),
        Command::Preview => cmd_preview(&paths),
    }
}

fn cmd_init(root: &Path, force: bool) -> Result<i32> {
    let paths = init_builder(root, &InitOptions { force })?;
    println!("initialized {}", paths.builder_dir.display());
    Ok(exit_codes::OK)
}

fn cmd_parse(input: &Path) -> Result<i32> {
    let steps = parse(&read_input(input)?);
    print_json(&steps)?;
    Ok(exit_codes::OK)
}

fn cmd_apply(paths: &BuilderPaths, input: &Path) -> Result<i32> {
    let text = read_input(input)?;
    let (tx, rx) = mpsc::channel();
    let mut session = BuilderSession::from_state((), load(paths)?).with_notices(tx);
    let outcome = session.apply_response(&text);
    save(paths, session.state())?;
    drop(session);
    print_notices(&rx);
    Ok(report(&outcome))
}

fn cmd_new(paths: &BuilderPaths, task: &str) -> Result<i32> {
    paths.ensure_initialized()?;
    let cfg = load_config(&paths.config_path)?;
    let (tx, rx) = mpsc::channel();
    let mut session = BuilderSession::new(generator(&cfg)?).with_notices(tx);
    let result = session.initialize(task);
    print_notices(&rx);
    let outcome = result?;
    save(paths, session.state())?;
    Ok(report(&outcome))
}

fn cmd_chat(paths: &BuilderPaths, message: &str) -> Result<i32> {
    let cfg = load_config(&paths.config_path)?;
    let state = load(paths)?;
    let (tx, rx) = mpsc::channel();
    let mut session = BuilderSession::from_state(generator(&cfg)?, state).with_notices(tx);
    let outcome = session.send_message(message)?;
    save(paths, session.state())?;
    print_notices(&rx);
    Ok(report(&outcome))
}

fn cmd_export(paths: &BuilderPaths, dir: &Path) -> Result<i32> {
    let session = BuilderSession::from_state((), load(paths)?);
    let written = write_description(dir, &session.mount_description())?;
    println!("wrote {written} files to {}", dir.display());
    Ok(exit_codes::OK)
}

fn cmd_preview(paths: &BuilderPaths) -> Result<i32> {
    let cfg = load_config(&paths.config_path)?;
    let session = BuilderSession::from_state((), load(paths)?);
    let mut sandbox = LocalSandbox::new(&paths.sandbox_dir, cfg.sandbox);
    sandbox.mount(&session.mount_description())?;
    eprintln!("installing dependencies in {}", sandbox.root().display());
    sandbox.install()?;
    let ready = sandbox.start()?;
    println!("{}", ready.url);
    sandbox.wait()?;
    Ok(exit_codes::OK)
}

fn generator(cfg: &BuilderConfig) -> Result<impl TextGenerator> {
    let timeout = cfg.request_timeout();
    Ok(FallbackGenerator::new(
        GeminiClient::new(&cfg.gemini, timeout)?,
        AnthropicClient::new(&cfg.anthropic, timeout)?,
    ))
}

fn load(paths: &BuilderPaths) -> Result<SessionState> {
    paths.ensure_initialized()?;
    load_session(&paths.schema_path, &paths.session_path)
}

fn save(paths: &BuilderPaths, state: &SessionState) -> Result<()> {
    write_session(&paths.session_path, state)
}

fn read_input(input: &Path) -> Result<String> {
    if input == Path::new("-") {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("read stdin")?;
        return Ok(buf);
    }
    fs::read_to_string(input).with_context(|| format!("read {}", input.display()))
}

/// Serialize `value` to stdout as pretty-printed JSON.
fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let payload = serde_json::to_string_pretty(value).context("serialize json")?;
    println!("{payload}");
    Ok(())
}

fn print_notices(rx: &Receiver<Notice>) {
    for notice in rx.try_iter() {
        let label = match notice.level {
            NoticeLevel::Info => "info",
            NoticeLevel::Success => "ok",
            NoticeLevel::Warning => "warning",
            NoticeLevel::Error => "error",
        };
        eprintln!("{label}: {}", notice.message);
    }
}

/// Print a round summary and map it to an exit code.
fn report(outcome: &RoundOutcome) -> i32 {
    match outcome {
        RoundOutcome::Applied {
            round,
            steps,
            files_written,
            still_pending,
        } => {
            println!(
                "round {round}: {steps} steps, {files_written} files written, {still_pending} pending"
            );
            exit_codes::OK
        }
        RoundOutcome::NoSteps => exit_codes::NO_STEPS,
        RoundOutcome::Failed { reason } => {
            eprintln!("{reason}");
            exit_codes::UNAVAILABLE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_init_force() {
        let cli = Cli::parse_from(["builder", "init", "--force"]);
        assert!(matches!(cli.command, Command::Init { force: true }));
        assert_eq!(cli.verbose, 0);
    }

    #[test]
    fn parse_apply_from_stdin_with_root() {
        let cli = Cli::parse_from(["builder", "apply", "-", "--root", "/tmp/project"]);
        assert_eq!(cli.root, PathBuf::from("/tmp/project"));
        match cli.command {
            Command::Apply { input } => assert_eq!(input, PathBuf::from("-")),
            _ => panic!("expected apply"),
        }
    }

    #[test]
    fn parse_counts_verbose_flags() {
        let cli = Cli::parse_from(["builder", "-vv", "tree"]);
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Command::Tree));
    }

    #[test]
    fn report_maps_outcomes_to_exit_codes() {
        assert_eq!(report(&RoundOutcome::NoSteps), exit_codes::NO_STEPS);
        assert_eq!(
            report(&RoundOutcome::Failed {
                reason: "down".to_string()
            }),
            exit_codes::UNAVAILABLE
        );
    }
}
