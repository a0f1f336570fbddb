//! CLI tests for the `builder` binary.
//!
//! Spawns the binary against temporary project roots and checks exit codes,
//! stdout, and the persisted session.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use builder::exit_codes;
use builder::io::config::{BuilderConfig, write_config};
use builder::io::session_store::load_session;
use builder::session::FAILURE_PLACEHOLDER;
use builder::test_support::{artifact, initialized_root};

fn builder(root: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_builder"))
        .current_dir(root)
        .env("RUST_LOG", "off")
        .arg("--root")
        .arg(root)
        .args(args)
        .output()
        .expect("run builder")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn init_creates_layout_and_refuses_to_clobber() {
    let temp = tempfile::tempdir().expect("tempdir");

    let first = builder(temp.path(), &["init"]);
    assert_eq!(first.status.code(), Some(exit_codes::OK));
    assert!(temp.path().join(".builder/config.toml").is_file());
    assert!(temp.path().join(".builder/session.json").is_file());

    let second = builder(temp.path(), &["init"]);
    assert_eq!(second.status.code(), Some(exit_codes::INVALID));

    let forced = builder(temp.path(), &["init", "--force"]);
    assert_eq!(forced.status.code(), Some(exit_codes::OK));
}

#[test]
fn commands_require_init() {
    let temp = tempfile::tempdir().expect("tempdir");
    let output = builder(temp.path(), &["tree"]);
    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
    assert!(String::from_utf8_lossy(&output.stderr).contains("builder init"));
}

#[test]
fn parse_prints_steps_without_touching_session() {
    let (temp, paths) = initialized_root();
    let before = fs::read_to_string(&paths.session_path).expect("read session");
    let reply = temp.path().join("reply.txt");
    fs::write(&reply, artifact(&[("src/App.tsx", "app")])).expect("write reply");

    let output = builder(temp.path(), &["parse", reply.to_str().expect("utf8 path")]);
    assert_eq!(output.status.code(), Some(exit_codes::OK));

    let steps: serde_json::Value = serde_json::from_str(&stdout(&output)).expect("json");
    assert_eq!(steps[0]["type"], "CreateFile");
    assert_eq!(steps[0]["path"], "src/App.tsx");
    assert_eq!(steps[0]["status"], "pending");
    assert_eq!(
        fs::read_to_string(&paths.session_path).expect("read session"),
        before
    );
}

#[test]
fn apply_merges_reply_and_persists_session() {
    let (temp, paths) = initialized_root();
    let reply = temp.path().join("reply.txt");
    fs::write(
        &reply,
        artifact(&[("src/App.tsx", "export default 1;"), ("src/lib/util.ts", "u")]),
    )
    .expect("write reply");

    let output = builder(temp.path(), &["apply", reply.to_str().expect("utf8 path")]);
    assert_eq!(output.status.code(), Some(exit_codes::OK));
    assert!(stdout(&output).contains("2 files written"));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Added 2 files to project"));

    let state = load_session(&paths.schema_path, &paths.session_path).expect("load session");
    assert_eq!(
        state
            .tree
            .find("/src/App.tsx")
            .and_then(|node| node.content.as_deref()),
        Some("export default 1;")
    );
    assert!(state.tree.find("/src/lib/util.ts").is_some());
    assert_eq!(state.steps.len(), 2);
    assert_eq!(state.steps.pending_count(), 0);

    let tree = builder(temp.path(), &["tree"]);
    assert!(stdout(&tree).contains("util.ts"));
}

#[test]
fn apply_without_steps_exits_with_no_steps() {
    let (temp, paths) = initialized_root();
    let before = fs::read_to_string(&paths.session_path).expect("read session");
    let reply = temp.path().join("reply.txt");
    fs::write(&reply, "Sure, here is an explanation with no files.").expect("write reply");

    let output = builder(temp.path(), &["apply", reply.to_str().expect("utf8 path")]);
    assert_eq!(output.status.code(), Some(exit_codes::NO_STEPS));
    assert_eq!(
        fs::read_to_string(&paths.session_path).expect("read session"),
        before
    );
}

#[test]
fn mount_and_export_reflect_tree() {
    let (temp, _paths) = initialized_root();
    let reply = temp.path().join("reply.txt");
    fs::write(&reply, artifact(&[("src/main.ts", "console.log(1);")])).expect("write reply");
    let applied = builder(temp.path(), &["apply", reply.to_str().expect("utf8 path")]);
    assert_eq!(applied.status.code(), Some(exit_codes::OK));

    let mount = builder(temp.path(), &["mount"]);
    assert_eq!(mount.status.code(), Some(exit_codes::OK));
    let description: serde_json::Value = serde_json::from_str(&stdout(&mount)).expect("json");
    assert_eq!(
        description["src"]["directory"]["main.ts"]["file"]["contents"],
        "console.log(1);"
    );

    let out_dir = temp.path().join("out");
    let export = builder(temp.path(), &["export", out_dir.to_str().expect("utf8 path")]);
    assert_eq!(export.status.code(), Some(exit_codes::OK));
    assert_eq!(
        fs::read_to_string(out_dir.join("src/main.ts")).expect("read exported"),
        "console.log(1);"
    );
}

#[test]
fn chat_without_providers_records_failure() {
    let (temp, paths) = initialized_root();
    let mut cfg = BuilderConfig::default();
    cfg.gemini.api_key_env = "BUILDER_CLI_TEST_UNSET_GEMINI".to_string();
    cfg.anthropic.api_key_env = "BUILDER_CLI_TEST_UNSET_ANTHROPIC".to_string();
    write_config(&paths.config_path, &cfg).expect("write config");

    let output = builder(temp.path(), &["chat", "add a footer"]);
    assert_eq!(output.status.code(), Some(exit_codes::UNAVAILABLE));

    let state = load_session(&paths.schema_path, &paths.session_path).expect("load session");
    assert_eq!(state.messages.len(), 2);
    assert_eq!(state.messages[1].content, FAILURE_PLACEHOLDER);
    assert!(state.steps.is_empty());
}

#[test]
fn new_without_providers_exits_unavailable() {
    let (temp, paths) = initialized_root();
    let mut cfg = BuilderConfig::default();
    cfg.gemini.api_key_env = "BUILDER_CLI_TEST_UNSET_GEMINI".to_string();
    cfg.anthropic.api_key_env = "BUILDER_CLI_TEST_UNSET_ANTHROPIC".to_string();
    write_config(&paths.config_path, &cfg).expect("write config");

    let output = builder(temp.path(), &["new", "a todo app"]);
    assert_eq!(output.status.code(), Some(exit_codes::UNAVAILABLE));
}
