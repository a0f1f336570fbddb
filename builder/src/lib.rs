//! Turns free-form model output into a materialized project tree.
//!
//! The crate keeps a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (step parsing, tree merging,
//!   mount descriptions, invariants). No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting operations (configuration, persistence,
//!   prompts, text generation providers, the sandbox).
//!
//! [`session`] coordinates both for one builder session; the `builder`
//! binary exposes it as a CLI.

pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod session;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod tree;
