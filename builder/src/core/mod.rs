//! Deterministic, pure logic shared by the builder.
//!
//! Core modules are free of I/O side effects: they turn model text into steps,
//! steps into trees, and trees into mount descriptions.

pub mod edit;
pub mod fence;
pub mod invariants;
pub mod merge;
pub mod mount;
pub mod parser;
pub mod path;
pub mod summary;
pub mod types;
