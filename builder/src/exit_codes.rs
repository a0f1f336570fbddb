//! Stable exit codes for builder CLI commands.

/// Command succeeded.
pub const OK: i32 = 0;
/// Invalid layout/config/session/input or any other error.
pub const INVALID: i32 = 1;
/// The model reply contained no recognizable build steps.
pub const NO_STEPS: i32 = 2;
/// Every text generation provider failed.
pub const UNAVAILABLE: i32 = 3;
