//! Stable exit codes for the CLI.

/// Command succeeded.
pub const OK: i32 = 0;
/// Configuration, walk, or session-state failure.
pub const FAILURE: i32 = 1;
/// Invocation rejected by flag parsing (owned by clap).
pub const USAGE: i32 = 2;
