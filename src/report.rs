//! User-facing output.
//!
//! Every line the tool prints carries the same prefix so it stays
//! distinguishable from whatever the hooks write to the shared streams.

/// Prefix for every line the tool itself prints.
pub const PREFIX: &str = "git-sync-world";

/// Print one status line to stdout.
pub fn say(msg: impl AsRef<str>) {
    println!("{PREFIX}: {}", msg.as_ref());
}

/// Print one error line to stderr.
pub fn error(msg: impl AsRef<str>) {
    eprintln!("{PREFIX}: ERROR - {}", msg.as_ref());
}
