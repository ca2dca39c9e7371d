//! cli::exit
//!
//! Maps the core error taxonomy onto process exit codes.
//!
//! Contract: `0` success, `1` user error, `2` unresolved conflict (a
//! continuation was persisted), `3` internal/integrity error. Commands that
//! hit one of the non-default cases wrap their failure in [`CliError`] so
//! `main` can pick the right code without re-deriving it from message text.

use std::fmt;

/// A top-level failure carrying its intended process exit code.
#[derive(Debug)]
pub enum CliError {
    /// Rebase/merge conflict left mid-flight; a continuation record was
    /// written and `rl continue` will resume.
    Conflict(String),
    /// Corrupted metadata, a missing parent branch, or some other
    /// repository integrity violation that `rl doctor` should resolve.
    Integrity(String),
}

impl CliError {
    /// The process exit code this error should produce.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Conflict(_) => 2,
            CliError::Integrity(_) => 3,
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Conflict(msg) => write!(f, "{}", msg),
            CliError::Integrity(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for CliError {}

/// Resolve the exit code for a command failure. User errors and anything
/// not wrapped in [`CliError`] exit `1`.
pub fn exit_code_for(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<CliError>()
        .map(|e| e.exit_code())
        .unwrap_or(1)
}
