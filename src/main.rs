//! Ridgeline binary entry point.
//!
//! Delegates to [`ridgeline::cli::run`] and translates the result into a
//! process exit code per the CLI contract: `0` success, `1` user error,
//! `2` unresolved conflict (continuation persisted), `3` internal/integrity
//! error.

use std::process::ExitCode;

fn main() -> ExitCode {
    match ridgeline::cli::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            // Conflict messages (with their "resolve, then continue" instructions)
            // are already printed by the command handler; don't repeat them.
            if err.downcast_ref::<ridgeline::cli::exit::CliError>().is_none() {
                eprintln!("error: {:#}", err);
            }
            ExitCode::from(ridgeline::cli::exit::exit_code_for(&err) as u8)
        }
    }
}
