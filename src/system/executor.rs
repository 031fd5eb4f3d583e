// src/system/executor.rs

//! Child process execution with Ctrl+C and cancellation handling.

use std::io::ErrorKind;
use std::process::{Command as StdCommand, ExitStatus, Stdio};
use std::sync::atomic::Ordering;
use std::time::Duration;

use thiserror::Error;

use crate::CancellationToken;

/// Errors from running a child process.
#[derive(Error, Debug)]
pub enum ExecutionError {
    /// No program was given.
    #[error("No command specified to run.")]
    EmptyCommand,
    /// The program is not on `PATH`.
    #[error("Command '{0}' was not found.")]
    NotFound(String),
    /// Spawning or waiting on the child failed.
    #[error("Command '{command}' could not be executed: {source}")]
    CommandFailed {
        /// The command line as displayed.
        command: String,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },
    /// The child exited with a non-zero status.
    #[error("Command '{command}' exited with status {code}.")]
    NonZeroExitStatus {
        /// The command line as displayed.
        command: String,
        /// The exit code.
        code: i32,
    },
    /// The child was stopped by Ctrl+C.
    #[error("Command '{command}' was interrupted.")]
    Interrupted {
        /// The command line as displayed.
        command: String,
    },
    /// The cancellation token was set while the child ran.
    #[error("Operation was cancelled by the user.")]
    Cancelled,
}

/// Runs `program` with `args`, inheriting the terminal, and waits for it.
///
/// The wait polls `cancellation_token`; once it is set the child is killed and
/// [`ExecutionError::Cancelled`] is returned.
pub fn execute_program(
    program: &str,
    args: &[String],
    cancellation_token: &CancellationToken,
) -> Result<(), ExecutionError> {
    let program = program.trim();
    if program.is_empty() {
        return Err(ExecutionError::EmptyCommand);
    }
    if cancellation_token.load(Ordering::SeqCst) {
        return Err(ExecutionError::Cancelled);
    }

    let display = display_command(program, args);
    log::debug!("Executing: {}", display);

    let mut child = StdCommand::new(program)
        .args(args)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
        .map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                ExecutionError::NotFound(program.to_string())
            } else {
                ExecutionError::CommandFailed {
                    command: display.clone(),
                    source: e,
                }
            }
        })?;

    // Non-blocking wait loop so cancellation can interrupt a long child.
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return check_status(&display, status),
            Ok(None) => {
                if cancellation_token.load(Ordering::SeqCst) {
                    log::debug!(
                        "Cancellation requested, killing child process (PID: {})...",
                        child.id()
                    );
                    if let Err(e) = child.kill() {
                        log::warn!("Failed to kill child process {}: {}", child.id(), e);
                    }
                    child.wait().ok();
                    return Err(ExecutionError::Cancelled);
                }
                std::thread::sleep(Duration::from_millis(50));
            }
            Err(e) => {
                return Err(ExecutionError::CommandFailed {
                    command: display,
                    source: e,
                });
            }
        }
    }
}

fn check_status(command: &str, status: ExitStatus) -> Result<(), ExecutionError> {
    if status.success() {
        return Ok(());
    }
    if was_interrupted(status) {
        return Err(ExecutionError::Interrupted {
            command: command.to_string(),
        });
    }
    Err(ExecutionError::NonZeroExitStatus {
        command: command.to_string(),
        code: status.code().unwrap_or(-1),
    })
}

#[cfg(unix)]
fn was_interrupted(status: ExitStatus) -> bool {
    use std::os::unix::process::ExitStatusExt;
    // SIGINT
    status.signal() == Some(2) || status.code() == Some(130)
}

#[cfg(not(unix))]
fn was_interrupted(status: ExitStatus) -> bool {
    // STATUS_CONTROL_C_EXIT
    status.code() == Some(0xC000_013Au32 as i32)
}

fn display_command(program: &str, args: &[String]) -> String {
    std::iter::once(program.to_string())
        .chain(args.iter().map(|arg| shlex::try_quote(arg).map_or_else(|_| arg.clone(), |q| q.into_owned())))
        .collect::<Vec<_>>()
        .join(" ")
}

// MARK: --- UNIT TESTS ---
