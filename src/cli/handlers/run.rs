// src/cli/handlers/run.rs

//! `ellie run <program> [args...]`.

use anyhow::{Result, anyhow};

use crate::state::AppContext;
use crate::system::executor;

/// `ellie run <program> [args...]`: runs a program with the terminal attached.
pub fn handle(args: &[String], ctx: &mut AppContext) -> Result<()> {
    let [_, program, rest @ ..] = args else {
        return Err(anyhow!(t!("run.error.missing_program")));
    };
    executor::execute_program(program, rest, &ctx.cancellation_token)?;
    Ok(())
}
