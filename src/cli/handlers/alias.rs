//! # Handler for the `alias` command
//!
//! Manages user shortcuts: `ellie alias add gs="git status"` lets `ellie gs`
//! run `ellie git status`.
//!
//! ## Core Logic
//!
//! - **State Management**: `list` only reads the alias book; `add` and `delete`
//!   go through `aliases_mut()`, so the book is written back only when it changed.
//! - **Shadowing**: an alias may not reuse the name of a registered command,
//!   since commands always win at dispatch time.

use anyhow::{Result, anyhow};
use colored::*;
use dialoguer::console::measure_text_width;

use crate::cli::handlers::success;
use crate::cli::registry::Command;
use crate::core::aliases;
use crate::state::AppContext;

/// The `alias` router.
pub fn command() -> Command {
    Command::router("alias")
        .about(t!("help.about.alias"))
        .subcommand(
            Command::leaf("add", add)
                .min_args(2)
                .usage("ellie alias add <name>=\"<command>\""),
        )
        .subcommand(Command::leaf("list", list))
        .subcommand(
            Command::leaf("delete", delete)
                .min_args(2)
                .usage("ellie alias delete <name>"),
        )
}

/// `alias add name=command`. The command may also be given as separate words
/// after `name=`.
fn add(args: &[String], ctx: &mut AppContext) -> Result<()> {
    let assignment = args.get(1..).unwrap_or_default().join(" ");
    let (name, command) = aliases::parse_assignment(&assignment)?;

    if ctx.registry.contains(&name) {
        return Err(anyhow!(t!("alias.error.shadows_command"), name = name));
    }

    let replaced = ctx.aliases_mut().upsert(&name, &command);
    let message = if replaced {
        format!(t!("alias.success.updated"), name = name.cyan(), command = command)
    } else {
        format!(t!("alias.success.added"), name = name.cyan(), command = command)
    };
    success(&message);
    Ok(())
}

fn list(_args: &[String], ctx: &mut AppContext) -> Result<()> {
    let book = ctx.aliases();
    if book.is_empty() {
        println!("\n{}", t!("alias.info.no_aliases"));
        return Ok(());
    }

    println!("\n{}:", t!("alias.info.header"));
    let mut sorted: Vec<_> = book.aliases.iter().collect();
    sorted.sort_by(|a, b| a.name.cmp(&b.name));

    let max_len = sorted
        .iter()
        .map(|alias| measure_text_width(&alias.name))
        .max()
        .unwrap_or(0);
    for alias in sorted {
        let padding = " ".repeat(max_len.saturating_sub(measure_text_width(&alias.name)));
        println!("  {}{} ->  {}", alias.name.cyan(), padding, alias.command);
    }
    Ok(())
}

fn delete(args: &[String], ctx: &mut AppContext) -> Result<()> {
    let name = aliases::validate_name(args.get(1).map(String::as_str).unwrap_or_default())?;
    if !ctx.aliases_mut().remove(&name) {
        return Err(anyhow!(t!("alias.error.not_found"), name = name));
    }
    success(&format!(t!("alias.success.removed"), name = name));
    Ok(())
}

// MARK: --- UNIT TESTS ---
