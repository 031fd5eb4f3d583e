// src/cli/handlers/mod.rs

//! One module per command family, plus the command table that wires them up.

use anyhow::Result;
use clap::Parser;
use clap::error::ErrorKind;
use colored::*;

use super::registry::{Command, Registry};

pub mod alias;
pub mod automate;
pub mod git;
pub mod info;
pub mod run;

/// The full command tree of the `ellie` binary.
pub fn build_registry() -> Registry {
    Registry::new()
        .with(Command::leaf("help", info::help).about(t!("help.about.help")))
        .with(Command::leaf("version", info::version).about(t!("help.about.version")))
        .with(Command::leaf("greet", info::greet).about(t!("help.about.greet")))
        .with(Command::leaf("whoami", info::whoami).about(t!("help.about.whoami")))
        .with(Command::leaf("config", info::config).about(t!("help.about.config")))
        .with(
            Command::leaf("run", run::handle)
                .min_args(2)
                .usage("ellie run <program> [args...]")
                .about(t!("help.about.run")),
        )
        .with(git::command())
        .with(alias::command())
        .with(automate::command())
}

/// Parses the arguments after the command name into `T`.
///
/// `--help` / `--version` print clap's text and yield `None`.
pub(crate) fn parse_args<T: Parser>(args: &[String]) -> Result<Option<T>> {
    match T::try_parse_from(args.get(1..).unwrap_or_default()) {
        Ok(parsed) => Ok(Some(parsed)),
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            e.print()?;
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

pub(crate) fn success(message: &str) {
    println!("{} {}", t!("common.success").green().bold(), message);
}

// MARK: --- UNIT TESTS ---
