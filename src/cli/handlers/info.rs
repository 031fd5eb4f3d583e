// src/cli/handlers/info.rs

//! Small informational commands: `help`, `version`, `greet`, `whoami`, `config`.

use anyhow::Result;
use chrono::{Local, Timelike};
use colored::*;

use crate::cli::registry::Command;
use crate::cli::render_help_template;
use crate::core::settings;
use crate::state::AppContext;

/// `ellie help`.
pub fn help(_args: &[String], ctx: &mut AppContext) -> Result<()> {
    print_help(ctx);
    Ok(())
}

/// Prints the help banner followed by every registered command.
pub fn print_help(ctx: &AppContext) {
    println!("{}", render_help_template());
    println!("{}", t!("help.header.commands").yellow().bold());

    let width = ctx
        .registry
        .commands()
        .map(|command| command.name.len())
        .max()
        .unwrap_or(0);
    for command in ctx.registry.commands() {
        print_command(command, width);
    }
    println!("\n{}", t!("help.footer").dimmed());
}

fn print_command(command: &Command, width: usize) {
    println!("  {:<width$}  {}", command.name.cyan().bold(), command.about, width = width);
    let subcommands = command.subcommand_names();
    if !subcommands.is_empty() {
        println!(
            "  {:<width$}  {}",
            "",
            subcommands.join(" | ").dimmed(),
            width = width
        );
    }
}

/// `ellie version`.
pub fn version(_args: &[String], _ctx: &mut AppContext) -> Result<()> {
    println!("ellie {}", env!("CARGO_PKG_VERSION"));
    Ok(())
}

/// Greets the user according to the time of day.
pub fn greet(_args: &[String], ctx: &mut AppContext) -> Result<()> {
    let name = settings::display_name(&ctx.settings);
    let message = match Local::now().hour() {
        5..=11 => format!(t!("greet.morning"), name = name),
        12..=17 => format!(t!("greet.afternoon"), name = name),
        _ => format!(t!("greet.evening"), name = name),
    };
    println!("{}", message.magenta().bold());
    Ok(())
}

/// `ellie whoami`.
pub fn whoami(_args: &[String], ctx: &mut AppContext) -> Result<()> {
    let name = settings::display_name(&ctx.settings);
    println!("{}", format!(t!("whoami.message"), name = name).magenta().bold());
    Ok(())
}

/// Shows the resolved settings and where every file lives.
pub fn config(_args: &[String], ctx: &mut AppContext) -> Result<()> {
    let s = &ctx.settings;
    let p = &ctx.paths;
    println!("\n--- {} ---", t!("config.header").yellow());
    let rows = [
        (t!("config.label.username"), settings::display_name(s)),
        (t!("config.label.prefix"), s.invocation_prefix.clone()),
        (t!("config.label.tick"), format!("{}s", s.tick_seconds)),
        (
            t!("config.label.suggestion_distance"),
            s.suggestion_distance.to_string(),
        ),
        (t!("config.label.config_dir"), p.config_dir.display().to_string()),
        (t!("config.label.settings_file"), p.settings_file.display().to_string()),
        (
            t!("config.label.automations_file"),
            p.automations_file.display().to_string(),
        ),
        (t!("config.label.aliases_file"), p.aliases_file.display().to_string()),
    ];
    for (label, value) in rows {
        println!("  {:<22} {}", label.blue(), value);
    }
    Ok(())
}
