// src/bin/ellie.rs

use clap::Parser;
use colored::*;
use ellie::{
    CancellationToken,
    cli::{Cli, dispatcher, handlers},
    state::AppContext,
};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

/// The main entry point of the `ellie` application.
/// It sets up logging, builds the application context, dispatches, persists
/// pending changes and maps the outcome to the process exit code.
fn main() {
    let cancellation_token: CancellationToken = Arc::new(AtomicBool::new(false));
    env_logger::init();

    let cli = Cli::parse();
    log::debug!("CLI args parsed: {:?}", cli);

    let registry = Arc::new(handlers::build_registry());
    let mut ctx = match AppContext::load(registry, cancellation_token) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("\n{}: {:#}", t_error(), e);
            std::process::exit(1);
        }
    };

    let outcome = dispatcher::dispatch(&cli.args, &mut ctx);

    if let Err(e) = ctx.save() {
        eprintln!("\n{}: {}", t_error(), e);
        std::process::exit(1);
    }

    std::process::exit(outcome.exit_code());
}

fn t_error() -> ColoredString {
    ellie::t!("common.error").red().bold()
}
