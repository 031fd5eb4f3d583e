// src/cli/dispatcher.rs

//! Turns argv into a handler call.
//!
//! ## Core Logic
//!
//! 1. No tokens: show help.
//! 2. A top-level token that is not a command but names an alias is expanded
//!    once (shell-style split, followed by the rest of argv).
//! 3. The registry resolves the tokens. A miss at any level is answered with
//!    fuzzy suggestions drawn from that level's names.
//! 4. The argv of the resolved level must have at least `min_args` entries,
//!    otherwise the usage string is shown and nothing runs.
//! 5. Pre-hooks of every node on the resolved path run (outermost first),
//!    then the handler.
//!
//! Nothing here returns an error: every path ends in a [`DispatchOutcome`].

use anyhow::anyhow;
use colored::*;
use std::fmt;
use std::sync::Arc;

use crate::constants::AUTOMATION_COMMAND;
use crate::core::automation::ActionExecutor;
use crate::core::fuzzy::Matcher;
use crate::state::AppContext;
use crate::system::executor::ExecutionError;

use super::registry::{LookupError, Resolution};

/// How a dispatch ended.
#[derive(Debug)]
pub enum DispatchOutcome {
    /// No command was given; help was requested.
    Help,
    /// The handler ran and returned `Ok`.
    Completed {
        /// Qualified name, e.g. `git status`.
        command: String,
    },
    /// The first token named no command.
    UnknownCommand {
        /// The token as typed.
        name: String,
        /// Close matches, best first.
        suggestions: Vec<String>,
    },
    /// A router did not know the next token.
    UnknownSubcommand {
        /// Path of the router.
        parent: String,
        /// The token as typed.
        name: String,
        /// Close matches among the router's subcommands.
        suggestions: Vec<String>,
    },
    /// A router that needs a subcommand got none.
    MissingSubcommand {
        /// Path of the router.
        parent: String,
        /// What could have followed.
        available: Vec<String>,
    },
    /// Too few arguments; the handler was not called.
    InvalidUsage {
        /// Qualified name of the command.
        command: String,
        /// The command's usage line.
        usage: String,
    },
    /// The handler ran and returned an error.
    Failed {
        /// Qualified name of the command.
        command: String,
        /// What the handler returned.
        error: anyhow::Error,
    },
}

impl DispatchOutcome {
    /// Help or a completed handler.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Help | Self::Completed { .. })
    }

    /// Process exit code: 0 on success, 130 when a child was interrupted, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Help | Self::Completed { .. } => 0,
            Self::Failed { error, .. } if is_interruption(error) => 130,
            _ => 1,
        }
    }
}

fn is_interruption(error: &anyhow::Error) -> bool {
    error.chain().any(|cause| {
        matches!(
            cause.downcast_ref::<ExecutionError>(),
            Some(ExecutionError::Interrupted { .. } | ExecutionError::Cancelled)
        )
    })
}

impl fmt::Display for DispatchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Help => write!(f, "{}", t!("dispatch.info.help")),
            Self::Completed { command } => {
                write!(f, t!("dispatch.info.completed"), command = command)
            }
            Self::UnknownCommand { name, .. } => {
                write!(f, t!("dispatch.error.unknown_command"), name = name)
            }
            Self::UnknownSubcommand { parent, name, .. } => write!(
                f,
                t!("dispatch.error.unknown_subcommand"),
                parent = parent,
                name = name
            ),
            Self::MissingSubcommand { parent, .. } => {
                write!(f, t!("dispatch.error.missing_subcommand"), parent = parent)
            }
            Self::InvalidUsage { command, usage } => write!(
                f,
                t!("dispatch.error.invalid_usage"),
                command = command,
                usage = usage
            ),
            Self::Failed { command, error } => write!(
                f,
                t!("dispatch.error.failed"),
                command = command,
                error = format!("{:#}", error)
            ),
        }
    }
}

/// Resolves and runs `args` without printing anything about the outcome.
pub fn run(args: &[String], ctx: &mut AppContext) -> DispatchOutcome {
    log::debug!("Dispatching args: {:?}", args);

    let Some(first) = args.first() else {
        return DispatchOutcome::Help;
    };

    match expanded_args(args, ctx) {
        Ok(args) => run_expanded(&args, ctx),
        Err(error) => DispatchOutcome::Failed {
            command: first.clone(),
            error,
        },
    }
}

/// `args` with a leading alias expanded, or `args` unchanged. This is the
/// argv the registry sees.
pub fn expanded_args(args: &[String], ctx: &AppContext) -> anyhow::Result<Vec<String>> {
    let Some(first) = args.first() else {
        return Ok(Vec::new());
    };
    Ok(expand_alias(first, args, ctx)?.unwrap_or_else(|| args.to_vec()))
}

/// Lookup and invocation of argv whose aliases are already expanded.
fn run_expanded(args: &[String], ctx: &mut AppContext) -> DispatchOutcome {
    let registry = Arc::clone(&ctx.registry);
    let matcher = ctx.matcher();
    match registry.lookup(args) {
        Ok(resolution) => invoke(&resolution, ctx),
        Err(e) => lookup_outcome(e, &matcher),
    }
}

/// Like [`run`], then prints the outcome for the user.
pub fn dispatch(args: &[String], ctx: &mut AppContext) -> DispatchOutcome {
    let outcome = run(args, ctx);
    report(&outcome, ctx);
    outcome
}

fn invoke(resolution: &Resolution<'_, '_>, ctx: &mut AppContext) -> DispatchOutcome {
    let command = resolution.command;
    let name = resolution.qualified_name();

    if resolution.args.len() < command.min_args {
        return DispatchOutcome::InvalidUsage {
            command: name,
            usage: command.usage.clone(),
        };
    }

    for hook in resolution.path.iter().filter_map(|node| node.pre_hook.as_ref()) {
        hook();
    }

    let Some(handler) = command.handler() else {
        // The registry only resolves routers that have a default handler.
        return DispatchOutcome::MissingSubcommand {
            parent: name,
            available: command.subcommand_names(),
        };
    };

    log::debug!("Running '{}' with {:?}", name, resolution.args);
    match handler(resolution.args, ctx) {
        Ok(()) => DispatchOutcome::Completed { command: name },
        Err(error) => DispatchOutcome::Failed {
            command: name,
            error,
        },
    }
}

fn lookup_outcome(error: LookupError, matcher: &Matcher) -> DispatchOutcome {
    match error {
        LookupError::Empty => DispatchOutcome::Help,
        LookupError::UnknownCommand { name, candidates } => DispatchOutcome::UnknownCommand {
            suggestions: matcher.suggest(&candidates, &name),
            name,
        },
        LookupError::UnknownSubcommand {
            parent,
            name,
            candidates,
        } => DispatchOutcome::UnknownSubcommand {
            suggestions: matcher.suggest(&candidates, &name),
            parent,
            name,
        },
        LookupError::MissingSubcommand { parent, candidates } => {
            DispatchOutcome::MissingSubcommand {
                parent,
                available: candidates,
            }
        }
    }
}

/// Expands `first` if it is an alias rather than a command. Expansions are
/// never expanded again.
fn expand_alias(
    first: &str,
    args: &[String],
    ctx: &AppContext,
) -> anyhow::Result<Option<Vec<String>>> {
    if ctx.registry.contains(first) {
        return Ok(None);
    }
    let Some(alias) = ctx.aliases().get(first) else {
        return Ok(None);
    };

    let mut expanded = shlex::split(&alias.command)
        .ok_or_else(|| anyhow!(t!("dispatch.error.alias_unparsable"), name = first))?;
    // `ellie git status` and `git status` are the same alias.
    if expanded.first().map(String::as_str) == Some(ctx.invocation_prefix()) {
        expanded.remove(0);
    }
    if expanded.is_empty() {
        return Err(anyhow!(t!("dispatch.error.alias_empty"), name = first));
    }

    log::debug!("Alias '{}' expands to {:?}", first, expanded);
    expanded.extend(args.iter().skip(1).cloned());
    Ok(Some(expanded))
}

/// Prints `outcome` the way a user should see it.
pub fn report(outcome: &DispatchOutcome, ctx: &AppContext) {
    match outcome {
        DispatchOutcome::Help => super::handlers::info::print_help(ctx),
        DispatchOutcome::Completed { .. } => {}
        DispatchOutcome::UnknownCommand { suggestions, .. }
        | DispatchOutcome::UnknownSubcommand { suggestions, .. } => {
            eprintln!("{}", outcome.to_string().red());
            print_suggestions(suggestions);
        }
        DispatchOutcome::MissingSubcommand { available, .. } => {
            eprintln!("{}", outcome.to_string().yellow());
            eprintln!("{} {}", t!("dispatch.info.available"), available.join(", ").cyan());
        }
        DispatchOutcome::InvalidUsage { .. } => {
            eprintln!("{}", outcome.to_string().yellow());
        }
        DispatchOutcome::Failed { error, .. } => {
            if is_interruption(error) {
                return;
            }
            eprintln!("\n{}: {:#}", t!("common.error").red().bold(), error);
        }
    }
}

fn print_suggestions(suggestions: &[String]) {
    match suggestions {
        [] => eprintln!("{}", t!("dispatch.info.see_help")),
        [only] => eprintln!(
            "{}",
            format!(t!("dispatch.info.did_you_mean"), name = only.cyan())
        ),
        many => {
            eprintln!("{}", t!("dispatch.info.did_you_mean_any"));
            for suggestion in many {
                eprintln!("  {}", suggestion.cyan());
            }
        }
    }
}

/// Executes automation commands by dispatching them like user input.
#[derive(Debug)]
pub struct ActionBridge<'c> {
    ctx: &'c mut AppContext,
}

impl<'c> ActionBridge<'c> {
    /// A bridge dispatching into `ctx`.
    pub fn new(ctx: &'c mut AppContext) -> Self {
        Self { ctx }
    }
}

impl ActionExecutor for ActionBridge<'_> {
    fn execute(&mut self, name: &str, args: &[String]) -> anyhow::Result<()> {
        // A task must not start (or edit) the scheduler that is running it,
        // neither directly nor through an alias.
        let expanded = expanded_args(args, self.ctx)?;
        if expanded.first().map(String::as_str) == Some(AUTOMATION_COMMAND) {
            return Err(anyhow!(t!("dispatch.error.recursive_automation"), name = name));
        }
        let outcome = run_expanded(&expanded, self.ctx);
        report(&outcome, self.ctx);
        match outcome {
            DispatchOutcome::Failed { error, .. } => Err(error),
            outcome if outcome.is_success() => Ok(()),
            outcome => Err(anyhow!(outcome.to_string())),
        }
    }
}

// MARK: --- UNIT TESTS ---
