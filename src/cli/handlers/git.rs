// src/cli/handlers/git.rs

//! `ellie git <subcommand>`: thin wrappers that shell out to `git`.

use anyhow::{Context, Result};

use crate::cli::registry::Command;
use crate::state::AppContext;
use crate::system::executor;

/// Subcommand name, the fixed arguments passed to git before the user's own, and its help line.
const GIT_COMMANDS: &[(&str, &[&str], &str)] = &[
    ("status", &["status", "--short", "--branch"], t!("git.about.status")),
    ("pull", &["pull"], t!("git.about.pull")),
    ("push", &["push"], t!("git.about.push")),
    ("fetch", &["fetch", "--prune"], t!("git.about.fetch")),
    (
        "log",
        &["log", "--oneline", "--graph", "--decorate", "-n", "15"],
        t!("git.about.log"),
    ),
    ("diff", &["diff", "--stat"], t!("git.about.diff")),
    ("branch", &["branch", "-vv"], t!("git.about.branch")),
];

/// The `git` router, one passthrough leaf per entry of `GIT_COMMANDS`.
pub fn command() -> Command {
    GIT_COMMANDS
        .iter()
        .fold(Command::router("git").about(t!("help.about.git")), |git, &(name, fixed, about)| {
            git.subcommand(Command::leaf(name, passthrough(fixed)).about(about))
        })
}

/// Builds a handler running `git <fixed...> <user args...>`.
fn passthrough(
    fixed: &'static [&'static str],
) -> impl Fn(&[String], &mut AppContext) -> Result<()> + Send + Sync + 'static {
    move |args: &[String], ctx: &mut AppContext| -> Result<()> {
        let git_args = git_args(fixed, args);
        executor::execute_program("git", &git_args, &ctx.cancellation_token)
            .with_context(|| t!("git.error.failed"))
    }
}

fn git_args(fixed: &[&str], args: &[String]) -> Vec<String> {
    fixed
        .iter()
        .map(|s| s.to_string())
        .chain(args.iter().skip(1).cloned())
        .collect()
}

// MARK: --- UNIT TESTS ---

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_args_follow_the_fixed_ones() {
        let args = vec!["log".to_string(), "--author=ada".to_string()];
        assert_eq!(
            git_args(&["log", "--oneline"], &args),
            vec!["log", "--oneline", "--author=ada"]
        );
    }

    #[test]
    fn test_router_exposes_every_subcommand() {
        let git = command();
        assert_eq!(
            git.subcommand_names(),
            vec!["branch", "diff", "fetch", "log", "pull", "push", "status"]
        );
        assert!(git.handler().is_none());
    }
}
