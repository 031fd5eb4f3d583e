//! The command-line surface: argv parsing, the command tree, the dispatcher and
//! the handlers behind each command.

use clap::Parser;

pub mod dispatcher;
pub mod handlers;
pub mod registry;

/// Renders the semantic help template (`<title>`, `<cmd>`, ...) with or
/// without ANSI styling, depending on whether colors are enabled.
pub fn render_help_template() -> String {
    let use_colors = colored::control::SHOULD_COLORIZE.should_colorize();

    let title = if use_colors { "\x1b[1;33m" } else { "" }; // Bold Yellow
    let hl = if use_colors { "\x1b[1;36m" } else { "" }; // Bold Cyan
    let cmd = if use_colors { "\x1b[36m" } else { "" }; // Cyan
    let dim = if use_colors { "\x1b[2m" } else { "" };
    let reset = if use_colors { "\x1b[0m" } else { "" };

    t!("cli.help.template")
        .replace("<title>", title)
        .replace("</title>", reset)
        .replace("<hl>", hl)
        .replace("</hl>", reset)
        .replace("<cmd>", cmd)
        .replace("</cmd>", reset)
        .replace("<dim>", dim)
        .replace("</dim>", reset)
}

fn build_help_string() -> &'static str {
    Box::leak(render_help_template().into_boxed_str())
}

/// ellie: a personal command-line assistant.
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about,
    help_template = { build_help_string() },
)]
#[command(disable_help_subcommand = true)]
pub struct Cli {
    /// The command and its arguments, handed to the dispatcher untouched.
    #[arg(trailing_var_arg = true)]
    pub args: Vec<String>,
}

// MARK: --- UNIT TESTS ---
