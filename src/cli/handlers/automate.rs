//! # Handler for the `automate` command
//!
//! Creates, inspects and runs scheduled automation tasks.
//!
//! ## Core Logic
//!
//! - **Store access**: every subcommand loads `automations.json` in full,
//!   mutates the in-memory list and saves it back once. A corrupt file is
//!   reported, copied to `<file>.corrupt`, and treated as empty. A file that
//!   cannot be read (or backed up) is never overwritten.
//! - **Validation**: `add` and `quick` only accept commands that resolve in the
//!   registry, after alias expansion, and never the `automate` family itself.
//! - **Execution**: `run` and `daemon` hand due tasks to the runner in
//!   `core::automation`, which executes them through the dispatcher
//!   (`ActionBridge`), so a task behaves exactly like typing its command.
//! - **Daemon**: runs on a tokio runtime; Ctrl+C flips the shutdown channel and
//!   the cancellation token, which also kills a task's child process.

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Local};
use clap::Parser;
use colored::*;
use dialoguer::{Select, theme::ColorfulTheme};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio::sync::watch;
use uuid::Uuid;

use crate::cli::dispatcher::{self, ActionBridge};
use crate::cli::handlers::{parse_args, success};
use crate::cli::registry::Command;
use crate::constants::AUTOMATION_COMMAND;
use crate::core::automation::{self, Daemon, RunReport};
use crate::core::schedule;
use crate::core::task_store::{self, JsonTaskFile, StoreError, TaskRepository};
use crate::models::{AutomationData, AutomationTask, Schedule};
use crate::state::AppContext;

/// The `automate` router.
pub fn command() -> Command {
    Command::router(AUTOMATION_COMMAND)
        .about(t!("help.about.automate"))
        .subcommand(
            Command::leaf("add", add)
                .min_args(4)
                .usage("ellie automate add <name> <schedule> [--at HH:MM] [--description TEXT] <command...>"),
        )
        .subcommand(Command::leaf("list", list))
        .subcommand(
            Command::leaf("delete", delete)
                .min_args(2)
                .usage("ellie automate delete <id>"),
        )
        .subcommand(
            Command::leaf("toggle", toggle)
                .min_args(2)
                .usage("ellie automate toggle <id>"),
        )
        .subcommand(Command::leaf("run", run))
        .subcommand(Command::leaf("daemon", daemon).pre_hook(print_daemon_banner))
        .subcommand(Command::leaf("quick", quick))
}

// --- Command Argument Parsing ---

#[derive(Parser, Debug)]
#[command(no_binary_name = true, name = "automate add", about = "Schedule a new automation task.")]
struct AddArgs {
    /// Display name of the task.
    name: String,
    /// hourly, daily, weekly or @HH:MM.
    schedule: String,
    /// Time of day for a daily schedule.
    #[arg(long, value_name = "HH:MM")]
    at: Option<String>,
    /// Free-text description.
    #[arg(long, short)]
    description: Option<String>,
    /// The command to run, starting with the invocation prefix (e.g. `ellie git status`).
    #[arg(required = true, num_args = 1.., trailing_var_arg = true, allow_hyphen_values = true)]
    command: Vec<String>,
}

/// A task definition before it is stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    /// Display name.
    pub name: String,
    /// Raw schedule, validated by [`create_task`].
    pub schedule: String,
    /// `--at` value, daily schedules only.
    pub time: Option<String>,
    /// Defaults to `Runs <schedule>`.
    pub description: Option<String>,
    /// Full command line, prefix included.
    pub command: String,
}

// --- Subcommand Logic ---

fn add(args: &[String], ctx: &mut AppContext) -> Result<()> {
    let Some(parsed) = parse_args::<AddArgs>(args)? else {
        return Ok(());
    };
    let new_task = NewTask {
        name: parsed.name,
        schedule: parsed.schedule,
        time: parsed.at,
        description: parsed.description,
        command: join_command(&parsed.command),
    };
    check_command(&new_task.command, ctx)?;

    let file = ctx.task_file();
    let mut data = load_for_update(&file)?;
    let task = create_task(&mut data, new_task, ctx.invocation_prefix(), Local::now())?;
    file.save(&data)?;

    success(&format!(t!("automate.success.added"), name = task.name.cyan()));
    println!("  {:<10} {}", t!("automate.label.id").blue(), task.id);
    println!("  {:<10} {}", t!("automate.label.schedule").blue(), describe_schedule(&task));
    println!("  {:<10} {}", t!("automate.label.next_run").blue(), format_time(task.next_run));
    Ok(())
}

/// Validates `new_task`, appends it to `data` and returns a copy of the stored task.
pub fn create_task(
    data: &mut AutomationData,
    new_task: NewTask,
    prefix: &str,
    now: DateTime<Local>,
) -> Result<AutomationTask> {
    let schedule_raw = new_task.schedule.trim().to_lowercase();
    if !Schedule::is_valid(&schedule_raw) {
        return Err(anyhow!(t!("automate.error.invalid_schedule"), schedule = new_task.schedule));
    }
    let schedule = Schedule::parse(&schedule_raw);

    let time = match new_task.time.map(|t| t.trim().to_string()) {
        None => String::new(),
        Some(time) if schedule == Schedule::Daily && Schedule::is_valid(&format!("@{time}")) => {
            time
        }
        Some(time) => return Err(anyhow!(t!("automate.error.invalid_time"), time = time)),
    };

    // Refuse now what the runner would refuse later.
    let argv = automation::parse_automation_command(prefix, &new_task.command)?;
    if argv.first().map(String::as_str) == Some(AUTOMATION_COMMAND) {
        return Err(anyhow!(t!("automate.error.recursive")));
    }

    let name = new_task.name.trim().to_string();
    if name.is_empty() {
        return Err(anyhow!(t!("automate.error.empty_name")));
    }

    let mut task = AutomationTask {
        id: generate_id(now),
        name,
        command: new_task.command.trim().to_string(),
        description: new_task
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| format!("Runs {}", schedule)),
        schedule,
        time,
        enabled: true,
        last_run: None,
        next_run: None,
    };
    task.next_run = Some(schedule::next_run(&task.schedule, task.time_of_day(), &now));
    log::debug!("Created automation task {:?}", task);

    data.tasks.push(task.clone());
    Ok(task)
}

/// Checks that need the live context: after alias expansion the command must
/// resolve in the registry and must not reach the `automate` family.
fn check_command(command: &str, ctx: &AppContext) -> Result<()> {
    let argv = automation::parse_automation_command(ctx.invocation_prefix(), command)?;
    let expanded = dispatcher::expanded_args(&argv, ctx)?;
    if expanded.first().map(String::as_str) == Some(AUTOMATION_COMMAND) {
        return Err(anyhow!(t!("automate.error.recursive")));
    }
    match ctx.registry.lookup(&expanded) {
        Ok(resolution) if resolution.args.len() >= resolution.command.min_args => Ok(()),
        resolved => {
            log::debug!("Automation command '{}' is not runnable: {:?}", command, resolved);
            Err(anyhow!(t!("automate.error.unresolved"), command = command))
        }
    }
}

/// Loads the store for a change that will be saved. Refuses when saving would
/// destroy the only copy of the existing file.
fn load_for_update(file: &JsonTaskFile) -> Result<AutomationData> {
    match task_store::load_or_recover(file) {
        (data, None) => Ok(data),
        (data, Some(StoreError::Parse { .. })) if file.backup_path().exists() => Ok(data),
        (_, Some(e)) => Err(anyhow::Error::new(e).context(t!("automate.error.store_unusable"))),
    }
}

/// `auto_<unix seconds>_<8 random hex chars>`.
fn generate_id(now: DateTime<Local>) -> String {
    let random: String = Uuid::new_v4().simple().to_string().chars().take(8).collect();
    format!("auto_{}_{}", now.timestamp(), random)
}

/// One token is taken verbatim (`"ellie git status"`); several are re-quoted.
fn join_command(parts: &[String]) -> String {
    match parts {
        [single] => single.clone(),
        _ => shlex::try_join(parts.iter().map(String::as_str)).unwrap_or_else(|_| parts.join(" ")),
    }
}

fn list(_args: &[String], ctx: &mut AppContext) -> Result<()> {
    let (data, _) = task_store::load_or_recover(&ctx.task_file());
    if data.tasks.is_empty() {
        println!("\n{}", t!("automate.info.no_tasks"));
        println!("{}", t!("automate.info.add_hint").dimmed());
        return Ok(());
    }

    let now = Local::now();
    println!("\n{}", t!("automate.info.header").yellow().bold());
    for task in &data.tasks {
        let status = if task.enabled {
            "●".green()
        } else {
            "○".red()
        };
        println!("\n  {} {} {}", status, task.name.bold(), format!("[{}]", task.id).dimmed());
        if !task.description.is_empty() {
            println!("    {}", task.description.dimmed());
        }
        println!("    {:<10} {}", t!("automate.label.command").blue(), task.command.cyan());
        println!("    {:<10} {}", t!("automate.label.schedule").blue(), describe_schedule(task));
        println!(
            "    {:<10} {} {}",
            t!("automate.label.next_run").blue(),
            format_time(task.next_run),
            countdown(task.next_run, now).dimmed()
        );
        println!("    {:<10} {}", t!("automate.label.last_run").blue(), format_time(task.last_run));
    }
    Ok(())
}

fn delete(args: &[String], ctx: &mut AppContext) -> Result<()> {
    let id = args.get(1).map(String::as_str).unwrap_or_default();
    let file = ctx.task_file();
    let mut data = load_for_update(&file)?;
    let removed = data
        .remove(id)
        .ok_or_else(|| anyhow!(t!("automate.error.not_found"), id = id))?;
    file.save(&data)?;
    success(&format!(t!("automate.success.deleted"), name = removed.name.cyan()));
    Ok(())
}

fn toggle(args: &[String], ctx: &mut AppContext) -> Result<()> {
    let id = args.get(1).map(String::as_str).unwrap_or_default();
    let file = ctx.task_file();
    let mut data = load_for_update(&file)?;
    let enabled = data
        .toggle(id)
        .ok_or_else(|| anyhow!(t!("automate.error.not_found"), id = id))?;
    file.save(&data)?;
    let state = if enabled {
        t!("automate.state.enabled").green()
    } else {
        t!("automate.state.disabled").red()
    };
    success(&format!(t!("automate.success.toggled"), id = id, state = state));
    Ok(())
}

/// One pass over the store: execute what is due, reschedule it, save once.
fn run_pass(ctx: &mut AppContext) -> Result<RunReport> {
    let file = ctx.task_file();
    let mut data = load_for_update(&file)?;
    let prefix = ctx.invocation_prefix().to_string();
    let report = {
        let mut bridge = ActionBridge::new(ctx);
        automation::run_due(&mut data, &prefix, &mut bridge, Local::now())
    };
    if report.executed() > 0 {
        file.save(&data)
            .with_context(|| t!("automate.error.save_failed"))?;
    }
    Ok(report)
}

fn run(_args: &[String], ctx: &mut AppContext) -> Result<()> {
    let report = run_pass(ctx)?;
    if report.executed() == 0 {
        println!("{}", t!("automate.info.nothing_due"));
        return Ok(());
    }

    for outcome in &report.outcomes {
        match &outcome.result {
            Ok(()) => println!("  {} {}", "✔".green(), outcome.name),
            Err(e) => println!("  {} {}: {}", "✖".red(), outcome.name, e.to_string().red()),
        }
    }
    println!(
        "\n{}",
        format!(
            t!("automate.info.pass_summary"),
            executed = report.executed(),
            failed = report.failed()
        )
    );
    Ok(())
}

fn print_daemon_banner() {
    println!("{}", t!("automate.daemon.banner").green().bold());
    println!("{}", t!("automate.daemon.stop_hint").dimmed());
}

fn daemon(_args: &[String], ctx: &mut AppContext) -> Result<()> {
    let tick = Duration::from_secs(ctx.settings.tick_seconds.max(1));
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start the async runtime")?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let token = Arc::clone(&ctx.cancellation_token);

    let passes = runtime.block_on(async {
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                log::info!("Ctrl+C received, stopping the automation daemon.");
                token.store(true, Ordering::SeqCst);
                shutdown_tx.send(true).ok();
            }
        });

        Daemon::new(tick)
            .run(
                || {
                    let report = run_pass(ctx)?;
                    if report.executed() > 0 {
                        println!(
                            "[{}] {}",
                            Local::now().format("%Y-%m-%d %H:%M:%S"),
                            format!(
                                t!("automate.info.pass_summary"),
                                executed = report.executed(),
                                failed = report.failed()
                            )
                        );
                    }
                    Ok(report)
                },
                shutdown_rx,
            )
            .await
    });

    println!("\n{}", format!(t!("automate.daemon.stopped"), passes = passes).yellow());
    Ok(())
}

/// A ready-made task offered by `automate quick`.
struct Preset {
    label: &'static str,
    name: &'static str,
    schedule: &'static str,
    command: &'static str,
    description: &'static str,
}

const PRESETS: &[Preset] = &[
    Preset {
        label: t!("automate.quick.health"),
        name: "Daily Health Check",
        schedule: "@09:00",
        command: "ellie run uptime",
        description: "Daily system health check",
    },
    Preset {
        label: t!("automate.quick.git"),
        name: "Hourly Git Check",
        schedule: "hourly",
        command: "ellie git status",
        description: "Check git status every hour",
    },
    Preset {
        label: t!("automate.quick.disk"),
        name: "Daily Disk Check",
        schedule: "@23:00",
        command: "ellie run df -h",
        description: "Check disk usage every night",
    },
    Preset {
        label: t!("automate.quick.update"),
        name: "Weekly Fetch",
        schedule: "weekly",
        command: "ellie git fetch",
        description: "Fetch remote changes every week",
    },
];

fn quick(_args: &[String], ctx: &mut AppContext) -> Result<()> {
    let mut items: Vec<&str> = PRESETS.iter().map(|preset| preset.label).collect();
    items.push(t!("automate.quick.all"));

    let selection = Select::with_theme(&ColorfulTheme::default())
        .with_prompt(t!("automate.quick.prompt"))
        .items(&items)
        .default(0)
        .interact()?;

    let chosen: Vec<&Preset> = match PRESETS.get(selection) {
        Some(preset) => vec![preset],
        None => PRESETS.iter().collect(),
    };

    let file = ctx.task_file();
    let mut data = load_for_update(&file)?;
    let now = Local::now();
    for preset in chosen {
        // Presets use the default prefix; rewrite it for a custom one.
        let command = match preset.command.strip_prefix("ellie ") {
            Some(rest) => format!("{} {}", ctx.invocation_prefix(), rest),
            None => preset.command.to_string(),
        };
        check_command(&command, ctx)?;
        let task = create_task(
            &mut data,
            NewTask {
                name: preset.name.to_string(),
                schedule: preset.schedule.to_string(),
                time: None,
                description: Some(preset.description.to_string()),
                command,
            },
            ctx.invocation_prefix(),
            now,
        )?;
        success(&format!(t!("automate.success.added"), name = task.name.cyan()));
    }
    file.save(&data)?;
    Ok(())
}

// --- Helper Functions ---

fn describe_schedule(task: &AutomationTask) -> String {
    match task.time_of_day() {
        Some(time) if task.schedule == Schedule::Daily => format!("{} at {}", task.schedule, time),
        _ => task.schedule.to_string(),
    }
}

fn format_time(time: Option<DateTime<Local>>) -> String {
    time.map_or_else(
        || t!("automate.info.never").to_string(),
        |t| t.format("%Y-%m-%d %H:%M").to_string(),
    )
}

/// `(in 2h 5m)`, `(due now)` or empty when unscheduled.
fn countdown(next_run: Option<DateTime<Local>>, now: DateTime<Local>) -> String {
    let Some(next_run) = next_run else {
        return String::new();
    };
    let remaining = next_run.signed_duration_since(now);
    if remaining.num_seconds() <= 0 {
        return format!("({})", t!("automate.info.due_now"));
    }
    let days = remaining.num_days();
    let hours = remaining.num_hours() % 24;
    let minutes = remaining.num_minutes() % 60;
    if days > 0 {
        format!("(in {}d {}h)", days, hours)
    } else if hours > 0 {
        format!("(in {}h {}m)", hours, minutes)
    } else {
        format!("(in {}m)", minutes.max(1))
    }
}

// MARK: --- UNIT TESTS ---

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::dispatcher::{self, DispatchOutcome};
    use crate::cli::handlers::build_registry;
    use crate::core::automation::AutomationError;
    use crate::core::paths::ConfigPaths;
    use crate::models::{AliasBook, Settings};
    use chrono::TimeZone;
    use std::sync::atomic::AtomicBool;
    use tempfile::tempdir;

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    fn context(dir: &std::path::Path) -> AppContext {
        AppContext::new(
            Settings::default(),
            ConfigPaths::in_dir(dir),
            Arc::new(build_registry()),
            AliasBook::default(),
            Arc::new(AtomicBool::new(false)),
        )
    }

    fn new_task(schedule: &str, time: Option<&str>, command: &str) -> NewTask {
        NewTask {
            name: "backup".to_string(),
            schedule: schedule.to_string(),
            time: time.map(str::to_string),
            description: None,
            command: command.to_string(),
        }
    }

    fn now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap()
    }

    #[test]
    fn test_create_task_fills_defaults() {
        let mut data = AutomationData::default();
        let task = create_task(&mut data, new_task("Hourly", None, "ellie git status"), "ellie", now())
            .unwrap();

        assert!(task.id.starts_with(&format!("auto_{}_", now().timestamp())));
        assert_eq!(task.id.len(), format!("auto_{}_", now().timestamp()).len() + 8);
        assert_eq!(task.schedule, Schedule::Hourly);
        assert_eq!(task.description, "Runs hourly");
        assert!(task.enabled);
        assert!(task.last_run.is_none());
        assert_eq!(task.next_run, Some(now() + chrono::Duration::hours(1)));
        assert_eq!(data.tasks.len(), 1);
    }

    #[test]
    fn test_daily_with_time_is_scheduled_for_that_time() {
        let mut data = AutomationData::default();
        let task = create_task(&mut data, new_task("daily", Some("09:00"), "ellie greet"), "ellie", now())
            .unwrap();
        assert_eq!(task.time, "09:00");
        assert_eq!(task.next_run, Local.with_ymd_and_hms(2024, 1, 2, 9, 0, 0).single());
    }

    #[test]
    fn test_create_task_rejects_bad_input() {
        let mut data = AutomationData::default();
        assert!(create_task(&mut data, new_task("monthly", None, "ellie greet"), "ellie", now()).is_err());
        assert!(create_task(&mut data, new_task("@9", None, "ellie greet"), "ellie", now()).is_err());
        assert!(
            create_task(&mut data, new_task("hourly", Some("09:00"), "ellie greet"), "ellie", now())
                .is_err()
        );
        assert!(
            create_task(&mut data, new_task("daily", None, "ellie automate run"), "ellie", now())
                .is_err()
        );

        let err = create_task(&mut data, new_task("hourly", None, "rm -rf /"), "ellie", now())
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AutomationError>(),
            Some(AutomationError::ForeignCommand { .. })
        ));
        assert!(data.tasks.is_empty());
    }

    #[test]
    fn test_join_command() {
        assert_eq!(join_command(&argv(&["ellie git status"])), "ellie git status");
        assert_eq!(
            join_command(&argv(&["ellie", "run", "echo", "two words"])),
            "ellie run echo 'two words'"
        );
    }

    #[test]
    fn test_countdown_formatting() {
        let now = now();
        assert_eq!(countdown(None, now), "");
        assert_eq!(countdown(Some(now - chrono::Duration::minutes(1)), now), "(due now)");
        assert_eq!(countdown(Some(now + chrono::Duration::minutes(125)), now), "(in 2h 5m)");
        assert_eq!(countdown(Some(now + chrono::Duration::seconds(30)), now), "(in 1m)");
        assert_eq!(countdown(Some(now + chrono::Duration::hours(50)), now), "(in 2d 2h)");
    }

    #[test]
    fn test_add_toggle_delete_through_the_dispatcher() {
        let dir = tempdir().unwrap();
        let mut ctx = context(dir.path());

        let outcome = dispatcher::run(
            &argv(&["automate", "add", "greeter", "hourly", "--description", "say hi", "ellie", "greet"]),
            &mut ctx,
        );
        assert!(outcome.is_success(), "{outcome}");

        let file = ctx.task_file();
        let data = file.load().unwrap();
        let task = data.tasks.first().unwrap().clone();
        assert_eq!(task.command, "ellie greet");
        assert_eq!(task.description, "say hi");

        assert!(dispatcher::run(&argv(&["automate", "toggle", task.id.as_str()]), &mut ctx).is_success());
        assert!(!file.load().unwrap().tasks.first().unwrap().enabled);

        assert!(dispatcher::run(&argv(&["automate", "delete", task.id.as_str()]), &mut ctx).is_success());
        assert!(file.load().unwrap().tasks.is_empty());

        assert!(matches!(
            dispatcher::run(&argv(&["automate", "delete", "auto_missing"]), &mut ctx),
            DispatchOutcome::Failed { .. }
        ));
    }

    #[test]
    fn test_add_with_too_few_args_shows_usage() {
        let dir = tempdir().unwrap();
        let mut ctx = context(dir.path());
        let outcome = dispatcher::run(&argv(&["automate", "add", "x", "hourly"]), &mut ctx);
        assert!(matches!(outcome, DispatchOutcome::InvalidUsage { .. }));
        assert!(!ctx.paths.automations_file.exists());
    }

    #[test]
    fn test_run_pass_executes_due_tasks_and_saves() {
        let dir = tempdir().unwrap();
        let mut ctx = context(dir.path());
        let file = ctx.task_file();

        let mut data = AutomationData::default();
        create_task(&mut data, new_task("hourly", None, "ellie version"), "ellie", now()).unwrap();
        create_task(&mut data, new_task("hourly", None, "ellie nope"), "ellie", now()).unwrap();
        // Far in the future: not due.
        let mut later = new_task("weekly", None, "ellie version");
        later.name = "later".to_string();
        create_task(&mut data, later, "ellie", Local::now() + chrono::Duration::days(30)).unwrap();
        file.save(&data).unwrap();

        let report = run_pass(&mut ctx).unwrap();
        assert_eq!(report.executed(), 2);
        assert_eq!(report.failed(), 1);

        let saved = file.load().unwrap();
        let (due, not_due) = saved.tasks.split_at(2);
        assert!(due.iter().all(|t| t.last_run.is_some() && t.next_run > t.last_run));
        assert!(not_due.iter().all(|t| t.last_run.is_none()));
    }

    #[test]
    fn test_run_pass_with_nothing_due_leaves_file_untouched() {
        let dir = tempdir().unwrap();
        let mut ctx = context(dir.path());
        let report = run_pass(&mut ctx).unwrap();
        assert_eq!(report.executed(), 0);
        assert!(!ctx.paths.automations_file.exists());
    }

    #[test]
    fn test_add_rejects_commands_that_do_not_resolve() {
        let dir = tempdir().unwrap();
        let mut ctx = context(dir.path());
        let outcome = dispatcher::run(&argv(&["automate", "add", "x", "hourly", "ellie", "nope"]), &mut ctx);
        assert!(matches!(outcome, DispatchOutcome::Failed { .. }));
        let outcome = dispatcher::run(&argv(&["automate", "add", "x", "hourly", "ellie", "git"]), &mut ctx);
        assert!(matches!(outcome, DispatchOutcome::Failed { .. }));
        let outcome = dispatcher::run(&argv(&["automate", "add", "x", "hourly", "ellie", "run"]), &mut ctx);
        assert!(matches!(outcome, DispatchOutcome::Failed { .. }));
        assert!(!ctx.paths.automations_file.exists());
    }

    #[test]
    fn test_alias_to_automate_is_rejected_when_added() {
        let dir = tempdir().unwrap();
        let mut ctx = context(dir.path());
        ctx.aliases_mut().upsert("ar", "ellie automate run");

        let outcome = dispatcher::run(&argv(&["automate", "add", "loop", "hourly", "ellie", "ar"]), &mut ctx);
        assert!(matches!(outcome, DispatchOutcome::Failed { .. }));
        assert!(!ctx.paths.automations_file.exists());
    }

    #[test]
    fn test_alias_to_automate_fails_the_task_instead_of_recursing() {
        let dir = tempdir().unwrap();
        let mut ctx = context(dir.path());
        let file = ctx.task_file();

        // Stored before the alias existed, so add-time checks never saw it.
        let mut data = AutomationData::default();
        create_task(&mut data, new_task("hourly", None, "ellie ar"), "ellie", now()).unwrap();
        data.tasks.first_mut().unwrap().next_run = None;
        file.save(&data).unwrap();
        ctx.aliases_mut().upsert("ar", "automate run");

        let report = run_pass(&mut ctx).unwrap();
        assert_eq!(report.executed(), 1);
        assert_eq!(report.failed(), 1);
        let saved = file.load().unwrap();
        let task = saved.tasks.first().unwrap();
        assert!(task.last_run.is_some());
        assert!(task.next_run > task.last_run);
    }

    #[test]
    fn test_corrupt_store_is_backed_up_before_it_is_replaced() {
        let dir = tempdir().unwrap();
        let mut ctx = context(dir.path());
        let file = ctx.task_file();
        let original = b"{\"tasks\": [{\"id\": \"keep\", \"name\": \"caf\xe9\"}]}".to_vec();
        std::fs::write(file.path(), &original).unwrap();

        let outcome = dispatcher::run(&argv(&["automate", "add", "x", "hourly", "ellie", "greet"]), &mut ctx);
        assert!(outcome.is_success(), "{outcome}");
        assert_eq!(std::fs::read(file.backup_path()).unwrap(), original);
        assert_eq!(file.load().unwrap().tasks.len(), 1);
    }

    #[test]
    fn test_unreadable_store_is_left_alone() {
        let dir = tempdir().unwrap();
        let mut ctx = context(dir.path());
        std::fs::create_dir(&ctx.paths.automations_file).unwrap();

        let outcome = dispatcher::run(&argv(&["automate", "add", "x", "hourly", "ellie", "greet"]), &mut ctx);
        assert!(matches!(outcome, DispatchOutcome::Failed { .. }));
        assert!(run_pass(&mut ctx).is_err());
        assert!(ctx.paths.automations_file.is_dir());
    }

    #[test]
    fn test_every_preset_is_a_runnable_command() {
        let dir = tempdir().unwrap();
        let ctx = context(dir.path());
        let mut data = AutomationData::default();
        for preset in PRESETS {
            check_command(preset.command, &ctx).unwrap();
            let task = NewTask {
                name: preset.name.to_string(),
                schedule: preset.schedule.to_string(),
                time: None,
                description: Some(preset.description.to_string()),
                command: preset.command.to_string(),
            };
            create_task(&mut data, task, "ellie", now()).unwrap();
        }
        assert_eq!(data.tasks.len(), PRESETS.len());
    }

    #[tokio::test]
    async fn test_daemon_passes_share_the_saved_store() {
        let dir = tempdir().unwrap();
        let mut ctx = context(dir.path());
        let file = ctx.task_file();

        let mut data = AutomationData::default();
        create_task(&mut data, new_task("hourly", None, "ellie version"), "ellie", now()).unwrap();
        data.tasks.first_mut().unwrap().next_run = None;
        file.save(&data).unwrap();

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let mut executed = Vec::new();
        let passes = Daemon::new(Duration::from_millis(5))
            .run(
                || {
                    let report = run_pass(&mut ctx)?;
                    executed.push(report.executed());
                    if executed.len() == 2 {
                        shutdown_tx.send(true).ok();
                    }
                    Ok(report)
                },
                shutdown_rx,
            )
            .await;

        // The first pass saved the new schedule, so the second finds nothing due.
        assert_eq!(passes, 2);
        assert_eq!(executed, vec![1, 0]);
        let saved = file.load().unwrap();
        let task = saved.tasks.first().unwrap();
        let last_run = task.last_run.unwrap();
        assert_eq!(task.next_run, Some(last_run + chrono::Duration::hours(1)));
    }

    #[test]
    fn test_unknown_automate_subcommand_is_suggested() {
        let dir = tempdir().unwrap();
        let mut ctx = context(dir.path());
        match dispatcher::run(&argv(&["automate", "lsit"]), &mut ctx) {
            DispatchOutcome::UnknownSubcommand { suggestions, .. } => {
                assert_eq!(suggestions.first().map(String::as_str), Some("list"));
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }
}
