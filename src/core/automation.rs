// src/core/automation.rs

//! Runs due automation tasks, once or on a fixed tick.
//!
//! ## Core Logic
//!
//! - **Safety gate**: a task command must start with the invocation prefix
//!   (`ellie ...`). Everything after the prefix is split shell-style and handed
//!   to an [`ActionExecutor`]. Anything else is rejected before execution.
//! - **Single pass** ([`run_due`]): every enabled task that has never been
//!   scheduled, or whose `next_run` has passed, is executed in order. The task
//!   is rescheduled whether or not it succeeded.
//! - **Daemon** ([`Daemon`]): one pass immediately, then one pass per tick until
//!   the shutdown signal flips. Passes never overlap: a tick that fires during a
//!   slow pass is skipped.

use std::time::Duration as StdDuration;

use chrono::{DateTime, Local};
use thiserror::Error;
use tokio::sync::watch;
use tokio::time::{self, MissedTickBehavior};

use crate::core::schedule;
use crate::models::AutomationData;

/// Why an automation command did not run successfully.
#[derive(Error, Debug)]
pub enum AutomationError {
    /// Nothing left to run once the prefix is removed.
    #[error("Automation command is empty.")]
    EmptyCommand,
    /// The command does not start with the invocation prefix.
    #[error("Only '{prefix}' commands are allowed in automations, got '{command}'.")]
    ForeignCommand {
        /// The required invocation prefix.
        prefix: String,
        /// The command line as displayed.
        command: String,
    },
    /// Quotes in the command do not balance.
    #[error("Automation command '{0}' has unbalanced quotes.")]
    Unparsable(String),
    /// The command ran and failed.
    #[error(transparent)]
    Execution(#[from] anyhow::Error),
}

/// Performs the work named by an automation command.
///
/// `name` is the first token after the invocation prefix; `args` is the full
/// argument list starting with `name`, mirroring shell argv.
pub trait ActionExecutor {
    /// Runs one command.
    fn execute(&mut self, name: &str, args: &[String]) -> anyhow::Result<()>;
}

impl<F> ActionExecutor for F
where
    F: FnMut(&str, &[String]) -> anyhow::Result<()>,
{
    fn execute(&mut self, name: &str, args: &[String]) -> anyhow::Result<()> {
        self(name, args)
    }
}

/// Checks a command line against the safety gate and returns its argv (prefix removed).
pub fn parse_automation_command(prefix: &str, command: &str) -> Result<Vec<String>, AutomationError> {
    let trimmed = command.trim();
    if trimmed.is_empty() {
        return Err(AutomationError::EmptyCommand);
    }

    let rest = trimmed
        .strip_prefix(prefix)
        .filter(|rest| rest.starts_with(char::is_whitespace))
        .ok_or_else(|| AutomationError::ForeignCommand {
            prefix: prefix.to_string(),
            command: trimmed.to_string(),
        })?;

    let args = shlex::split(rest).ok_or_else(|| AutomationError::Unparsable(trimmed.to_string()))?;
    if args.is_empty() {
        return Err(AutomationError::EmptyCommand);
    }
    Ok(args)
}

/// Gates `command` and, if it passes, hands it to `executor`.
/// The executor is never called for a command the gate rejects.
pub fn execute_automation_command(
    prefix: &str,
    command: &str,
    executor: &mut dyn ActionExecutor,
) -> Result<(), AutomationError> {
    let args = parse_automation_command(prefix, command)?;
    let Some(name) = args.first() else {
        return Err(AutomationError::EmptyCommand);
    };
    log::info!("Executing automation command: {} {}", prefix, args.join(" "));
    executor.execute(name, &args)?;
    Ok(())
}

/// What happened to one task during a pass.
#[derive(Debug)]
pub struct TaskOutcome {
    /// Task id.
    pub id: String,
    /// Task name.
    pub name: String,
    /// Whether the command ran successfully.
    pub result: Result<(), AutomationError>,
    /// The schedule computed after the attempt.
    pub next_run: DateTime<Local>,
}

/// The result of one [`run_due`] pass.
#[derive(Debug, Default)]
pub struct RunReport {
    /// One entry per attempted task, in file order.
    pub outcomes: Vec<TaskOutcome>,
}

impl RunReport {
    /// Number of tasks that were attempted (successfully or not).
    pub fn executed(&self) -> usize {
        self.outcomes.len()
    }

    /// Number of attempted tasks whose command failed.
    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_err()).count()
    }
}

/// Executes every due task in `data`, sequentially and in file order.
///
/// Each attempted task gets `last_run = now` and a fresh `next_run`, even when
/// its command failed or was rejected. Disabled tasks are never touched.
/// Persisting `data` afterwards is the caller's job (once per pass).
pub fn run_due(
    data: &mut AutomationData,
    prefix: &str,
    executor: &mut dyn ActionExecutor,
    now: DateTime<Local>,
) -> RunReport {
    let mut report = RunReport::default();

    for task in data.tasks.iter_mut().filter(|task| task.is_due(now)) {
        log::info!("Running automation '{}' [{}]", task.name, task.id);
        let result = execute_automation_command(prefix, &task.command, executor);
        if let Err(e) = &result {
            log::warn!("Automation '{}' failed: {}", task.name, e);
        }

        let next_run = schedule::next_run(&task.schedule, task.time_of_day(), &now);
        task.last_run = Some(now);
        task.next_run = Some(next_run);

        report.outcomes.push(TaskOutcome {
            id: task.id.clone(),
            name: task.name.clone(),
            result,
            next_run,
        });
    }

    report
}

/// The long-running scheduler loop.
#[derive(Debug, Clone, Copy)]
pub struct Daemon {
    tick: StdDuration,
}

impl Daemon {
    /// Creates a daemon with the given tick. A zero tick is raised to one millisecond.
    pub fn new(tick: StdDuration) -> Self {
        Self {
            tick: tick.max(StdDuration::from_millis(1)),
        }
    }

    /// Interval between passes.
    pub fn tick(&self) -> StdDuration {
        self.tick
    }

    /// Calls `pass` immediately and then once per tick until `shutdown` turns
    /// `true` (or its sender is dropped). A failing pass is logged and the loop
    /// keeps going. Returns how many passes ran.
    pub async fn run<F>(&self, mut pass: F, mut shutdown: watch::Receiver<bool>) -> usize
    where
        F: FnMut() -> anyhow::Result<RunReport>,
    {
        let mut ticker = time::interval(self.tick);
        // Ticks missed while a pass was running are dropped, not replayed.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut passes = 0;
        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
                _ = ticker.tick() => {}
            }

            passes += 1;
            match pass() {
                Ok(report) => log::info!(
                    "Automation pass {} finished: {} task(s) run, {} failed.",
                    passes,
                    report.executed(),
                    report.failed()
                ),
                Err(e) => log::error!("Automation pass {} failed: {:#}", passes, e),
            }
        }

        log::info!("Automation daemon stopped after {} pass(es).", passes);
        passes
    }
}

// MARK: --- UNIT TESTS ---
