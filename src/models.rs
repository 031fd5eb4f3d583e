// src/models.rs

//! Serializable records: automation tasks, aliases and settings.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::{
    DEFAULT_INVOCATION_PREFIX, DEFAULT_SUGGESTION_DISTANCE, DEFAULT_TICK_SECONDS,
};

// --- AUTOMATION MODELS (automations.json) ---

/// Recurrence of an automation task.
///
/// Stored as a plain string so files written by older versions, or edited by
/// hand, always load. Anything unrecognised is kept verbatim in `Other` and
/// scheduled with the hourly fallback.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(from = "String", into = "String")]
pub enum Schedule {
    /// One hour after each run.
    Hourly,
    /// Once a day, at `time` when the task sets one.
    Daily,
    /// Seven days after each run.
    Weekly,
    /// `@HH:MM`: every day at a fixed time. Holds the text after the `@`.
    At(String),
    /// Not a known schedule.
    Other(String),
}

impl Schedule {
    /// Parses a schedule string. Never fails; see [`Schedule::is_valid`] for the
    /// check applied when a user creates a task.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "hourly" => Self::Hourly,
            "daily" => Self::Daily,
            "weekly" => Self::Weekly,
            _ => match raw.strip_prefix('@') {
                Some(time) => Self::At(time.to_string()),
                None => Self::Other(raw.to_string()),
            },
        }
    }

    /// Accepts `hourly`, `daily`, `weekly`, or `@` followed by exactly five
    /// characters. The time part itself is parsed leniently later on.
    pub fn is_valid(raw: &str) -> bool {
        matches!(raw, "hourly" | "daily" | "weekly") || (raw.starts_with('@') && raw.len() == 6)
    }
}

impl From<String> for Schedule {
    fn from(raw: String) -> Self {
        Self::parse(&raw)
    }
}

impl From<Schedule> for String {
    fn from(schedule: Schedule) -> Self {
        schedule.to_string()
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hourly => f.write_str("hourly"),
            Self::Daily => f.write_str("daily"),
            Self::Weekly => f.write_str("weekly"),
            Self::At(time) => write!(f, "@{}", time),
            Self::Other(raw) => f.write_str(raw),
        }
    }
}

/// One scheduled job.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AutomationTask {
    /// `auto_<unix seconds>_<8 hex>`.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Full command line, invocation prefix included.
    pub command: String,
    /// How often the task runs.
    pub schedule: Schedule,
    /// `HH:MM`, only meaningful for `daily`. Empty when unset.
    #[serde(default)]
    pub time: String,
    /// Disabled tasks are skipped by every pass.
    pub enabled: bool,
    /// When the task was last attempted.
    #[serde(default, with = "zero_time")]
    pub last_run: Option<DateTime<Local>>,
    /// Unset means due on the next pass.
    #[serde(default, with = "zero_time")]
    pub next_run: Option<DateTime<Local>>,
    /// Free text for `automate list`.
    #[serde(default)]
    pub description: String,
}

impl AutomationTask {
    /// The explicit time-of-day qualifier, if one was set.
    pub fn time_of_day(&self) -> Option<&str> {
        let trimmed = self.time.trim();
        if trimmed.is_empty() { None } else { Some(trimmed) }
    }

    /// A task is due when it is enabled and has never been scheduled, or its
    /// next run is strictly in the past.
    pub fn is_due(&self, now: DateTime<Local>) -> bool {
        self.enabled && self.next_run.is_none_or(|next| now > next)
    }
}

/// The whole automation document. It is always read and written as one unit.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct AutomationData {
    /// Tasks in creation order.
    #[serde(default)]
    pub tasks: Vec<AutomationTask>,
}

impl AutomationData {
    /// The task with `id`.
    pub fn find(&self, id: &str) -> Option<&AutomationTask> {
        self.tasks.iter().find(|task| task.id == id)
    }

    /// Removes the task with `id`, returning it if it existed.
    pub fn remove(&mut self, id: &str) -> Option<AutomationTask> {
        let position = self.tasks.iter().position(|task| task.id == id)?;
        Some(self.tasks.remove(position))
    }

    /// Flips the `enabled` flag of the task with `id` and returns the new value.
    pub fn toggle(&mut self, id: &str) -> Option<bool> {
        let task = self.tasks.iter_mut().find(|task| task.id == id)?;
        task.enabled = !task.enabled;
        Some(task.enabled)
    }
}

/// Timestamps are written as RFC 3339. An unset timestamp is written as the
/// zero instant `0001-01-01T00:00:00Z`, and any year-1 (or earlier) value reads
/// back as unset.
mod zero_time {
    use chrono::{DateTime, Datelike, Local, SecondsFormat};
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    const ZERO: &str = "0001-01-01T00:00:00Z";

    pub(super) fn serialize<S>(value: &Option<DateTime<Local>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(dt) => serializer.serialize_str(&dt.to_rfc3339_opts(SecondsFormat::AutoSi, false)),
            None => serializer.serialize_str(ZERO),
        }
    }

    pub(super) fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Local>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        let Some(raw) = raw else {
            return Ok(None);
        };
        if raw.is_empty() {
            return Ok(None);
        }
        let parsed = DateTime::parse_from_rfc3339(&raw).map_err(D::Error::custom)?;
        if parsed.year() <= 1 {
            return Ok(None);
        }
        Ok(Some(parsed.with_timezone(&Local)))
    }
}

// --- ALIAS MODELS (aliases.json) ---

/// A user-defined shortcut: `name` expands to `command` at dispatch time.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Alias {
    /// The token typed in place of a command.
    pub name: String,
    /// What it expands to.
    pub command: String,
}

/// The persisted list of aliases, kept in insertion order.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(transparent)]
pub struct AliasBook {
    /// Every alias.
    pub aliases: Vec<Alias>,
}

impl AliasBook {
    /// The alias called `name`.
    pub fn get(&self, name: &str) -> Option<&Alias> {
        self.aliases.iter().find(|alias| alias.name == name)
    }

    /// Inserts or replaces an alias. Returns `true` when an existing one was replaced.
    pub fn upsert(&mut self, name: &str, command: &str) -> bool {
        if let Some(existing) = self.aliases.iter_mut().find(|alias| alias.name == name) {
            existing.command = command.to_string();
            return true;
        }
        self.aliases.push(Alias {
            name: name.to_string(),
            command: command.to_string(),
        });
        false
    }

    /// Removes an alias. Returns `false` if no alias had that name.
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.aliases.len();
        self.aliases.retain(|alias| alias.name != name);
        self.aliases.len() != before
    }

    /// Whether no alias is defined.
    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}

// --- SETTINGS (config.toml) ---

/// User settings read from `config.toml`. Every field has a default, so a
/// partial file is fine.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Display name used by `greet` and `whoami`. Empty means "use `$USER`".
    pub username: String,
    /// First token every automation command must carry.
    pub invocation_prefix: String,
    /// Seconds between daemon passes.
    pub tick_seconds: u64,
    /// Largest edit distance offered as a suggestion for unknown commands.
    pub suggestion_distance: usize,
    /// Overrides the automation file location. `~` and `$VARS` are expanded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub automations_file: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            username: String::new(),
            invocation_prefix: DEFAULT_INVOCATION_PREFIX.to_string(),
            tick_seconds: DEFAULT_TICK_SECONDS,
            suggestion_distance: DEFAULT_SUGGESTION_DISTANCE,
            automations_file: None,
        }
    }
}
