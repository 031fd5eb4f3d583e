// src/constants.rs

//! File names, environment variables and defaults.

/// The name of the configuration directory (inside the platform config dir).
pub const CONFIG_DIR_NAME: &str = "ellie";

/// Environment variable that overrides the configuration directory.
pub const CONFIG_DIR_ENV: &str = "ELLIE_CONFIG_DIR";

/// The name of the settings file (inside the config dir).
pub const SETTINGS_FILENAME: &str = "config.toml";

/// The name of the automation task file (inside the config dir).
pub const AUTOMATIONS_FILENAME: &str = "automations.json";

/// The name of the alias book file (inside the config dir).
pub const ALIASES_FILENAME: &str = "aliases.json";

/// Every automation command must start with this token.
pub const DEFAULT_INVOCATION_PREFIX: &str = "ellie";

/// Seconds between two daemon passes.
pub const DEFAULT_TICK_SECONDS: u64 = 60;

/// Largest edit distance still offered as a "did you mean" suggestion.
pub const DEFAULT_SUGGESTION_DISTANCE: usize = 2;

/// The command family that owns the scheduler. Automations may not call back into it.
pub const AUTOMATION_COMMAND: &str = "automate";

/// Unix permission bits for the automation file. Commands may embed secrets.
pub const AUTOMATIONS_FILE_MODE: u32 = 0o600;
