// src/core/paths.rs

//! Where ellie keeps its files.

use lazy_static::lazy_static;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use thiserror::Error;

use crate::constants::{
    ALIASES_FILENAME, AUTOMATIONS_FILENAME, CONFIG_DIR_ENV, CONFIG_DIR_NAME, SETTINGS_FILENAME,
};

lazy_static! {
    static ref ELLIE_CONFIG_DIR: Mutex<Option<PathBuf>> = Mutex::new(None);
}

/// Errors resolving where ellie keeps its files.
#[derive(Error, Debug)]
pub enum PathError {
    /// The platform has no config directory.
    #[error("Could not find system config directory.")]
    ConfigDirNotFound,
    /// The config directory could not be created.
    #[error("Could not create config directory at '{path}': {source}")]
    ConfigDirCreation {
        /// The file or directory involved.
        path: String,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },
    /// A `~` or `$VAR` in a configured path could not be expanded.
    #[error("Could not expand path '{template}': {source}")]
    Expansion {
        /// The path as configured.
        template: String,
        /// The underlying error.
        #[source]
        source: shellexpand::LookupError<env::VarError>,
    },
}

/// Returns the Ellie configuration directory, creating it if needed.
///
/// `$ELLIE_CONFIG_DIR` wins over the platform directory (`~/.config/ellie`).
/// The result is memoized: later calls return the cached path even if the
/// environment changed in between.
pub fn get_config_dir() -> Result<PathBuf, PathError> {
    let mut cached = ELLIE_CONFIG_DIR
        .lock()
        .unwrap_or_else(PoisonError::into_inner);

    if let Some(path) = &*cached {
        return Ok(path.clone());
    }

    let config_path = match env::var_os(CONFIG_DIR_ENV).filter(|v| !v.is_empty()) {
        Some(dir) => PathBuf::from(dir),
        None => dirs::config_dir()
            .ok_or(PathError::ConfigDirNotFound)?
            .join(CONFIG_DIR_NAME),
    };
    ensure_dir(&config_path)?;
    log::debug!("Using config directory '{}'.", config_path.display());

    *cached = Some(config_path.clone());
    Ok(config_path)
}

/// Creates `dir` (and its parents) if it does not exist yet.
pub fn ensure_dir(dir: &Path) -> Result<(), PathError> {
    if dir.is_dir() {
        return Ok(());
    }
    fs::create_dir_all(dir).map_err(|e| PathError::ConfigDirCreation {
        path: dir.display().to_string(),
        source: e,
    })
}

/// Expands `~` and environment variables in a user-supplied path.
pub fn expand_path(template: &str) -> Result<PathBuf, PathError> {
    let expanded = shellexpand::full(template).map_err(|e| PathError::Expansion {
        template: template.to_string(),
        source: e,
    })?;
    Ok(PathBuf::from(expanded.into_owned()))
}

/// Every file Ellie reads or writes, resolved once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigPaths {
    /// The directory itself.
    pub config_dir: PathBuf,
    /// `config.toml`.
    pub settings_file: PathBuf,
    /// The task store, `automations.json` unless overridden.
    pub automations_file: PathBuf,
    /// `aliases.json`.
    pub aliases_file: PathBuf,
}

impl ConfigPaths {
    /// The default layout: every file directly inside `dir`.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        let config_dir = dir.into();
        Self {
            settings_file: config_dir.join(SETTINGS_FILENAME),
            automations_file: config_dir.join(AUTOMATIONS_FILENAME),
            aliases_file: config_dir.join(ALIASES_FILENAME),
            config_dir,
        }
    }

    /// Points the automation store at a user-chosen location, if one is set.
    pub fn with_automations_file(mut self, template: Option<&str>) -> Result<Self, PathError> {
        if let Some(template) = template.map(str::trim).filter(|t| !t.is_empty()) {
            self.automations_file = expand_path(template)?;
        }
        Ok(self)
    }
}

// MARK: --- UNIT TESTS ---

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_layout_is_flat() {
        let paths = ConfigPaths::in_dir("/tmp/ellie-test");
        assert_eq!(paths.settings_file, PathBuf::from("/tmp/ellie-test/config.toml"));
        assert_eq!(
            paths.automations_file,
            PathBuf::from("/tmp/ellie-test/automations.json")
        );
        assert_eq!(paths.aliases_file, PathBuf::from("/tmp/ellie-test/aliases.json"));
    }

    #[test]
    fn test_automations_override_expands_home() {
        let home = dirs::home_dir().unwrap();
        let paths = ConfigPaths::in_dir("/tmp/ellie-test")
            .with_automations_file(Some("~/tasks.json"))
            .unwrap();
        assert_eq!(paths.automations_file, home.join("tasks.json"));
    }

    #[test]
    fn test_blank_override_keeps_default() {
        let paths = ConfigPaths::in_dir("/tmp/ellie-test")
            .with_automations_file(Some("   "))
            .unwrap();
        assert_eq!(
            paths.automations_file,
            PathBuf::from("/tmp/ellie-test/automations.json")
        );
    }

    #[test]
    fn test_unknown_variable_is_an_error() {
        let result = expand_path("$ELLIE_SURELY_UNDEFINED_VARIABLE_42/tasks.json");
        assert!(matches!(result, Err(PathError::Expansion { .. })));
    }

    #[test]
    fn test_ensure_dir_creates_nested_directories() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        ensure_dir(&nested).unwrap();
        assert!(nested.is_dir());
        // Second call is a no-op.
        ensure_dir(&nested).unwrap();
    }
}
