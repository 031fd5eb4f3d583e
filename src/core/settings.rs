// src/core/settings.rs

//! Loads `config.toml`, writing a default one on first run.

use std::env;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use thiserror::Error;

use crate::constants::DEFAULT_INVOCATION_PREFIX;
use crate::models::Settings;

/// Errors loading or saving `config.toml`.
#[derive(Error, Debug)]
pub enum SettingsError {
    /// `config.toml` exists but could not be read.
    #[error("Could not read settings file '{path}': {source}")]
    Read {
        /// The file or directory involved.
        path: String,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },
    /// `config.toml` is not valid TOML.
    #[error("Settings file '{path}' is not valid TOML: {source}")]
    Parse {
        /// The file or directory involved.
        path: String,
        /// The underlying error.
        #[source]
        source: toml::de::Error,
    },
    /// `config.toml` could not be written.
    #[error("Could not write settings file '{path}': {source}")]
    Write {
        /// The file or directory involved.
        path: String,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },
    /// The settings could not be encoded.
    #[error("Failed to serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Reads the settings at `path`. A missing file is created with defaults.
pub fn load_or_create(path: &Path) -> Result<Settings, SettingsError> {
    match fs::read_to_string(path) {
        Ok(content) => {
            let settings: Settings =
                toml::from_str(&content).map_err(|e| SettingsError::Parse {
                    path: path.display().to_string(),
                    source: e,
                })?;
            Ok(normalize(settings))
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            let settings = Settings::default();
            save(path, &settings)?;
            log::info!("Created default settings at '{}'.", path.display());
            Ok(settings)
        }
        Err(e) => Err(SettingsError::Read {
            path: path.display().to_string(),
            source: e,
        }),
    }
}

/// Writes `settings` as pretty TOML.
pub fn save(path: &Path, settings: &Settings) -> Result<(), SettingsError> {
    let content = toml::to_string_pretty(settings)?;
    let write_err = |e| SettingsError::Write {
        path: path.display().to_string(),
        source: e,
    };
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(write_err)?;
    }
    fs::write(path, content).map_err(write_err)
}

/// Clamps values a hand-edited file could get wrong.
fn normalize(mut settings: Settings) -> Settings {
    if settings.tick_seconds < 1 {
        log::warn!("tick_seconds must be at least 1, using 1.");
        settings.tick_seconds = 1;
    }
    let prefix = settings.invocation_prefix.trim();
    if prefix.is_empty() || prefix.contains(char::is_whitespace) {
        log::warn!(
            "Invalid invocation_prefix '{}', using '{}'.",
            settings.invocation_prefix,
            DEFAULT_INVOCATION_PREFIX
        );
        settings.invocation_prefix = DEFAULT_INVOCATION_PREFIX.to_string();
    } else if prefix.len() != settings.invocation_prefix.len() {
        settings.invocation_prefix = prefix.to_string();
    }
    settings
}

/// The name used to address the user: `username` from the settings, then
/// `$USER` / `$USERNAME`, then a neutral fallback.
pub fn display_name(settings: &Settings) -> String {
    let configured = settings.username.trim();
    if !configured.is_empty() {
        return configured.to_string();
    }
    ["USER", "USERNAME"]
        .iter()
        .filter_map(|key| env::var(key).ok())
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
        .unwrap_or_else(|| "friend".to_string())
}

// MARK: --- UNIT TESTS ---
