// src/core/aliases.rs

//! Persistence and validation for user aliases (`aliases.json`).

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use thiserror::Error;

use crate::models::AliasBook;

/// Errors from loading, saving or parsing aliases.
#[derive(Error, Debug)]
pub enum AliasError {
    /// The alias file exists but could not be read.
    #[error("Could not read alias file '{path}': {source}")]
    Read {
        /// The file or directory involved.
        path: String,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },
    /// The alias file is not valid JSON.
    #[error("Alias file '{path}' is not valid JSON: {source}")]
    Parse {
        /// The file or directory involved.
        path: String,
        /// The underlying error.
        #[source]
        source: serde_json::Error,
    },
    /// The alias file could not be written.
    #[error("Could not write alias file '{path}': {source}")]
    Write {
        /// The file or directory involved.
        path: String,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },
    /// The alias book could not be encoded.
    #[error("Failed to serialize aliases: {0}")]
    Serialize(#[from] serde_json::Error),
    /// `alias add` input without a `=`.
    #[error("Expected '<name>=<command>', got '{0}'.")]
    MalformedAssignment(String),
    /// A name with characters outside `[A-Za-z0-9_-]`.
    #[error("Alias name '{0}' may only contain letters, digits, '-' and '_'.")]
    InvalidName(String),
    /// Nothing after the `=`.
    #[error("Alias '{0}' has an empty command.")]
    EmptyCommand(String),
}

/// Loads the alias book. A missing file is an empty book.
pub fn load(path: &Path) -> Result<AliasBook, AliasError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(AliasBook::default()),
        Err(e) => {
            return Err(AliasError::Read {
                path: path.display().to_string(),
                source: e,
            });
        }
    };
    serde_json::from_str(&content).map_err(|e| AliasError::Parse {
        path: path.display().to_string(),
        source: e,
    })
}

/// Writes the alias book as pretty JSON.
pub fn save(path: &Path, book: &AliasBook) -> Result<(), AliasError> {
    let content = serde_json::to_string_pretty(book)?;
    let write_err = |e| AliasError::Write {
        path: path.display().to_string(),
        source: e,
    };
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(write_err)?;
    }
    fs::write(path, content).map_err(write_err)?;
    log::debug!("Saved {} alias(es) to '{}'.", book.aliases.len(), path.display());
    Ok(())
}

/// Splits `name=command` (surrounding quotes on the command are dropped).
pub fn parse_assignment(raw: &str) -> Result<(String, String), AliasError> {
    let (name, command) = raw
        .split_once('=')
        .ok_or_else(|| AliasError::MalformedAssignment(raw.to_string()))?;

    let name = validate_name(name)?;
    let command = command.trim();
    let command = command
        .strip_prefix('"')
        .and_then(|c| c.strip_suffix('"'))
        .or_else(|| command.strip_prefix('\'').and_then(|c| c.strip_suffix('\'')))
        .unwrap_or(command)
        .trim();

    if command.is_empty() {
        return Err(AliasError::EmptyCommand(name));
    }
    Ok((name, command.to_string()))
}

/// Trims `raw` and checks it is a usable alias name.
pub fn validate_name(raw: &str) -> Result<String, AliasError> {
    let name = raw.trim();
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(name.to_string())
    } else {
        Err(AliasError::InvalidName(name.to_string()))
    }
}

// MARK: --- UNIT TESTS ---
