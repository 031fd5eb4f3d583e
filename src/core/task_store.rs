// src/core/task_store.rs

//! Whole-file JSON persistence for automation tasks.
//!
//! The document is read in full on load and overwritten in full on save. There
//! is no cross-process locking: if two processes load, modify, and save, the
//! last save wins.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::constants::AUTOMATIONS_FILE_MODE;
use crate::models::AutomationData;

/// Errors from the automation task file.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The file exists but could not be read.
    #[error("Could not read automation file '{path}': {source}")]
    Read {
        /// The file or directory involved.
        path: String,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },
    /// The file is not a valid automation document.
    #[error("Automation file '{path}' is not valid JSON: {source}")]
    Parse {
        /// The file or directory involved.
        path: String,
        /// The underlying error.
        #[source]
        source: serde_json::Error,
    },
    /// The file could not be written.
    #[error("Could not write automation file '{path}': {source}")]
    Write {
        /// The file or directory involved.
        path: String,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },
    /// The tasks could not be encoded.
    #[error("Failed to serialize automations: {0}")]
    Serialize(#[from] serde_json::Error),
}

type StoreResult<T> = Result<T, StoreError>;

/// Where automation tasks live. The runner and the `automate` handlers only
/// talk to this trait, so tests can swap the file for memory.
pub trait TaskRepository {
    /// Loads the full task list. A store that does not exist yet is empty, not an error.
    fn load(&self) -> StoreResult<AutomationData>;
    /// Replaces the stored task list with `data`.
    fn save(&self, data: &AutomationData) -> StoreResult<()>;
}

/// The on-disk `automations.json` document.
#[derive(Debug, Clone)]
pub struct JsonTaskFile {
    path: PathBuf,
}

impl JsonTaskFile {
    /// A store backed by `path`. Nothing is read until [`TaskRepository::load`].
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The document's location.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Where a corrupt document is copied: `<file>.corrupt`.
    pub fn backup_path(&self) -> PathBuf {
        let mut backup = self.path.clone().into_os_string();
        backup.push(".corrupt");
        PathBuf::from(backup)
    }

    /// Copies an unparsable document to [`Self::backup_path`] so the next save
    /// does not destroy the only copy.
    fn preserve_corrupt_copy(&self) -> Option<PathBuf> {
        let backup = self.backup_path();
        match fs::copy(&self.path, &backup) {
            Ok(_) => Some(backup),
            Err(e) => {
                log::warn!(
                    "Could not back up corrupt automation file '{}': {}",
                    self.path.display(),
                    e
                );
                None
            }
        }
    }
}

impl TaskRepository for JsonTaskFile {
    fn load(&self) -> StoreResult<AutomationData> {
        // Bytes, not a String: bad encoding is a parse error like any other.
        let content = match fs::read(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::debug!(
                    "No automation file at '{}', starting empty.",
                    self.path.display()
                );
                return Ok(AutomationData::default());
            }
            Err(e) => {
                return Err(StoreError::Read {
                    path: self.path.display().to_string(),
                    source: e,
                });
            }
        };

        serde_json::from_slice(&content).map_err(|e| StoreError::Parse {
            path: self.path.display().to_string(),
            source: e,
        })
    }

    fn save(&self, data: &AutomationData) -> StoreResult<()> {
        // serde_json's pretty printer indents with two spaces.
        let content = serde_json::to_string_pretty(data)?;
        let write_err = |e| StoreError::Write {
            path: self.path.display().to_string(),
            source: e,
        };

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(write_err)?;
        }

        let mut file = open_private(&self.path).map_err(write_err)?;
        file.write_all(content.as_bytes()).map_err(write_err)?;
        restrict_permissions(&self.path).map_err(write_err)?;
        log::debug!(
            "Saved {} automation task(s) to '{}'.",
            data.tasks.len(),
            self.path.display()
        );
        Ok(())
    }
}

/// Loads the store, treating a corrupt or unreadable file as empty.
///
/// The failure is logged and returned alongside the data so callers can tell
/// the user. A corrupt file is first copied to `<file>.corrupt`.
pub fn load_or_recover(file: &JsonTaskFile) -> (AutomationData, Option<StoreError>) {
    match file.load() {
        Ok(data) => (data, None),
        Err(e) => {
            log::error!("{}", e);
            if matches!(e, StoreError::Parse { .. })
                && let Some(backup) = file.preserve_corrupt_copy()
            {
                log::warn!("Corrupt automation file preserved at '{}'.", backup.display());
            }
            (AutomationData::default(), Some(e))
        }
    }
}

#[cfg(unix)]
fn open_private(path: &Path) -> std::io::Result<fs::File> {
    use std::os::unix::fs::OpenOptionsExt;
    fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(AUTOMATIONS_FILE_MODE)
        .open(path)
}

#[cfg(not(unix))]
fn open_private(path: &Path) -> std::io::Result<fs::File> {
    fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
}

/// `mode()` only applies when the file is created; tighten pre-existing files too.
#[cfg(unix)]
fn restrict_permissions(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(AUTOMATIONS_FILE_MODE))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

// MARK: --- UNIT TESTS ---

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AutomationTask, Schedule};
    use chrono::{Local, TimeZone};
    use tempfile::tempdir;

    fn sample_data() -> AutomationData {
        AutomationData {
            tasks: vec![
                AutomationTask {
                    id: "auto_1".to_string(),
                    name: "Daily Health Check".to_string(),
                    command: "ellie health".to_string(),
                    schedule: Schedule::At("09:00".to_string()),
                    time: String::new(),
                    enabled: true,
                    last_run: None,
                    next_run: Local.with_ymd_and_hms(2024, 1, 2, 9, 0, 0).single(),
                    description: "Daily system health check".to_string(),
                },
                AutomationTask {
                    id: "auto_2".to_string(),
                    name: "Hourly Git Check".to_string(),
                    command: "ellie git status".to_string(),
                    schedule: Schedule::Hourly,
                    time: String::new(),
                    enabled: false,
                    last_run: Local.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).single(),
                    next_run: Local.with_ymd_and_hms(2024, 1, 1, 13, 0, 0).single(),
                    description: String::new(),
                },
            ],
        }
    }

    #[test]
    fn test_missing_file_loads_empty() {
        let dir = tempdir().unwrap();
        let file = JsonTaskFile::new(dir.path().join("automations.json"));
        assert_eq!(file.load().unwrap(), AutomationData::default());
    }

    #[test]
    fn test_save_then_load_returns_same_tasks() {
        let dir = tempdir().unwrap();
        let file = JsonTaskFile::new(dir.path().join("automations.json"));
        let data = sample_data();
        file.save(&data).unwrap();
        assert_eq!(file.load().unwrap(), data);
    }

    #[test]
    fn test_repeated_save_is_byte_identical() {
        let dir = tempdir().unwrap();
        let file = JsonTaskFile::new(dir.path().join("automations.json"));
        file.save(&sample_data()).unwrap();

        file.save(&file.load().unwrap()).unwrap();
        let first = fs::read(file.path()).unwrap();
        file.save(&file.load().unwrap()).unwrap();
        let second = fs::read(file.path()).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_saved_document_layout() {
        let dir = tempdir().unwrap();
        let file = JsonTaskFile::new(dir.path().join("automations.json"));
        file.save(&sample_data()).unwrap();
        let content = fs::read_to_string(file.path()).unwrap();

        assert!(content.starts_with("{\n  \"tasks\": [\n    {\n      \"id\": \"auto_1\","));
        let keys = [
            "\"id\"", "\"name\"", "\"command\"", "\"schedule\"", "\"time\"", "\"enabled\"",
            "\"last_run\"", "\"next_run\"", "\"description\"",
        ];
        let positions: Vec<usize> = keys.iter().map(|k| content.find(k).unwrap()).collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
        assert!(content.contains("\"last_run\": \"0001-01-01T00:00:00Z\""));
    }

    #[cfg(unix)]
    #[test]
    fn test_file_is_private() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempdir().unwrap();
        let path = dir.path().join("automations.json");
        fs::write(&path, "{\"tasks\": []}").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();

        JsonTaskFile::new(&path).save(&sample_data()).unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
    }

    #[test]
    fn test_zero_timestamps_and_nanoseconds_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("automations.json");
        fs::write(
            &path,
            r#"{
  "tasks": [
    {
      "id": "auto_1700000000",
      "name": "backup",
      "command": "ellie run echo hi",
      "schedule": "daily",
      "time": "",
      "enabled": true,
      "last_run": "0001-01-01T00:00:00Z",
      "next_run": "2023-11-15T22:13:20.123456789+01:00",
      "description": "Runs daily"
    }
  ]
}"#,
        )
        .unwrap();
        let data = JsonTaskFile::new(&path).load().unwrap();
        let task = &data.tasks[0];
        assert_eq!(task.schedule, Schedule::Daily);
        assert!(task.last_run.is_none());
        assert_eq!(task.next_run.unwrap().timestamp_subsec_nanos(), 123_456_789);
    }

    #[test]
    fn test_corrupt_file_is_an_error_and_recovers_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("automations.json");
        fs::write(&path, "{ not json").unwrap();
        let file = JsonTaskFile::new(&path);

        assert!(matches!(file.load(), Err(StoreError::Parse { .. })));

        let (data, error) = load_or_recover(&file);
        assert!(data.tasks.is_empty());
        assert!(matches!(error, Some(StoreError::Parse { .. })));
        let backup = dir.path().join("automations.json.corrupt");
        assert_eq!(fs::read_to_string(backup).unwrap(), "{ not json");
    }

    #[test]
    fn test_invalid_utf8_is_a_parse_error_with_backup() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("automations.json");
        let original = b"{\"tasks\": [{\"id\": \"keep\", \"description\": \"caf\xe9\"}]}".to_vec();
        fs::write(&path, &original).unwrap();
        let file = JsonTaskFile::new(&path);

        assert!(matches!(file.load(), Err(StoreError::Parse { .. })));
        let (data, error) = load_or_recover(&file);
        assert!(data.tasks.is_empty());
        assert!(matches!(error, Some(StoreError::Parse { .. })));
        assert_eq!(fs::read(file.backup_path()).unwrap(), original);
    }
}
