// src/state.rs

//! The application context handed to every handler.

use anyhow::{Context, Result};
use std::sync::Arc;

use crate::CancellationToken;
use crate::cli::registry::Registry;
use crate::core::aliases::{self, AliasError};
use crate::core::fuzzy::Matcher;
use crate::core::paths::{self, ConfigPaths};
use crate::core::settings;
use crate::core::task_store::JsonTaskFile;
use crate::models::{AliasBook, Settings};

/// Tracks whether the alias book was modified since it was loaded.
#[derive(Debug)]
enum AliasState {
    /// No mutation has been requested yet.
    Pristine(AliasBook),
    /// Mutable access was handed out. `original` is the snapshot taken at that moment.
    Dirty {
        original: AliasBook,
        current: AliasBook,
    },
}

/// Everything a handler may need, owned explicitly and passed down by the dispatcher.
#[derive(Debug)]
pub struct AppContext {
    /// Normalized `config.toml`.
    pub settings: Settings,
    /// Resolved file locations.
    pub paths: ConfigPaths,
    /// The command tree, shared with the dispatcher.
    pub registry: Arc<Registry>,
    /// Set on Ctrl+C; child processes and the daemon stop when they see it.
    pub cancellation_token: CancellationToken,
    aliases: AliasState,
}

impl AppContext {
    /// A context over already loaded parts.
    pub fn new(
        settings: Settings,
        paths: ConfigPaths,
        registry: Arc<Registry>,
        aliases: AliasBook,
        cancellation_token: CancellationToken,
    ) -> Self {
        Self {
            settings,
            paths,
            registry,
            cancellation_token,
            aliases: AliasState::Pristine(aliases),
        }
    }

    /// Builds the context from the config directory: settings (created on
    /// first run), file locations and the alias book.
    pub fn load(registry: Arc<Registry>, cancellation_token: CancellationToken) -> Result<Self> {
        let config_dir = paths::get_config_dir()?;
        let settings_file = ConfigPaths::in_dir(&config_dir).settings_file;
        let settings = settings::load_or_create(&settings_file)?;
        let paths = ConfigPaths::in_dir(config_dir)
            .with_automations_file(settings.automations_file.as_deref())
            .context("Invalid 'automations_file' in settings")?;

        // A broken alias file must not lock the user out of every other command.
        let aliases = aliases::load(&paths.aliases_file).unwrap_or_else(|e| {
            log::error!("{}", e);
            AliasBook::default()
        });

        Ok(Self::new(settings, paths, registry, aliases, cancellation_token))
    }

    /// Read access; does not mark the book as changed.
    pub fn aliases(&self) -> &AliasBook {
        match &self.aliases {
            AliasState::Pristine(book) => book,
            AliasState::Dirty { current, .. } => current,
        }
    }

    /// Mutable access to the alias book. The first call snapshots the book so
    /// [`Self::needs_saving`] can tell whether anything actually changed.
    pub fn aliases_mut(&mut self) -> &mut AliasBook {
        if let AliasState::Pristine(book) = &mut self.aliases {
            let book = std::mem::take(book);
            self.aliases = AliasState::Dirty {
                original: book.clone(),
                current: book,
            };
        }
        match &mut self.aliases {
            AliasState::Dirty { current, .. } => current,
            AliasState::Pristine(book) => book,
        }
    }

    /// Whether the alias book differs from what was loaded.
    pub fn needs_saving(&self) -> bool {
        match &self.aliases {
            AliasState::Pristine(_) => false,
            AliasState::Dirty { original, current } => original != current,
        }
    }

    /// Writes the alias book if it changed, then treats the written state as pristine.
    pub fn save(&mut self) -> Result<(), AliasError> {
        if !self.needs_saving() {
            return Ok(());
        }
        aliases::save(&self.paths.aliases_file, self.aliases())?;
        let book = std::mem::take(self.aliases_mut());
        self.aliases = AliasState::Pristine(book);
        Ok(())
    }

    /// The automation store.
    pub fn task_file(&self) -> JsonTaskFile {
        JsonTaskFile::new(&self.paths.automations_file)
    }

    /// A matcher using the configured suggestion distance.
    pub fn matcher(&self) -> Matcher {
        Matcher::new(self.settings.suggestion_distance)
    }

    /// The token every automation command must start with.
    pub fn invocation_prefix(&self) -> &str {
        &self.settings.invocation_prefix
    }
}

// MARK: --- UNIT TESTS ---

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;
    use tempfile::tempdir;

    fn context(dir: &std::path::Path) -> AppContext {
        AppContext::new(
            Settings::default(),
            ConfigPaths::in_dir(dir),
            Arc::new(Registry::default()),
            AliasBook::default(),
            Arc::new(AtomicBool::new(false)),
        )
    }

    #[test]
    fn test_read_access_keeps_state_pristine() {
        let dir = tempdir().unwrap();
        let ctx = context(dir.path());
        assert!(ctx.aliases().is_empty());
        assert!(!ctx.needs_saving());
    }

    #[test]
    fn test_mutation_without_change_does_not_need_saving() {
        let dir = tempdir().unwrap();
        let mut ctx = context(dir.path());
        ctx.aliases_mut().remove("missing");
        assert!(!ctx.needs_saving());
    }

    #[test]
    fn test_save_writes_only_changes_and_resets() {
        let dir = tempdir().unwrap();
        let mut ctx = context(dir.path());
        ctx.aliases_mut().upsert("gs", "git status");
        assert!(ctx.needs_saving());

        ctx.save().unwrap();
        assert!(!ctx.needs_saving());
        assert_eq!(ctx.aliases().get("gs").unwrap().command, "git status");
        let stored = aliases::load(&ctx.paths.aliases_file).unwrap();
        assert_eq!(&stored, ctx.aliases());
    }
}
