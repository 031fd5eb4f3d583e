// src/cli/registry.rs

//! The command tree.
//!
//! Every node is a [`Command`]: either a leaf with a handler, or a router that
//! holds subcommands (and optionally a default handler used when the next token
//! is not one of them). Resolution walks the tree one token per level, so the
//! same rules apply at every depth.

use anyhow::Result;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::state::AppContext;

/// Receives the argv of the resolved level (`args[0]` is the command's own name).
pub type Handler = Arc<dyn Fn(&[String], &mut AppContext) -> Result<()> + Send + Sync>;

/// Side effect run after validation and before the handler.
pub type PreHook = Arc<dyn Fn() + Send + Sync>;

/// What a node does once it is resolved.
pub enum CommandKind {
    /// Runs `handler`.
    Leaf {
        /// Called with the argv of this level.
        handler: Handler,
    },
    /// Descends into `subcommands`, falling back to `default_handler` when the
    /// next token is not one of them.
    Router {
        /// Children keyed by name.
        subcommands: BTreeMap<String, Command>,
        /// Runs when no child matches. Without it, a miss is an error.
        default_handler: Option<Handler>,
    },
}

/// One node of the command tree.
pub struct Command {
    /// The token that selects this node.
    pub name: String,
    /// Minimum length of the argv at this level, command name included.
    pub min_args: usize,
    /// Shown when the argv is too short.
    pub usage: String,
    /// One-line description for `ellie help`.
    pub about: String,
    /// Runs after validation, before any handler on the path below it.
    pub pre_hook: Option<PreHook>,
    /// Leaf or router.
    pub kind: CommandKind,
}

impl Command {
    /// A node that runs `handler`.
    pub fn leaf<F>(name: &str, handler: F) -> Self
    where
        F: Fn(&[String], &mut AppContext) -> Result<()> + Send + Sync + 'static,
    {
        Self::with_kind(
            name,
            CommandKind::Leaf {
                handler: Arc::new(handler),
            },
        )
    }

    /// A node with no children yet and no default handler.
    pub fn router(name: &str) -> Self {
        Self::with_kind(
            name,
            CommandKind::Router {
                subcommands: BTreeMap::new(),
                default_handler: None,
            },
        )
    }

    fn with_kind(name: &str, kind: CommandKind) -> Self {
        Self {
            name: name.to_string(),
            min_args: 0,
            usage: String::new(),
            about: String::new(),
            pre_hook: None,
            kind,
        }
    }

    /// Sets the minimum argv length, counting the command name.
    pub fn min_args(mut self, min_args: usize) -> Self {
        self.min_args = min_args;
        self
    }

    /// Sets the usage line shown on invalid input.
    pub fn usage(mut self, usage: &str) -> Self {
        self.usage = usage.to_string();
        self
    }

    /// Sets the help text.
    pub fn about(mut self, about: &str) -> Self {
        self.about = about.to_string();
        self
    }

    /// Sets the hook that runs before the handler.
    pub fn pre_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.pre_hook = Some(Arc::new(hook));
        self
    }

    /// Adds a child. A leaf that gains a child becomes a router whose default
    /// handler is its former handler.
    pub fn subcommand(mut self, child: Self) -> Self {
        match &mut self.kind {
            CommandKind::Router { subcommands, .. } => {
                subcommands.insert(child.name.clone(), child);
            }
            CommandKind::Leaf { handler } => {
                let handler = Arc::clone(handler);
                let mut subcommands = BTreeMap::new();
                subcommands.insert(child.name.clone(), child);
                self.kind = CommandKind::Router {
                    subcommands,
                    default_handler: Some(handler),
                };
            }
        }
        self
    }

    /// Sets the handler that runs when no subcommand matches (or, on a leaf, replaces it).
    pub fn default_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&[String], &mut AppContext) -> Result<()> + Send + Sync + 'static,
    {
        let handler: Handler = Arc::new(handler);
        match &mut self.kind {
            CommandKind::Router {
                default_handler, ..
            } => *default_handler = Some(handler),
            CommandKind::Leaf { handler: current } => *current = handler,
        }
        self
    }

    /// The function to call once this node is resolved, if any.
    pub fn handler(&self) -> Option<&Handler> {
        match &self.kind {
            CommandKind::Leaf { handler } => Some(handler),
            CommandKind::Router {
                default_handler, ..
            } => default_handler.as_ref(),
        }
    }

    /// Children of a router, `None` for a leaf.
    pub fn subcommands(&self) -> Option<&BTreeMap<String, Self>> {
        match &self.kind {
            CommandKind::Leaf { .. } => None,
            CommandKind::Router { subcommands, .. } => Some(subcommands),
        }
    }

    /// The child called `name`.
    pub fn find_subcommand(&self, name: &str) -> Option<&Self> {
        self.subcommands()?.get(name)
    }

    /// Child names in sorted order. Empty for a leaf.
    pub fn subcommand_names(&self) -> Vec<String> {
        self.subcommands()
            .map(|subs| subs.keys().cloned().collect())
            .unwrap_or_default()
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("min_args", &self.min_args)
            .field("usage", &self.usage)
            .field("has_pre_hook", &self.pre_hook.is_some())
            .field("has_handler", &self.handler().is_some())
            .field("subcommands", &self.subcommand_names())
            .finish()
    }
}

/// Why a token sequence did not resolve to a runnable command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    /// No tokens at all.
    Empty,
    /// The first token is not a registered command.
    UnknownCommand {
        /// The token as typed.
        name: String,
        /// Every top-level name.
        candidates: Vec<String>,
    },
    /// `parent` is the full path of the router, e.g. `git`.
    UnknownSubcommand {
        /// Path of the router that did not know `name`.
        parent: String,
        /// The token as typed.
        name: String,
        /// The router's subcommand names.
        candidates: Vec<String>,
    },
    /// A router without a default handler was given no further token.
    MissingSubcommand {
        /// Path of the router.
        parent: String,
        /// The router's subcommand names.
        candidates: Vec<String>,
    },
}

/// A successful lookup.
#[derive(Debug)]
pub struct Resolution<'r, 'a> {
    /// The deepest node the tokens reached.
    pub command: &'r Command,
    /// Every node from the top-level command down to `command`.
    pub path: Vec<&'r Command>,
    /// Argv from the resolved level on, starting with the command's name.
    pub args: &'a [String],
}

impl Resolution<'_, '_> {
    /// `git status`, `automate add`, ...
    pub fn qualified_name(&self) -> String {
        qualified_name(&self.path)
    }
}

fn qualified_name(path: &[&Command]) -> String {
    path.iter()
        .map(|command| command.name.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

/// The top level of the command tree.
#[derive(Default)]
pub struct Registry {
    commands: BTreeMap<String, Command>,
}

impl Registry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) a top-level command.
    pub fn register(&mut self, command: Command) {
        self.commands.insert(command.name.clone(), command);
    }

    /// Builder form of [`Registry::register`].
    pub fn with(mut self, command: Command) -> Self {
        self.register(command);
        self
    }

    /// The top-level command called `name`.
    pub fn get(&self, name: &str) -> Option<&Command> {
        self.commands.get(name)
    }

    /// Whether `name` is a top-level command.
    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    /// Top-level names in sorted order.
    pub fn names(&self) -> Vec<String> {
        self.commands.keys().cloned().collect()
    }

    /// Top-level commands in name order.
    pub fn commands(&self) -> impl Iterator<Item = &Command> {
        self.commands.values()
    }

    /// Resolves `segments` to a command, descending into subcommands while the
    /// next token names one.
    pub fn lookup<'r, 'a>(&'r self, segments: &'a [String]) -> Result<Resolution<'r, 'a>, LookupError> {
        let Some(first) = segments.first() else {
            return Err(LookupError::Empty);
        };
        let Some(mut command) = self.commands.get(first) else {
            return Err(LookupError::UnknownCommand {
                name: first.clone(),
                candidates: self.names(),
            });
        };

        let mut path = vec![command];
        let mut depth = 0;

        while let Some(subcommands) = command.subcommands() {
            let has_default = command.handler().is_some();
            match segments.get(depth + 1) {
                Some(next) => match subcommands.get(next) {
                    Some(child) => {
                        command = child;
                        path.push(child);
                        depth += 1;
                    }
                    None if has_default => break,
                    None => {
                        return Err(LookupError::UnknownSubcommand {
                            parent: qualified_name(&path),
                            name: next.clone(),
                            candidates: command.subcommand_names(),
                        });
                    }
                },
                None if has_default => break,
                None => {
                    return Err(LookupError::MissingSubcommand {
                        parent: qualified_name(&path),
                        candidates: command.subcommand_names(),
                    });
                }
            }
        }

        Ok(Resolution {
            command,
            path,
            args: segments.get(depth..).unwrap_or_default(),
        })
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.commands.values()).finish()
    }
}

// MARK: --- UNIT TESTS ---
