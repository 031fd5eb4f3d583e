//! # ellie
//!
//! A personal command-line assistant. The library holds the command tree and
//! dispatcher, the automation scheduler, and the small persistence layer both
//! of them lean on. The `ellie` binary is a thin shell around [`cli::dispatcher`].

include!(concat!(env!("OUT_DIR"), "/translations.rs"));

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

/// Shared flag that long-running work (child processes, the daemon) polls to stop early.
pub type CancellationToken = Arc<AtomicBool>;

pub mod cli;
pub mod constants;
pub mod core;
pub mod models;
pub mod state;
pub mod system;
