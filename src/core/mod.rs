// src/core/mod.rs

//! Logic with no terminal I/O: matching, scheduling, persistence.

pub mod aliases;
pub mod automation;
pub mod fuzzy;
pub mod paths;
pub mod schedule;
pub mod settings;
pub mod task_store;
