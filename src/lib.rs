//! # mirrorsync - Incremental backup mirroring
//!
//! Mirrors one or more source trees into a target root. A scanner thread
//! walks the sources and queues stale files; a pool of copy workers drains
//! the queue. Target entries without a source counterpart can be removed
//! along the way. Per-file problems never abort a run: they are collected
//! as [`Failure`] records on the progress tracker.

pub mod commands;
pub mod config;
pub mod engine;
pub mod executor;
pub mod logging;
pub mod progress;
pub mod scanner;
pub mod types;
pub mod ui;

pub use config::{Config, ConfigFile};
pub use engine::Engine;
pub use progress::ProgressSnapshot;
pub use types::{CopyTask, Failure, FailureReason, MirrorError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
