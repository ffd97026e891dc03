//! Core type definitions for mirrorsync

mod error;
mod failure;
mod task;

pub use error::MirrorError;
pub use failure::{Failure, FailureReason};
pub use task::CopyTask;
