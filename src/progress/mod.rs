//! Run progress tracking

mod tracker;

pub use tracker::{ProgressSnapshot, Tracker};
