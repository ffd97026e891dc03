//! Terminal output

mod progress;

pub use progress::{format_status, ProgressReporter};
