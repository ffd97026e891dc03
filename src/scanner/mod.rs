//! Source tree scanning: path mapping, skip rules and the recursive walker

mod mapper;
mod skip;
mod walker;

pub use mapper::{distinct_roots, mirror_path, prepare_mirror_root};
pub use skip::SkipRules;
pub use walker::{Scanner, ShouldExist};
