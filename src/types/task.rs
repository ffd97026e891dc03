//! CopyTask - one file-level unit of copy work

use std::path::{Path, PathBuf};

/// A source file paired with the path of its mirror.
///
/// Created by the scanner and consumed by exactly one copy worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyTask {
    source: PathBuf,
    target: PathBuf,
}

impl CopyTask {
    pub fn new(source: PathBuf, target: PathBuf) -> Self {
        Self { source, target }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn target(&self) -> &Path {
        &self.target
    }
}
