//! Failure - a non-fatal error recorded during a mirror run

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Why an entry could not be mirrored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// Source entry vanished between listing and visiting
    SourceMissing,
    /// Source directory exists but its children could not be listed
    SourceUnlistable,
    /// A target entry of the wrong type could not be replaced, or a target
    /// directory could not be created
    TargetConflict,
    /// Source file could not be opened for reading
    CopySourceUnreadable,
    /// Target file could not be created for writing
    CopyTargetUnwritable,
    /// Read, write or metadata error in the middle of a copy
    #[serde(rename = "copy_io_error")]
    CopyIoError,
    /// Obsolete target entry could not be removed
    ObsoleteDeleteFailure,
    /// The scanner thread panicked
    UnexpectedScanError,
    /// A copy task panicked
    UnexpectedCopyError,
}

impl FailureReason {
    /// Human readable description used in reports.
    pub fn description(&self) -> &'static str {
        match self {
            FailureReason::SourceMissing => "Source file does not exist",
            FailureReason::SourceUnlistable => "Could not list source directory, is this a link?",
            FailureReason::TargetConflict => "Could not replace or create target entry",
            FailureReason::CopySourceUnreadable => "Source file not found or is unreadable",
            FailureReason::CopyTargetUnwritable => "Target file could not be opened for writing",
            FailureReason::CopyIoError => "Problem while copying file contents",
            FailureReason::ObsoleteDeleteFailure => "Could not remove obsolete target entry",
            FailureReason::UnexpectedScanError => "Unexpected error while scanning",
            FailureReason::UnexpectedCopyError => "Unexpected error during file copy",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// A recorded failure: reason, optional path, optional cause.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    pub reason: FailureReason,
    pub path: Option<PathBuf>,
    /// Rendered underlying cause (io error text, panic message)
    pub cause: Option<String>,
}

impl Failure {
    pub fn new(reason: FailureReason, path: impl Into<PathBuf>) -> Self {
        Self {
            reason,
            path: Some(path.into()),
            cause: None,
        }
    }

    /// Failure with no associated path.
    pub fn bare(reason: FailureReason) -> Self {
        Self {
            reason,
            path: None,
            cause: None,
        }
    }

    /// Attach the underlying cause.
    pub fn with_cause(mut self, cause: impl fmt::Display) -> Self {
        self.cause = Some(cause.to_string());
        self
    }

    /// Shorthand for the common `path + io::Error` case.
    pub fn io(reason: FailureReason, path: &Path, error: &std::io::Error) -> Self {
        Self::new(reason, path).with_cause(error)
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Failure: {}", self.reason)?;
        if let Some(path) = &self.path {
            write!(f, " {}", path.display())?;
        }
        if let Some(cause) = &self.cause {
            write!(f, " ({})", cause)?;
        }
        Ok(())
    }
}
