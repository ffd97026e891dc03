//! Skip rules: per-path exclusions and global name / extension tokens

use crate::config::Config;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Compiled skip configuration.
///
/// A source entry is skipped when:
/// - its full path is one of the skip paths, or
/// - its file name equals a global token (`node_modules`, `Thumbs.db`), or
/// - `"*" + extension` equals a global token (`*.tmp`). The extension starts
///   at the last `.` of the name, and only counts when that `.` is not the
///   first character, so `.bashrc` has no extension.
#[derive(Debug, Clone, Default)]
pub struct SkipRules {
    paths: HashSet<PathBuf>,
    tokens: HashSet<String>,
}

impl SkipRules {
    pub fn new<P, T>(paths: P, tokens: T) -> Self
    where
        P: IntoIterator<Item = PathBuf>,
        T: IntoIterator<Item = String>,
    {
        Self {
            paths: paths.into_iter().collect(),
            tokens: tokens.into_iter().collect(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.skip_paths.iter().cloned(),
            config.skip_names.iter().cloned(),
        )
    }

    pub fn is_skipped(&self, path: &Path) -> bool {
        if self.paths.contains(path) {
            return true;
        }

        let Some(name) = path.file_name() else {
            return false;
        };
        let name = name.to_string_lossy();
        if self.tokens.contains(name.as_ref()) {
            return true;
        }

        match name.rfind('.') {
            Some(pos) if pos > 0 => self.tokens.contains(&format!("*{}", &name[pos..])),
            _ => false,
        }
    }
}
