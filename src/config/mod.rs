//! Configuration management

mod cli;

pub use cli::{Cli, Command, SyncArgs};

use crate::types::MirrorError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Environment variable overriding the config file location.
pub const CONFIG_ENV_VAR: &str = "MIRRORSYNC_CONFIG";

/// Default timestamp leniency in milliseconds.
pub const DEFAULT_LENIENCY_MS: u64 = 50;

/// One mirror configuration: which trees to copy, and where.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Source roots, files or directories, in scan order
    pub sources: Vec<PathBuf>,

    /// Target root directory
    pub target: PathBuf,

    /// Ancestor at which mirrored paths start (None = full absolute path)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub virtual_root: Option<PathBuf>,

    /// Delete target entries with no source counterpart
    pub remove_obsolete: bool,

    /// Maximum mtime difference still treated as equal
    pub timestamp_leniency_ms: u64,

    /// Number of copy worker threads
    pub copy_threads: usize,

    /// Absolute source paths to skip
    pub skip_paths: Vec<PathBuf>,

    /// Global skip tokens: literal names or `*.ext` patterns
    pub skip_names: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sources: Vec::new(),
            target: PathBuf::new(),
            virtual_root: None,
            remove_obsolete: true,
            timestamp_leniency_ms: DEFAULT_LENIENCY_MS,
            copy_threads: 1,
            skip_paths: Vec::new(),
            skip_names: Vec::new(),
        }
    }
}

impl Config {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), MirrorError> {
        if self.target.as_os_str().is_empty() || !self.target.is_dir() {
            return Err(MirrorError::Config(format!(
                "You must provide an existing target folder (got {:?})",
                self.target
            )));
        }

        if self.sources.is_empty() {
            return Err(MirrorError::Config(
                "At least one source path is required".to_string(),
            ));
        }

        if self.copy_threads == 0 {
            return Err(MirrorError::Config(
                "copy_threads must be at least 1".to_string(),
            ));
        }

        if let Some(root) = &self.virtual_root {
            if !root.is_dir() {
                return Err(MirrorError::Config(format!(
                    "The virtual root must be a folder: {:?}",
                    root
                )));
            }
            if let Some(outside) = self.sources.iter().find(|src| !src.starts_with(root)) {
                return Err(MirrorError::Config(format!(
                    "The virtual root {:?} must be a parent of every source (not of {:?})",
                    root, outside
                )));
            }
        }

        Ok(())
    }

    /// Copy of this configuration with every path made absolute and free of
    /// `.` / `..` components.
    pub fn resolved(&self) -> Result<Config, MirrorError> {
        let absolute = |p: &Path| {
            std::path::absolute(p)
                .map(|p| normalize(&p))
                .map_err(MirrorError::Io)
        };

        Ok(Config {
            sources: self
                .sources
                .iter()
                .map(|p| absolute(p))
                .collect::<Result<_, _>>()?,
            target: absolute(&self.target)?,
            virtual_root: self.virtual_root.as_deref().map(absolute).transpose()?,
            skip_paths: self
                .skip_paths
                .iter()
                .map(|p| absolute(p))
                .collect::<Result<_, _>>()?,
            ..self.clone()
        })
    }
}

/// Lexically drop `.` and resolve `..` against the preceding component.
///
/// Symlinks are not consulted. `..` at the root stays at the root.
fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// Split a comma separated list of skip tokens.
///
/// Whitespace around tokens is trimmed and empty tokens are dropped, so
/// `"node_modules, *.tmp,,"` yields `["node_modules", "*.tmp"]`.
pub fn parse_skip_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

/// On-disk store holding every configured mirror, run in order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub backup: Vec<Config>,
}

impl ConfigFile {
    /// Default location: `$MIRRORSYNC_CONFIG`, else `<config dir>/mirrorsync/config.toml`.
    pub fn locate() -> Result<PathBuf, MirrorError> {
        if let Some(path) = std::env::var_os(CONFIG_ENV_VAR).filter(|v| !v.is_empty()) {
            return Ok(PathBuf::from(path));
        }

        dirs::config_dir()
            .map(|dir| dir.join("mirrorsync").join("config.toml"))
            .ok_or_else(|| {
                MirrorError::Config("Could not determine the user config directory".to_string())
            })
    }

    /// Read and parse a config file.
    pub fn load(path: &Path) -> Result<Self, MirrorError> {
        if !path.is_file() {
            return Err(MirrorError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Write this config file, creating parent directories as needed.
    pub fn save(&self, path: &Path) -> Result<(), MirrorError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }
}
