//! Command line arguments

use super::{parse_skip_list, Config, DEFAULT_LENIENCY_MS};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Mirror source trees into a backup location
#[derive(Debug, Parser)]
#[command(name = "mirrorsync", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Print the final report as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Don't render live progress
    #[arg(long, short, global = true)]
    pub quiet: bool,

    /// Log filter used when RUST_LOG is unset (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run every mirror configured in the config file, in order
    Run {
        /// Config file (defaults to $MIRRORSYNC_CONFIG or the user config dir)
        #[arg(long, short)]
        config: Option<PathBuf>,
    },

    /// Run a single mirror described on the command line
    Sync(SyncArgs),
}

#[derive(Debug, Clone, Args)]
pub struct SyncArgs {
    /// Source file or directory (repeatable)
    #[arg(long = "source", short, required = true)]
    pub sources: Vec<PathBuf>,

    /// Target root directory
    #[arg(long, short)]
    pub target: PathBuf,

    /// Ancestor of every source at which mirrored paths start
    #[arg(long)]
    pub virtual_root: Option<PathBuf>,

    /// Leave target entries with no source counterpart in place
    #[arg(long)]
    pub keep_obsolete: bool,

    /// Modification time leniency in milliseconds
    #[arg(long, default_value_t = DEFAULT_LENIENCY_MS)]
    pub leniency: u64,

    /// Number of copy worker threads
    #[arg(long, short = 'j', default_value_t = 1)]
    pub threads: usize,

    /// Absolute source path to skip (repeatable)
    #[arg(long = "skip-path")]
    pub skip_paths: Vec<PathBuf>,

    /// Comma separated names or `*.ext` patterns to skip everywhere
    #[arg(long)]
    pub skip: Option<String>,
}

impl From<SyncArgs> for Config {
    fn from(args: SyncArgs) -> Self {
        Config {
            sources: args.sources,
            target: args.target,
            virtual_root: args.virtual_root,
            remove_obsolete: !args.keep_obsolete,
            timestamp_leniency_ms: args.leniency,
            copy_threads: args.threads,
            skip_paths: args.skip_paths,
            skip_names: args.skip.as_deref().map(parse_skip_list).unwrap_or_default(),
        }
    }
}
