//! Run mirror configurations and report the outcome

use crate::config::{Cli, Command, Config, ConfigFile};
use crate::engine::{Engine, DEFAULT_POLL_INTERVAL};
use crate::progress::ProgressSnapshot;
use crate::types::MirrorError;
use crate::ui::ProgressReporter;
use chrono::{DateTime, Local};
use indicatif::HumanBytes;
use serde::Serialize;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;
use tracing::{error, info};

const TIME_FORMAT: &str = "%-I:%M:%S %p on %a %b %-d";

/// How runs are observed.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Render the live progress line
    pub live_progress: bool,
    /// Print the text report after each run
    pub print_report: bool,
    /// How often the engine is polled
    pub poll_interval: Duration,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            live_progress: true,
            print_report: true,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl RunOptions {
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            live_progress: !cli.quiet && !cli.json,
            print_report: !cli.json,
            ..Self::default()
        }
    }
}

/// Outcome of one configuration's run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub target: PathBuf,
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
    pub progress: ProgressSnapshot,
}

impl RunReport {
    pub fn has_failures(&self) -> bool {
        self.progress.failure_count > 0
    }
}

/// Reports of every configuration that ran, in order.
///
/// `aborted` holds the error that kept a later configuration from starting;
/// configurations after it were not run.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub reports: Vec<RunReport>,
    pub aborted: Option<MirrorError>,
}

impl RunSummary {
    pub fn has_failures(&self) -> bool {
        self.reports.iter().any(RunReport::has_failures)
    }
}

/// Execute the subcommand selected on the command line.
pub fn execute(cli: &Cli) -> Result<RunSummary, MirrorError> {
    let options = RunOptions::from_cli(cli);

    let configs = match &cli.command {
        Command::Run { config } => {
            let path = match config {
                Some(path) => path.clone(),
                None => ConfigFile::locate()?,
            };
            info!("reading configuration from {}", path.display());
            if options.print_report {
                println!("Configuration was read from: {}", path.display());
            }
            ConfigFile::load(&path)?.backup
        }
        Command::Sync(args) => vec![Config::from(args.clone())],
    };

    run_all(&configs, &options)
}

/// Validate every configuration, then run them one after another.
///
/// A configuration that fails validation up front aborts the whole batch.
/// One that cannot start later stops the batch but keeps the reports of
/// the runs already finished.
pub fn run_all(configs: &[Config], options: &RunOptions) -> Result<RunSummary, MirrorError> {
    if configs.is_empty() {
        return Err(MirrorError::Config(
            "No backup configurations found".to_string(),
        ));
    }

    let resolved = configs
        .iter()
        .map(|config| {
            let config = config.resolved()?;
            config.validate()?;
            Ok(config)
        })
        .collect::<Result<Vec<_>, MirrorError>>()?;

    let total = resolved.len();
    let mut summary = RunSummary::default();
    for (index, config) in resolved.into_iter().enumerate() {
        match run_config(config, options) {
            Ok(report) => {
                if options.print_report {
                    println!("{}", format_report(index + 1, total, &report));
                }
                summary.reports.push(report);
            }
            Err(e) => {
                error!("config {} of {} did not start: {}", index + 1, total, e);
                summary.aborted = Some(e);
                break;
            }
        }
    }
    Ok(summary)
}

/// Run a single configuration to completion.
///
/// The configuration is validated again here: an earlier run in the same
/// batch may have removed its target.
pub fn run_config(config: Config, options: &RunOptions) -> Result<RunReport, MirrorError> {
    config.validate()?;
    let target = config.target.clone();
    let started_at = Local::now();
    let engine = Engine::start(config)?;

    let reporter = if options.live_progress {
        ProgressReporter::new()
    } else {
        ProgressReporter::hidden()
    };
    while !engine.is_finished() {
        reporter.update(&engine.snapshot());
        thread::sleep(options.poll_interval);
    }
    reporter.finish();

    Ok(RunReport {
        target,
        started_at,
        finished_at: Local::now(),
        progress: engine.snapshot(),
    })
}

/// Plain text report for one finished run.
pub fn format_report(index: usize, total: usize, report: &RunReport) -> String {
    let progress = &report.progress;
    let mut lines = vec![
        String::new(),
        format!("Running config {} out of {}", index, total),
        format!("Set started at: {}", report.started_at.format(TIME_FORMAT)),
        format!("Config finished at: {}", report.finished_at.format(TIME_FORMAT)),
        format!("Files copied to {}", report.target.display()),
        format!("Files scanned: {}", progress.files_scanned),
        format!("Files copied: {}", progress.files_copied),
        format!("Size of files copied: {}", HumanBytes(progress.bytes_copied)),
        format!("Obsolete files removed: {}", progress.obsolete_removed),
        format!("Files failed: {}", progress.failure_count),
    ];

    if !progress.failures.is_empty() {
        lines.push(String::new());
        lines.push("Failures:".to_string());
        lines.extend(progress.failures.iter().map(|f| format!("  {}", f)));
    }

    lines.push(String::new());
    lines.push("Copied:".to_string());
    if progress.copied_files.is_empty() {
        lines.push("  (nothing to copy)".to_string());
    } else {
        lines.extend(
            progress
                .copied_files
                .iter()
                .map(|p| format!("  {}", p.display())),
        );
    }

    lines.join("\n")
}
