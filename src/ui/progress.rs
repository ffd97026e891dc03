//! Progress reporting

use crate::progress::ProgressSnapshot;
use indicatif::{HumanBytes, ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::{Duration, Instant};

/// Live status line for one mirror run, fed from polled snapshots.
pub struct ProgressReporter {
    bar: ProgressBar,
    started_at: Instant,
}

impl ProgressReporter {
    /// Create a spinner that redraws on its own between polls.
    pub fn new() -> Self {
        let bar = ProgressBar::new_spinner();
        bar.enable_steady_tick(Duration::from_millis(120));
        if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
            bar.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ "));
        }
        Self::with_bar(bar)
    }

    /// A reporter that draws nothing (quiet and JSON modes).
    pub fn hidden() -> Self {
        Self::with_bar(ProgressBar::hidden())
    }

    fn with_bar(bar: ProgressBar) -> Self {
        Self {
            bar,
            started_at: Instant::now(),
        }
    }

    /// Refresh the status line from the latest snapshot.
    pub fn update(&self, snapshot: &ProgressSnapshot) {
        let throughput = self.throughput_bps(snapshot.bytes_copied);
        self.bar.set_message(format_status(snapshot, throughput));
    }

    /// Remove the status line once the run is over.
    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }

    fn throughput_bps(&self, bytes: u64) -> u64 {
        let secs = self.started_at.elapsed().as_secs_f64();
        if secs > 0.0 {
            (bytes as f64 / secs) as u64
        } else {
            0
        }
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

/// One-line summary of a snapshot.
pub fn format_status(snapshot: &ProgressSnapshot, throughput_bps: u64) -> String {
    let phase = if snapshot.scanning_finished {
        "Copying".to_string()
    } else {
        format!(
            "Scanning {}",
            snapshot
                .current_scan_dir
                .as_deref()
                .map(Path::display)
                .map(|d| d.to_string())
                .unwrap_or_else(|| "...".to_string())
        )
    };

    let mut line = format!(
        "{} | {} scanned | {} copied ({}, {}/s) | {} queued",
        phase,
        snapshot.files_scanned,
        snapshot.files_copied,
        HumanBytes(snapshot.bytes_copied),
        HumanBytes(throughput_bps),
        snapshot.files_remaining
    );
    if snapshot.failure_count > 0 {
        line.push_str(&format!(" | {} failed", snapshot.failure_count));
    }
    if !snapshot.files_being_copied.is_empty() {
        let in_flight = snapshot
            .files_being_copied
            .iter()
            .filter_map(|p| p.file_name())
            .map(|n| n.to_string_lossy())
            .collect::<Vec<_>>()
            .join(", ");
        line.push_str(&format!(" | copying {}", in_flight));
    }
    line
}
