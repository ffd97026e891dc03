//! Shared progress and failure aggregation
//!
//! Written by the scanner thread and every copy worker, read at any time by
//! observers. Each accessor is individually synchronized; reading several of
//! them does not give a consistent point-in-time view.

use crate::types::Failure;
use parking_lot::Mutex;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tracing::warn;

/// Per-worker state: the file in flight and whether the worker has exited.
#[derive(Debug, Default)]
pub(crate) struct WorkerSlot {
    current: Mutex<Option<PathBuf>>,
    finished: AtomicBool,
}

impl WorkerSlot {
    pub(crate) fn begin(&self, source: &Path) {
        *self.current.lock() = Some(source.to_path_buf());
    }

    pub(crate) fn clear(&self) {
        *self.current.lock() = None;
    }

    pub(crate) fn current(&self) -> Option<PathBuf> {
        self.current.lock().clone()
    }

    pub(crate) fn mark_finished(&self) {
        self.finished.store(true, Ordering::Release);
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }
}

// Paths and byte total live under one lock so a copy is published atomically.
#[derive(Debug, Default)]
struct CopiedFiles {
    paths: Vec<PathBuf>,
    bytes: u64,
}

/// Counters, ordered result lists and per-worker slots for one engine run.
#[derive(Debug)]
pub struct Tracker {
    files_scanned: AtomicU64,
    obsolete_removed: AtomicU64,
    copied: Mutex<CopiedFiles>,
    failures: Mutex<Vec<Failure>>,
    current_scan_dir: Mutex<Option<PathBuf>>,
    scanning_finished: AtomicBool,
    workers: Vec<WorkerSlot>,
}

impl Tracker {
    pub fn new(worker_count: usize) -> Self {
        Self {
            files_scanned: AtomicU64::new(0),
            obsolete_removed: AtomicU64::new(0),
            copied: Mutex::new(CopiedFiles::default()),
            failures: Mutex::new(Vec::new()),
            current_scan_dir: Mutex::new(None),
            scanning_finished: AtomicBool::new(false),
            workers: (0..worker_count).map(|_| WorkerSlot::default()).collect(),
        }
    }

    // ── mutators (scanner / workers) ────────────────────────────

    pub(crate) fn record_scanned(&self) {
        self.files_scanned.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_copied(&self, source: &Path, bytes: u64) {
        let mut copied = self.copied.lock();
        copied.paths.push(source.to_path_buf());
        copied.bytes += bytes;
    }

    pub(crate) fn record_obsolete_removed(&self) {
        self.obsolete_removed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failure(&self, failure: Failure) {
        warn!("{}", failure);
        self.failures.lock().push(failure);
    }

    pub(crate) fn set_current_scan_dir(&self, dir: &Path) {
        *self.current_scan_dir.lock() = Some(dir.to_path_buf());
    }

    /// Returns `true` only for the call that actually flipped the flag.
    pub(crate) fn mark_scanning_finished(&self) -> bool {
        !self.scanning_finished.swap(true, Ordering::AcqRel)
    }

    pub(crate) fn worker(&self, index: usize) -> &WorkerSlot {
        &self.workers[index]
    }

    // ── read accessors ──────────────────────────────────────────

    pub fn files_scanned(&self) -> u64 {
        self.files_scanned.load(Ordering::Relaxed)
    }

    pub fn files_copied(&self) -> usize {
        self.copied.lock().paths.len()
    }

    pub fn bytes_copied(&self) -> u64 {
        self.copied.lock().bytes
    }

    pub fn obsolete_removed(&self) -> u64 {
        self.obsolete_removed.load(Ordering::Relaxed)
    }

    pub fn failure_count(&self) -> usize {
        self.failures.lock().len()
    }

    /// Copied source paths, in completion order.
    pub fn copied_files(&self) -> Vec<PathBuf> {
        self.copied.lock().paths.clone()
    }

    /// Recorded failures, in occurrence order.
    pub fn failures(&self) -> Vec<Failure> {
        self.failures.lock().clone()
    }

    /// Source files currently being copied, at most one per worker.
    pub fn files_being_copied(&self) -> Vec<PathBuf> {
        self.workers.iter().filter_map(WorkerSlot::current).collect()
    }

    pub fn current_scan_dir(&self) -> Option<PathBuf> {
        self.current_scan_dir.lock().clone()
    }

    pub fn scanning_finished(&self) -> bool {
        self.scanning_finished.load(Ordering::Acquire)
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// True once every worker has observed the closed, empty queue.
    pub fn workers_finished(&self) -> bool {
        self.workers.iter().all(WorkerSlot::is_finished)
    }

    /// Bundle every accessor into one serializable value.
    pub fn snapshot(&self, files_remaining: usize, finished: bool) -> ProgressSnapshot {
        let (copied_files, bytes_copied) = {
            let copied = self.copied.lock();
            (copied.paths.clone(), copied.bytes)
        };
        let failures = self.failures();

        ProgressSnapshot {
            files_scanned: self.files_scanned(),
            files_copied: copied_files.len(),
            bytes_copied,
            obsolete_removed: self.obsolete_removed(),
            failure_count: failures.len(),
            files_remaining,
            current_scan_dir: self.current_scan_dir(),
            files_being_copied: self.files_being_copied(),
            scanning_finished: self.scanning_finished(),
            finished,
            copied_files,
            failures,
        }
    }
}

/// Best-effort view of a run's progress at one moment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressSnapshot {
    pub files_scanned: u64,
    pub files_copied: usize,
    pub bytes_copied: u64,
    pub obsolete_removed: u64,
    pub failure_count: usize,
    pub files_remaining: usize,
    pub current_scan_dir: Option<PathBuf>,
    pub files_being_copied: Vec<PathBuf>,
    pub scanning_finished: bool,
    pub finished: bool,
    pub copied_files: Vec<PathBuf>,
    pub failures: Vec<Failure>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FailureReason;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_counters_start_at_zero() {
        let tracker = Tracker::new(2);
        assert_eq!(tracker.files_scanned(), 0);
        assert_eq!(tracker.files_copied(), 0);
        assert_eq!(tracker.bytes_copied(), 0);
        assert_eq!(tracker.obsolete_removed(), 0);
        assert_eq!(tracker.failure_count(), 0);
        assert!(!tracker.scanning_finished());
        assert!(!tracker.workers_finished());
        assert_eq!(tracker.worker_count(), 2);
    }

    #[test]
    fn test_record_copied_updates_list_and_bytes_together() {
        let tracker = Tracker::new(1);
        tracker.record_copied(Path::new("/src/a.txt"), 100);
        tracker.record_copied(Path::new("/src/b.txt"), 23);

        assert_eq!(tracker.files_copied(), 2);
        assert_eq!(tracker.bytes_copied(), 123);
        assert_eq!(
            tracker.copied_files(),
            vec![PathBuf::from("/src/a.txt"), PathBuf::from("/src/b.txt")]
        );
    }

    #[test]
    fn test_failures_keep_occurrence_order() {
        let tracker = Tracker::new(1);
        tracker.record_failure(Failure::new(FailureReason::SourceMissing, "/src/gone"));
        tracker.record_failure(Failure::new(FailureReason::TargetConflict, "/dst/x"));

        let failures = tracker.failures();
        assert_eq!(tracker.failure_count(), 2);
        assert_eq!(failures[0].reason, FailureReason::SourceMissing);
        assert_eq!(failures[1].reason, FailureReason::TargetConflict);
    }

    #[test]
    fn test_scanning_finished_flips_once() {
        let tracker = Tracker::new(1);
        assert!(tracker.mark_scanning_finished());
        assert!(!tracker.mark_scanning_finished());
        assert!(tracker.scanning_finished());
    }

    #[test]
    fn test_worker_slots_report_in_flight_files() {
        let tracker = Tracker::new(3);
        tracker.worker(0).begin(Path::new("/src/one"));
        tracker.worker(2).begin(Path::new("/src/three"));

        assert_eq!(
            tracker.files_being_copied(),
            vec![PathBuf::from("/src/one"), PathBuf::from("/src/three")]
        );

        tracker.worker(0).clear();
        assert_eq!(
            tracker.files_being_copied(),
            vec![PathBuf::from("/src/three")]
        );
    }

    #[test]
    fn test_workers_finished_requires_every_worker() {
        let tracker = Tracker::new(2);
        tracker.worker(0).mark_finished();
        assert!(!tracker.workers_finished());
        tracker.worker(1).mark_finished();
        assert!(tracker.workers_finished());
    }

    #[test]
    fn test_concurrent_updates_are_not_lost() {
        let tracker = Arc::new(Tracker::new(4));
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let tracker = Arc::clone(&tracker);
                thread::spawn(move || {
                    for i in 0..250 {
                        tracker.record_scanned();
                        tracker.record_copied(&PathBuf::from(format!("/src/{t}/{i}")), 2);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("join updater");
        }

        assert_eq!(tracker.files_scanned(), 1000);
        assert_eq!(tracker.files_copied(), 1000);
        assert_eq!(tracker.bytes_copied(), 2000);
    }

    #[test]
    fn test_snapshot_serializes() {
        let tracker = Tracker::new(1);
        tracker.record_scanned();
        tracker.record_copied(Path::new("/src/a.txt"), 10);
        tracker.set_current_scan_dir(Path::new("/src"));

        let snapshot = tracker.snapshot(0, false);
        assert_eq!(snapshot.files_scanned, 1);
        assert_eq!(snapshot.files_copied, 1);
        assert_eq!(snapshot.current_scan_dir, Some(PathBuf::from("/src")));

        let json = serde_json::to_value(&snapshot).expect("serialize snapshot");
        assert_eq!(json["bytes_copied"], 10);
        assert_eq!(json["copied_files"][0], "/src/a.txt");
    }
}
