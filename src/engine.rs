//! Running-engine handle
//!
//! [`Engine::start`] spawns one scanner thread and the copy workers, then
//! returns immediately. Callers poll the read accessors (or take a
//! [`ProgressSnapshot`]) until [`Engine::is_finished`] holds.

use crate::config::Config;
use crate::executor::{CopyQueue, WorkerPool};
use crate::progress::{ProgressSnapshot, Tracker};
use crate::scanner::Scanner;
use crate::types::{Failure, MirrorError};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::info;

/// Default cadence for [`Engine::wait`] callers that have no preference.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// One mirror run in progress. Not reusable across runs.
pub struct Engine {
    tracker: Arc<Tracker>,
    queue: Arc<CopyQueue>,
    stop: Arc<AtomicBool>,
    scanner: Option<JoinHandle<()>>,
    pool: Option<WorkerPool>,
}

impl Engine {
    /// Begin scanning and copying in the background.
    ///
    /// `config` is expected to be validated already (see
    /// [`Config::validate`]). Fails only if a thread cannot be spawned.
    pub fn start(config: Config) -> Result<Self, MirrorError> {
        let workers = config.copy_threads.max(1);
        let tracker = Arc::new(Tracker::new(workers));
        let queue = Arc::new(CopyQueue::new());
        let stop = Arc::new(AtomicBool::new(false));

        info!(
            "starting mirror of {} source(s) into {} with {} worker(s)",
            config.sources.len(),
            config.target.display(),
            workers
        );

        let pool = match WorkerPool::spawn(workers, Arc::clone(&queue), Arc::clone(&tracker)) {
            Ok(pool) => pool,
            Err(e) => {
                // Let any worker that did start exit.
                queue.close();
                return Err(e);
            }
        };

        let scanner = Scanner::new(
            config,
            Arc::clone(&queue),
            Arc::clone(&tracker),
            Arc::clone(&stop),
        );
        let scanner = match thread::Builder::new()
            .name("scanner".to_string())
            .spawn(move || scanner.run())
        {
            Ok(handle) => handle,
            Err(source) => {
                queue.close();
                return Err(MirrorError::Spawn {
                    name: "scanner".to_string(),
                    source,
                });
            }
        };

        Ok(Self {
            tracker,
            queue,
            stop,
            scanner: Some(scanner),
            pool: Some(pool),
        })
    }

    /// Scanning done, queue drained, and every worker exited.
    pub fn is_finished(&self) -> bool {
        self.tracker.scanning_finished()
            && self.queue.is_empty()
            && self.tracker.workers_finished()
    }

    pub fn files_scanned(&self) -> u64 {
        self.tracker.files_scanned()
    }

    pub fn files_copied(&self) -> usize {
        self.tracker.files_copied()
    }

    pub fn bytes_copied(&self) -> u64 {
        self.tracker.bytes_copied()
    }

    pub fn obsolete_removed(&self) -> u64 {
        self.tracker.obsolete_removed()
    }

    pub fn failure_count(&self) -> usize {
        self.tracker.failure_count()
    }

    pub fn copied_files(&self) -> Vec<PathBuf> {
        self.tracker.copied_files()
    }

    pub fn failures(&self) -> Vec<Failure> {
        self.tracker.failures()
    }

    pub fn files_being_copied(&self) -> Vec<PathBuf> {
        self.tracker.files_being_copied()
    }

    pub fn current_scan_dir(&self) -> Option<PathBuf> {
        self.tracker.current_scan_dir()
    }

    pub fn scanning_finished(&self) -> bool {
        self.tracker.scanning_finished()
    }

    /// Copy tasks queued but not yet picked up by a worker.
    pub fn files_remaining(&self) -> usize {
        self.queue.len()
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        let finished = self.is_finished();
        self.tracker.snapshot(self.queue.len(), finished)
    }

    /// Ask the run to wind down.
    ///
    /// The scanner stops visiting new entries (and skips reaping), pending
    /// copies are discarded, and idle workers exit. Copies already in flight
    /// run to completion.
    pub fn request_stop(&self) {
        if self.stop.swap(true, Ordering::AcqRel) {
            return;
        }
        let discarded = self.queue.close_and_drain();
        info!("stop requested, discarded {} pending copies", discarded);
    }

    /// Poll [`Engine::is_finished`] every `poll_interval`, then return the
    /// final snapshot.
    pub fn wait(&self, poll_interval: Duration) -> ProgressSnapshot {
        while !self.is_finished() {
            thread::sleep(poll_interval);
        }
        self.snapshot()
    }

    /// Block until the scanner and every worker thread have exited.
    pub fn join(mut self) -> ProgressSnapshot {
        if let Some(scanner) = self.scanner.take() {
            // The scanner catches its own panics.
            let _ = scanner.join();
        }
        if let Some(pool) = self.pool.take() {
            pool.join();
        }
        self.snapshot()
    }
}
