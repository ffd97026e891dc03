//! Copy worker pool.
//!
//! A fixed set of named OS threads, all draining the same [`CopyQueue`]:
//! - each worker pops one task at a time and copies it outside the queue lock
//! - the worker's tracker slot shows the file in flight while it copies
//! - a worker exits, and marks itself finished, only once the queue is
//!   closed and empty

use super::copy::copy_file;
use super::queue::CopyQueue;
use super::panic_message;
use crate::progress::Tracker;
use crate::types::{CopyTask, Failure, FailureReason, MirrorError};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, trace};

/// Handles of the running copy workers.
pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `worker_count` workers (at least one).
    ///
    /// The tracker must have been created with at least as many worker slots.
    pub fn spawn(
        worker_count: usize,
        queue: Arc<CopyQueue>,
        tracker: Arc<Tracker>,
    ) -> Result<Self, MirrorError> {
        let workers = worker_count.max(1);
        let mut handles = Vec::with_capacity(workers);

        for worker_id in 0..workers {
            let name = format!("copy-worker-{worker_id}");
            let queue = Arc::clone(&queue);
            let tracker = Arc::clone(&tracker);
            let handle = thread::Builder::new()
                .name(name.clone())
                .spawn(move || worker_loop(worker_id, &queue, &tracker))
                .map_err(|source| MirrorError::Spawn { name, source })?;
            handles.push(handle);
        }

        Ok(Self { handles })
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Block until every worker has exited.
    pub fn join(self) {
        for handle in self.handles {
            // Panics are caught per task, so a worker cannot unwind here.
            let _ = handle.join();
        }
    }
}

fn worker_loop(worker_id: usize, queue: &CopyQueue, tracker: &Tracker) {
    let slot = tracker.worker(worker_id);

    while let Some(task) = queue.pop() {
        slot.begin(task.source());
        run_task(&task, tracker);
        slot.clear();
    }

    debug!("copy worker {} finished", worker_id);
    slot.mark_finished();
}

fn run_task(task: &CopyTask, tracker: &Tracker) {
    trace!("copying {} -> {}", task.source().display(), task.target().display());

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        copy_file(task.source(), task.target())
    }));

    match outcome {
        Ok(Ok(bytes)) => tracker.record_copied(task.source(), bytes),
        Ok(Err(failure)) => tracker.record_failure(failure),
        Err(payload) => tracker.record_failure(
            Failure::new(FailureReason::UnexpectedCopyError, task.source())
                .with_cause(panic_message(payload.as_ref())),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_pool_copies_every_task_once() {
        let src = TempDir::new().expect("src tempdir");
        let dst = TempDir::new().expect("dst tempdir");
        let queue = Arc::new(CopyQueue::new());
        let tracker = Arc::new(Tracker::new(4));

        let pool = WorkerPool::spawn(4, Arc::clone(&queue), Arc::clone(&tracker))
            .expect("spawn pool");
        assert_eq!(pool.len(), 4);

        for i in 0..64 {
            let name = format!("file-{i}.txt");
            fs::write(src.path().join(&name), format!("content {i}")).expect("write source");
            queue.push(CopyTask::new(src.path().join(&name), dst.path().join(&name)));
        }
        queue.close();
        pool.join();

        assert!(tracker.workers_finished());
        assert_eq!(tracker.files_copied(), 64);
        assert_eq!(tracker.failure_count(), 0);
        let unique: HashSet<_> = tracker.copied_files().into_iter().collect();
        assert_eq!(unique.len(), 64);
        assert!(tracker.files_being_copied().is_empty());
        assert_eq!(
            fs::read_to_string(dst.path().join("file-10.txt")).expect("read copy"),
            "content 10"
        );
    }

    #[test]
    fn test_failed_task_does_not_stop_worker() {
        let src = TempDir::new().expect("src tempdir");
        let dst = TempDir::new().expect("dst tempdir");
        let queue = Arc::new(CopyQueue::new());
        let tracker = Arc::new(Tracker::new(1));

        fs::write(src.path().join("good.txt"), b"good").expect("write good");
        queue.push(CopyTask::new(
            src.path().join("missing.txt"),
            dst.path().join("missing.txt"),
        ));
        queue.push(CopyTask::new(
            src.path().join("good.txt"),
            dst.path().join("good.txt"),
        ));
        queue.close();

        WorkerPool::spawn(1, Arc::clone(&queue), Arc::clone(&tracker))
            .expect("spawn pool")
            .join();

        assert_eq!(tracker.files_copied(), 1);
        assert_eq!(tracker.failure_count(), 1);
        assert_eq!(
            tracker.failures()[0].reason,
            FailureReason::CopySourceUnreadable
        );
        assert!(dst.path().join("good.txt").exists());
    }

    #[test]
    fn test_pool_enforces_minimum_one_worker() {
        let queue = Arc::new(CopyQueue::new());
        let tracker = Arc::new(Tracker::new(1));
        let pool = WorkerPool::spawn(0, Arc::clone(&queue), tracker).expect("spawn pool");
        assert_eq!(pool.len(), 1);
        queue.close();
        pool.join();
    }
}
