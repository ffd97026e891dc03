//! Closable FIFO of copy tasks shared by the scanner and the copy workers.
//!
//! One mutex guards the task list and the closed flag; one condition variable
//! parks idle workers. A push wakes one worker, closing wakes all of them.
//! Once closed, the queue rejects new tasks and `pop` returns `None` as soon
//! as the remaining tasks are drained.

use crate::types::CopyTask;
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;

#[derive(Debug, Default)]
struct QueueState {
    tasks: VecDeque<CopyTask>,
    closed: bool,
}

#[derive(Debug, Default)]
pub struct CopyQueue {
    state: Mutex<QueueState>,
    available: Condvar,
}

impl CopyQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue a task and wake one waiting worker.
    ///
    /// Returns `false` (dropping the task) if the queue is already closed.
    pub fn push(&self, task: CopyTask) -> bool {
        let mut state = self.state.lock();
        if state.closed {
            return false;
        }
        state.tasks.push_back(task);
        drop(state);

        self.available.notify_one();
        true
    }

    /// Take the next task, blocking while the queue is empty but open.
    ///
    /// Returns `None` once the queue is closed and empty.
    pub fn pop(&self) -> Option<CopyTask> {
        let mut state = self.state.lock();
        loop {
            if let Some(task) = state.tasks.pop_front() {
                return Some(task);
            }
            if state.closed {
                return None;
            }
            self.available.wait(&mut state);
        }
    }

    /// Mark that no more tasks will arrive and wake every waiting worker.
    pub fn close(&self) {
        self.state.lock().closed = true;
        self.available.notify_all();
    }

    /// Close the queue and discard whatever is still pending.
    ///
    /// Returns the number of discarded tasks.
    pub fn close_and_drain(&self) -> usize {
        let discarded = {
            let mut state = self.state.lock();
            state.closed = true;
            let pending = state.tasks.len();
            state.tasks.clear();
            pending
        };
        self.available.notify_all();
        discarded
    }

    pub fn len(&self) -> usize {
        self.state.lock().tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().tasks.is_empty()
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }
}
