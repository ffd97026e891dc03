//! Executor module: the copy side of a mirror run

pub mod copy;
pub mod pool;
pub mod queue;
pub mod reaper;

use std::any::Any;

pub use copy::copy_file;
pub use pool::WorkerPool;
pub use queue::CopyQueue;
pub use reaper::recursive_delete;

/// Best-effort text of a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
