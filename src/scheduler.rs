//! Deferred-callback scheduling on the tokio runtime.
//!
//! Timing is best effort: a callback never runs before its delay, but may
//! run later under load.

use std::future::Future;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::warn;

/// Handle to a pending callback or task.
#[derive(Debug)]
pub struct ScheduledTask {
    handle: JoinHandle<()>,
}

impl ScheduledTask {
    /// Cancel the task. No-op if it already ran.
    pub fn cancel(&self) {
        self.handle.abort();
    }

    /// True once the task ran to completion or was cancelled.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

/// Spawns timers and tasks on a tokio runtime.
#[derive(Debug, Clone, Default)]
pub struct Scheduler {
    handle: Option<Handle>,
}

impl Scheduler {
    /// Capture the current runtime, if any. Without one, the runtime is
    /// looked up again on every call.
    pub fn new() -> Self {
        Scheduler {
            handle: Handle::try_current().ok(),
        }
    }

    /// Run timers on the given runtime.
    pub fn with_handle(handle: Handle) -> Self {
        Scheduler {
            handle: Some(handle),
        }
    }

    fn runtime(&self) -> Option<Handle> {
        self.handle.clone().or_else(|| Handle::try_current().ok())
    }

    /// Run `callback` after `delay`. Returns `None` when no runtime is available.
    pub fn schedule_after<F>(&self, delay: Duration, callback: F) -> Option<ScheduledTask>
    where
        F: FnOnce() + Send + 'static,
    {
        self.spawn(async move {
            tokio::time::sleep(delay).await;
            callback();
        })
    }

    /// Spawn a long-running task. Returns `None` when no runtime is available.
    pub fn spawn<F>(&self, task: F) -> Option<ScheduledTask>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        match self.runtime() {
            Some(runtime) => Some(ScheduledTask {
                handle: runtime.spawn(task),
            }),
            None => {
                warn!("no tokio runtime available; scheduled audio dropped");
                None
            }
        }
    }
}
