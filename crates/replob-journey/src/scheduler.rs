use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::runtime::Handle;

static NEXT_SCHEDULER_ID: AtomicU64 = AtomicU64::new(1);

/// A named handle onto a tokio runtime that journeys can be spawned on or
/// [`teleport`](crate::teleport)ed to.
///
/// This stands in for the original's `IScheduler`/`ThreadPool` pair (a thin
/// wrapper around a `boost::asio::io_service` run by a fixed worker count): here
/// a scheduler is just a `tokio::runtime::Handle` plus a name used in logs, since
/// `tokio::runtime::Runtime` already owns the worker pool.
#[derive(Clone)]
pub struct Scheduler {
    id: u64,
    name: &'static str,
    handle: Handle,
}

impl Scheduler {
    /// Wraps an already-running runtime's handle.
    pub fn new(name: &'static str, handle: Handle) -> Self {
        Self {
            id: NEXT_SCHEDULER_ID.fetch_add(1, Ordering::Relaxed),
            name,
            handle,
        }
    }

    /// Wraps the handle of the runtime the caller is currently executing on.
    ///
    /// # Panics
    /// Panics outside of a tokio runtime context, same as
    /// [`Handle::current`].
    pub fn current(name: &'static str) -> Self {
        Self::new(name, Handle::current())
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub(crate) fn handle(&self) -> &Handle {
        &self.handle
    }

    pub(crate) fn spawn<F>(&self, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.handle.spawn(future);
    }
}

impl PartialEq for Scheduler {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Scheduler {}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish()
    }
}
