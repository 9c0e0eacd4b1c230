use std::sync::Mutex;

/// A process-wide, LIFO shutdown registry.
///
/// The source attaches teardown behaviour to singletons (`Service::attach`,
/// `WithCleanup`) so that stopping the process runs every registered cleanup
/// in reverse registration order. This crate keeps the same idea as a plain
/// `Vec` of closures behind a mutex rather than a singleton-attach macro —
/// `replob-net` and `replob-chronos` register their listener/timer shutdown
/// hooks here, and `replob::Runtime::shutdown` drains it.
pub struct CleanupRegistry {
    hooks: Mutex<Vec<Box<dyn FnOnce() + Send>>>,
}

impl Default for CleanupRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CleanupRegistry {
    pub fn new() -> Self {
        Self {
            hooks: Mutex::new(Vec::new()),
        }
    }

    pub fn register(&self, hook: impl FnOnce() + Send + 'static) {
        self.hooks
            .lock()
            .expect("cleanup registry poisoned")
            .push(Box::new(hook));
    }

    /// Runs every registered hook in reverse order, emptying the registry.
    pub fn run_all(&self) {
        let hooks = std::mem::take(&mut *self.hooks.lock().expect("cleanup registry poisoned"));
        for hook in hooks.into_iter().rev() {
            hook();
        }
    }
}
