use std::future::Future;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;

use crate::journey::{current, spawn, EventsGuard, Journey};
use crate::scheduler::Scheduler;
use crate::state::JourneyEvent;

/// A rendezvous point a fixed number of journeys complete and one journey
/// waits on, the async counterpart of the original's `Awaiter`/`Completer`
/// pair (themselves a wait-group over coroutines rather than OS threads).
///
/// Typical shape: call [`WaitGroup::go`] once per child journey to spawn
/// (or [`WaitGroup::add`]/[`WaitGroup::done`] directly if the children
/// aren't journeys this wait group itself spawns), then [`WaitGroup::wait`]
/// for all of them.
#[derive(Default)]
pub struct WaitGroup {
    remaining: AtomicI64,
    notify: Notify,
    children: Mutex<Vec<Journey>>,
}

impl WaitGroup {
    pub fn new() -> Self {
        Self {
            remaining: AtomicI64::new(0),
            notify: Notify::new(),
            children: Mutex::new(Vec::new()),
        }
    }

    pub fn add(&self, n: i64) {
        self.remaining.fetch_add(n, Ordering::AcqRel);
    }

    /// Marks one unit of work complete, waking the waiter once the count
    /// reaches zero.
    pub fn done(&self) {
        let prev = self.remaining.fetch_sub(1, Ordering::AcqRel);
        if prev <= 1 {
            self.notify.notify_waiters();
        }
    }

    /// Spawns `body` as a child journey on `scheduler`, counted by this wait
    /// group and tracked so [`WaitGroup::wait`] can cancel it if the parent
    /// is cancelled first. Mirrors the original's `go(closure)` adding one
    /// to the group.
    pub fn go<F, Fut>(self: &Arc<Self>, scheduler: &Scheduler, body: F) -> Journey
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.add(1);
        let wg = self.clone();
        let journey = spawn(scheduler, move || async move {
            body().await;
            wg.done();
        });
        self.children.lock().expect("wait group children poisoned").push(journey.clone());
        journey
    }

    fn is_ready(&self) -> bool {
        self.remaining.load(Ordering::Acquire) <= 0
    }

    /// Blocks the calling journey until the count reaches zero, raising
    /// [`JourneyEvent`] if the caller is cancelled or times out first.
    ///
    /// If a raise event does arrive, every child added through
    /// [`WaitGroup::go`] is cancelled, and the wait then continues with
    /// further events ignored until all of them have actually finished —
    /// the caller never returns while a child is still running.
    pub async fn wait(&self) -> Result<(), JourneyEvent> {
        if self.is_ready() {
            return Ok(());
        }
        let caller = current();
        let _guard = EventsGuard::enter(&caller.state_for_guard());
        loop {
            if self.is_ready() {
                return Ok(());
            }
            let ready = self.notify.notified();
            let cancelled = caller.cancellation_notified();
            if self.is_ready() {
                return Ok(());
            }
            if let Err(event) = caller.handle_events() {
                return self.cancel_children_and_drain(event).await;
            }
            tokio::select! {
                () = ready => {}
                () = cancelled => {
                    if let Err(event) = caller.handle_events() {
                        return self.cancel_children_and_drain(event).await;
                    }
                }
            }
        }
    }

    async fn cancel_children_and_drain(&self, event: JourneyEvent) -> Result<(), JourneyEvent> {
        for child in self.children.lock().expect("wait group children poisoned").iter() {
            child.cancel();
        }
        while !self.is_ready() {
            self.notify.notified().await;
        }
        Err(event)
    }
}
