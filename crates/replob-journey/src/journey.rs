use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Wake, Waker};

use tokio::sync::Notify;

use crate::scheduler::Scheduler;
use crate::state::{JourneyEvent, JourneyState};

static NEXT_JOURNEY_ID: AtomicU64 = AtomicU64::new(1);

tokio::task_local! {
    static CURRENT_JOURNEY: Journey;
}

type BodyFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// The state shared by every [`Journey`] handle to the same logical task.
///
/// A journey owns exactly one [`BodyFuture`], driven one `poll` at a time by
/// [`poll_once`]. Each `poll` call is itself spawned onto whatever `Scheduler`
/// is current at the moment the journey wakes up — that's what makes
/// [`teleport`] work: it just swaps `scheduler` before yielding once, so the
/// *next* wake lands on a different runtime.
struct Inner {
    id: u64,
    state: JourneyState,
    scheduler: Mutex<Scheduler>,
    slot: Mutex<Option<BodyFuture>>,
    notify_event: Notify,
}

impl Inner {
    fn proceed(self: &Arc<Self>) {
        let scheduler = self.scheduler.lock().expect("scheduler mutex poisoned").clone();
        let inner = self.clone();
        scheduler.spawn(async move { poll_once(inner) });
    }
}

impl Wake for Inner {
    fn wake(self: Arc<Self>) {
        self.proceed();
    }

    fn wake_by_ref(self: &Arc<Self>) {
        self.proceed();
    }
}

/// A handle to a running (or finished) journey.
///
/// Cloning a `Journey` clones the handle, not the task: every clone observes
/// the same underlying state and can cancel it, time it out, or wait for it to
/// finish.
#[derive(Clone)]
pub struct Journey {
    inner: Arc<Inner>,
}

/// A detached handle allowed to outlive the code that spawned it — the
/// counterpart of the original's `Goer`. Dropping it does not cancel the
/// journey; use [`Journey::cancel`] explicitly if that's what's wanted.
pub type Goer = Journey;

fn poll_once(inner: Arc<Inner>) {
    let mut slot = inner.slot.lock().expect("journey slot poisoned");
    let Some(fut) = slot.as_mut() else {
        return;
    };
    let (_counter, _was_events_enabled) = inner.state.acquire();
    let waker: Waker = Waker::from(inner.clone());
    let mut cx = Context::from_waker(&waker);
    let journey = Journey { inner: inner.clone() };
    let poll = CURRENT_JOURNEY.sync_scope(journey, || fut.as_mut().poll(&mut cx));
    if let Some(event) = inner.state.reset_entered_and_check_events() {
        tracing::trace!(journey = inner.id, ?event, "event latched while entered");
    }
    if poll.is_ready() {
        *slot = None;
        inner.state.mark_done();
        inner.notify_event.notify_waiters();
        tracing::trace!(journey = inner.id, "journey finished");
    }
}

/// Spawns a journey's body on `scheduler` and returns a handle to it.
///
/// Mirrors `go()`/`goN()`: the body starts running on its first poll, inline
/// with whatever scheduled the spawn (tokio only guarantees a task starts
/// executing once something actually polls it — here that happens on the very
/// first `proceed()` call below).
pub fn spawn<F, Fut>(scheduler: &Scheduler, body: F) -> Goer
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let inner = Arc::new(Inner {
        id: NEXT_JOURNEY_ID.fetch_add(1, Ordering::Relaxed),
        state: JourneyState::new(),
        scheduler: Mutex::new(scheduler.clone()),
        slot: Mutex::new(None),
        notify_event: Notify::new(),
    });
    let boxed: BodyFuture = Box::pin(async move { body().await });
    *inner.slot.lock().expect("journey slot poisoned") = Some(boxed);
    inner.proceed();
    Journey { inner }
}

impl Journey {
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub(crate) fn state_for_guard(&self) -> &JourneyState {
        &self.inner.state
    }

    pub(crate) fn cancellation_notified(&self) -> tokio::sync::Notified<'_> {
        self.inner.notify_event.notified()
    }

    pub(crate) fn handle_events(&self) -> Result<(), JourneyEvent> {
        self.inner.state.handle_events()
    }

    pub fn is_done(&self) -> bool {
        self.inner.state.is_done()
    }

    /// Reports whether this journey has been asked to cancel. A journey body
    /// looping on bare [`reschedule`] (rather than one of the blocking
    /// primitives that already raise [`JourneyEvent`]) checks this itself to
    /// unwind promptly after [`Journey::cancel`].
    pub fn is_cancelled(&self) -> bool {
        self.inner.state.is_cancelled()
    }

    /// Requests cancellation. Idempotent; a second call is a no-op.
    pub fn cancel(&self) {
        if self.inner.state.cancel() {
            self.inner.notify_event.notify_waiters();
        }
    }

    /// Marks the journey as timed out, unless it was already cancelled.
    pub fn timedout(&self) {
        if self.inner.state.timedout() {
            self.inner.notify_event.notify_waiters();
        }
    }

    /// Suspends the calling journey until this one finishes, raising
    /// [`JourneyEvent`] if the *caller* (not the awaited journey) is cancelled
    /// or times out while waiting.
    pub async fn wait_for_done(&self) -> Result<(), JourneyEvent> {
        if self.inner.state.is_done() {
            return self.inner.state.handle_events();
        }
        let caller = current();
        let _guard = EventsGuard::enter(&caller.inner.state);
        loop {
            if self.inner.state.is_done() {
                return self.inner.state.handle_events();
            }
            let done = self.inner.notify_event.notified();
            let cancelled = caller.inner.notify_event.notified();
            if self.inner.state.is_done() {
                return self.inner.state.handle_events();
            }
            if let Err(event) = caller.inner.state.handle_events() {
                return Err(event);
            }
            tokio::select! {
                () = done => {}
                () = cancelled => {
                    if let Err(event) = caller.inner.state.handle_events() {
                        return Err(event);
                    }
                }
            }
        }
    }
}

/// Enables event delivery for as long as it's alive, disabling it again on
/// drop — used around every blocking primitive so a concurrent `cancel()`
/// only ever wakes a journey that is actually parked.
pub(crate) struct EventsGuard<'a> {
    state: &'a JourneyState,
}

impl<'a> EventsGuard<'a> {
    pub(crate) fn enter(state: &'a JourneyState) -> Self {
        state.enable_events();
        Self { state }
    }
}

impl Drop for EventsGuard<'_> {
    fn drop(&mut self) {
        self.state.disable_events();
    }
}

/// The journey currently executing on this task.
///
/// # Panics
/// Panics if called from outside a journey body (i.e. from plain tokio task
/// or thread code), the same way `journey()` in the source panics outside a
/// coroutine.
pub fn current() -> Journey {
    CURRENT_JOURNEY.with(Clone::clone)
}

/// Yields control back to the scheduler once, letting other journeys queued
/// on the same runtime make progress before this one resumes.
pub async fn reschedule() {
    struct YieldOnce(bool);
    impl Future for YieldOnce {
        type Output = ();
        fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> std::task::Poll<()> {
            if self.0 {
                std::task::Poll::Ready(())
            } else {
                self.0 = true;
                cx.waker().wake_by_ref();
                std::task::Poll::Pending
            }
        }
    }
    YieldOnce(false).await;
}

/// Moves the calling journey onto `scheduler`: every poll after this point is
/// spawned there instead of wherever it used to run. Idempotent if already
/// running on an equal scheduler.
pub async fn teleport(scheduler: &Scheduler) {
    let here = current();
    {
        let mut current_scheduler = here.inner.scheduler.lock().expect("scheduler mutex poisoned");
        if *current_scheduler == *scheduler {
            return;
        }
        *current_scheduler = scheduler.clone();
    }
    reschedule().await;
}
