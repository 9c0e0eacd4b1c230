use std::future::Future;
use std::time::Duration;

use crate::journey::{current, EventsGuard};
use crate::state::JourneyEvent;

/// Suspends the calling journey for `duration`, raising [`JourneyEvent`] if it
/// is cancelled or separately timed out by someone else while asleep.
pub async fn sleep(duration: Duration) -> Result<(), JourneyEvent> {
    let caller = current();
    let _guard = EventsGuard::enter(caller.state_for_guard());
    let cancelled = caller.cancellation_notified();
    tokio::select! {
        biased;
        () = tokio::time::sleep(duration) => caller.handle_events(),
        () = cancelled => caller.handle_events(),
    }
}

/// Races `fut` against a deadline. On elapse the calling journey is marked
/// timed out (same as the source's `Timer`/`Timeout` pair, which raise the
/// timeout as an event into whichever wait the journey happened to be in).
pub async fn timeout<F>(duration: Duration, fut: F) -> Result<F::Output, JourneyEvent>
where
    F: Future,
{
    let caller = current();
    let _guard = EventsGuard::enter(caller.state_for_guard());
    tokio::select! {
        biased;
        out = fut => {
            caller.handle_events()?;
            Ok(out)
        }
        () = tokio::time::sleep(duration) => {
            caller.timedout();
            Err(JourneyEvent::Timedout)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journey::spawn;
    use crate::scheduler::Scheduler;

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn timeout_fires_when_the_future_never_resolves() {
        let scheduler = Scheduler::current("test");
        let goer = spawn(&scheduler, || async move {
            let result = timeout(Duration::from_millis(5), std::future::pending::<()>()).await;
            assert_eq!(result, Err(JourneyEvent::Timedout));
        });
        goer.wait_for_done().await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn timeout_passes_through_a_fast_future(){
        let scheduler = Scheduler::current("test");
        let goer = spawn(&scheduler, || async move {
            let result = timeout(Duration::from_millis(50), async { 7 }).await;
            assert_eq!(result, Ok(7));
        });
        goer.wait_for_done().await.unwrap();
    }
}
