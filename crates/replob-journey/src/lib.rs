//! # replob-journey: the cooperative task runtime
//!
//! This is a from-scratch port of a stackful-coroutine runtime (the source
//! built journeys on `boost::context` fibers run by a small
//! `boost::asio`-backed thread pool) onto `tokio` tasks. The bit-for-bit
//! layout of [`state::JourneyState`] is preserved — entered / events-enabled /
//! done / cancelled / timed-out flags plus a generation counter — but instead
//! of swapping stacks, a journey's body is a single boxed future driven one
//! `poll` at a time by an internal [`std::task::Wake`] implementation, which
//! is what makes [`teleport`] (moving a suspended journey to a different
//! [`Scheduler`]) possible without `unsafe`.
//!
//! - [`spawn`] / [`Journey`] — start a journey, hold a handle to it
//! - [`current`] / [`reschedule`] / [`teleport`] — free functions callable
//!   from inside a running journey's body, mirroring the source's
//!   thread-local `journey()` accessor
//! - [`WaitGroup`] — join point for a known number of journeys
//! - [`timer`] — cancellable sleeps and deadlines
//! - [`CleanupRegistry`] — LIFO shutdown hooks

mod cleanup;
mod journey;
mod scheduler;
mod state;
pub mod timer;
mod wait_group;

pub use cleanup::CleanupRegistry;
pub use journey::{current, reschedule, spawn, teleport, Goer, Journey};
pub use scheduler::Scheduler;
pub use state::JourneyEvent;
pub use wait_group::WaitGroup;
