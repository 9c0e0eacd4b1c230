//! # replob-core: the consensus engine
//!
//! [`Replob`] is a pure state machine — it never touches a socket, a clock,
//! or a thread. It takes proposals and incoming protocol messages in, and
//! gives a list of [`Effect`]s out; `replob-net` and `replob::Runtime` are
//! what actually broadcast those messages and arm those timers. Keeping the
//! engine effect-free is what lets its test suite run the whole voting
//! protocol between several simulated nodes with no networking at all.

mod record;
mod step_table;
mod voting;

pub use record::{StepRecord, StepState};
pub use step_table::StepTable;
pub use voting::{is_consistent, Effect, Replob};
