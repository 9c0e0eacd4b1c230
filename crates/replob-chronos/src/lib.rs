//! # replob-chronos: the replicated time-triggered scheduler
//!
//! [`Chronos`] is, like `replob-core`, a pure state machine: `advance_to`,
//! `completed` and `node_removed` are the only ways its state changes, and
//! each returns the [`ChronosEffect`]s the runtime should carry out. Every
//! node applies the same sequence of committed commands to an identical
//! `Chronos`, so they agree on dispatch decisions without extra
//! coordination beyond what `replob-core` already provides.

mod chronos;

pub use chronos::{Chronos, ChronosEffect, ScheduledEvent};
