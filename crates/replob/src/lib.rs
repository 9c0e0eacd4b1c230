//! # replob: node runtime facade
//!
//! ```text
//!          ┌─────────────┐   heartbeats    ┌──────────────────┐
//!          │ replob-     │◄───────────────►│  replob-net       │
//!          │ detector    │  removeNode     │  (Nodes/Connector)│
//!          └─────┬───────┘  proposals      └─────────┬─────────┘
//!                │                                    │ Vote/Commit
//!                ▼                                    ▼
//!          ┌─────────────────────────────────────────────┐
//!          │                 replob-core                  │
//!          │         (Replob: voting, step table)         │
//!          └─────────────────────┬─────────────────────────┘
//!                                │ Apply(commands)
//!                                ▼
//!          ┌─────────────────────────────────────────────┐
//!          │                replob-chronos                 │
//!          │   (event heap, execution slots, dispatch)     │
//!          └─────────────────────────────────────────────┘
//! ```
//!
//! [`Runtime`] is the only type most binaries touch directly: it owns one
//! node's consensus engine, transport, detector and Chronos, and turns
//! [`replob_core::Effect`]/[`replob_chronos::ChronosEffect`] into actual
//! network sends and timers running on `replob-journey`.

mod error;
mod runtime;

pub use error::RuntimeError;
pub use runtime::{AppHook, ChronosHandler, Runtime, RuntimeHooks};

pub use replob_chronos::ScheduledEvent;
pub use replob_config::{ClusterConfig, RuntimeSettings};
pub use replob_journey::Scheduler;
pub use replob_types::{NodeId, NodeSet};
pub use replob_wire::Command;
