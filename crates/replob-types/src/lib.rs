//! # replob-types: core identifiers and data model for the replob runtime
//!
//! This crate contains the small, `Copy`-friendly identifiers shared across every
//! other crate in the workspace:
//!
//! - Node identity ([`NodeId`], [`Endpoint`], [`NodeSet`])
//! - Message identity ([`MessageId`])
//! - Consensus step identity ([`StepId`])
//!
//! None of these types know anything about networking, consensus, or scheduling —
//! they are pure value types, kept here so that `replob-wire`, `replob-net`,
//! `replob-core`, `replob-detector` and `replob-chronos` can all depend on the same
//! definitions without depending on each other.

mod endpoint;
mod ids;

pub use endpoint::{AddressFamily, Endpoint};
pub use ids::{MessageId, NodeId, NodeSet, StepId};
