use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A small positive integer identifying a peer in the cluster.
///
/// Node ids are assigned once at startup (`NODE_ID` in the environment, §6) and
/// never reused within a run: once a node is evicted (see `replob-detector`) its
/// id is retired for good.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(u64);

impl NodeId {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for NodeId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<NodeId> for u64 {
    fn from(id: NodeId) -> Self {
        id.0
    }
}

/// Globally unique id for one broadcast message: `(origin, local monotonic counter)`.
///
/// `Ord` is lexicographic on `(origin, counter)`. Correctness never depends on
/// this order meaning anything causal — it exists purely so a [`CarrySet`] has a
/// deterministic iteration order that every node agrees on (see `replob-core`).
///
/// [`CarrySet`]: https://docs.rs/replob-core
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MessageId {
    origin: NodeId,
    counter: u64,
}

impl MessageId {
    pub const fn new(origin: NodeId, counter: u64) -> Self {
        Self { origin, counter }
    }

    pub const fn origin(self) -> NodeId {
        self.origin
    }

    pub const fn counter(self) -> u64 {
        self.counter
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{},{}}}", self.origin, self.counter)
    }
}

/// Monotonic sequence number of a Replob consensus step.
///
/// The source this runtime is based on kept two numbering domains (one inside
/// `Replob`, one inside its generic `Phantom<Voting>` helper); this crate unifies
/// them into the single domain spec.md calls for, with remote-driven catch-up
/// handled by `replob-core::StepTable`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StepId(u64);

impl StepId {
    pub const ZERO: Self = Self(0);

    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub const fn get(self) -> u64 {
        self.0
    }

    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An ordered set of node ids: a membership snapshot.
///
/// Kept as a `BTreeSet` rather than a hash set so that two nodes computing the
/// "smallest id" tie-break in the availability-timer consistency check (§4.3)
/// never disagree on iteration order.
pub type NodeSet = BTreeSet<NodeId>;
