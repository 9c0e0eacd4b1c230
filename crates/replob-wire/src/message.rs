use serde::{Deserialize, Serialize};

use replob_types::{MessageId, NodeId, StepId};

/// Application-level command carried to consensus.
///
/// The source dispatched these through a closure-pointer diff (`AnyMsg`,
/// literally the "gotcha!" type in `node.h`) that relied on every node loading
/// the identical binary. This enum replaces that with an explicit, versionable
/// wire schema: every node-removal, scheduler tick and demo KV operation is a
/// named variant instead of a function pointer offset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    /// Shrinks membership (§4.4's failure detector is the only producer of
    /// this in the base runtime; membership never grows back, I3).
    RemoveNode { node: NodeId },
    /// Chronos proposing to advance the replicated clock to `deadline_ms`
    /// (§4.5), committing the next batch of due events.
    ChronosAdvanceTo { deadline_ms: u64 },
    /// Chronos recording that `node` finished running event `event_id`,
    /// releasing its execution slot.
    ChronosCompleted { event_id: u64, node: NodeId },
    /// Adds a new event to every node's Chronos identically — scheduling
    /// itself goes through consensus so no two nodes ever disagree about
    /// what's on the calendar.
    ChronosSchedule { event_id: u64, due_ms: u64, payload: Vec<u8> },
    /// `demos/kv-store`: replicated key/value write.
    KvSet { key: String, value: String },
}

/// One proposal carried inside a [`Message::Vote`], tagged with the id the
/// proposing node minted for it (`MessageId`, §6).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarryEntry {
    pub id: MessageId,
    pub command: Command,
}

/// Replob's own all-to-all protocol traffic, plus the detector's heartbeat
/// pulse (§4.4 — not itself part of consensus, just keeps `Message` a single
/// wire type per connection as the design note in SPEC_FULL.md calls for).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Message {
    /// A node's vote for step `step`, carrying every command it knows about
    /// for that step (its own proposals plus whatever it has seen relayed).
    Vote {
        step: StepId,
        from: NodeId,
        carries: Vec<CarryEntry>,
    },
    /// Sent once `step` is known consistent (§4.3's `isConsistent`): carries
    /// the final, locked-in CarrySet so a node that missed every `Vote` for
    /// this step (e.g. reconnecting after a partition) can still adopt and
    /// apply it rather than dropping the commit with nothing to apply.
    Commit {
        step: StepId,
        carries: Vec<CarryEntry>,
    },
    /// Liveness pulse, §4.4. Not voted on; purely informational.
    Heartbeat { from: NodeId, sequence: u64 },
}
