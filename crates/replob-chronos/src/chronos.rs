use std::collections::{BTreeMap, VecDeque};

use serde::{Deserialize, Serialize};

use replob_types::{NodeId, NodeSet};

/// One scheduled piece of work: `due_ms` is the replicated clock value (see
/// `Command::ChronosAdvanceTo`) at or after which it's eligible to run.
/// `payload` is opaque to this crate — the application decides what it means
/// (`demos/chronos-demo` just carries a label).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledEvent {
    pub id: u64,
    pub due_ms: u64,
    pub payload: Vec<u8>,
}

/// What the driver (`replob::Runtime`) should do in response to a
/// [`Chronos`] state transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChronosEffect {
    /// Run `event` on `node` — the node is the only one allowed to execute
    /// it until a matching [`Chronos::completed`] call frees the slot.
    DispatchTo { node: NodeId, event: ScheduledEvent },
    /// Nothing is due right now; arm the local wall-clock timer for
    /// `after_ms` from now so the next `AdvanceTo` proposal happens on time.
    ArmNextTimer { after_ms: u64 },
}

/// The replicated scheduler itself: a due-time-ordered event table, one
/// execution slot per available node, and a FIFO of events waiting for a
/// free slot.
///
/// Ported from the `Chronos` struct in `examples/chronos.cpp`. Every method
/// here is meant to run only from inside a command already committed by
/// `replob-core` (`ChronosAdvanceTo`, `ChronosCompleted`, or a membership
/// change), so that every node's `Chronos` ends up in the same state after
/// applying the same commits in the same order.
#[derive(Debug, Default)]
pub struct Chronos {
    events: BTreeMap<u64, ScheduledEvent>,
    running: BTreeMap<NodeId, u64>,
    awaiting: VecDeque<u64>,
    available_nodes: NodeSet,
    now_ms: u64,
}

impl Chronos {
    pub fn new(available_nodes: NodeSet) -> Self {
        Self {
            events: BTreeMap::new(),
            running: BTreeMap::new(),
            awaiting: VecDeque::new(),
            available_nodes,
            now_ms: 0,
        }
    }

    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    /// Schedules `event`. If it's already due it joins the awaiting queue
    /// (and is dispatched immediately if a slot is free) rather than waiting
    /// for the next `advance_to`.
    pub fn add_event(&mut self, event: ScheduledEvent) -> Vec<ChronosEffect> {
        let id = event.id;
        let due = event.due_ms;
        self.events.insert(id, event);
        if due <= self.now_ms {
            self.awaiting.push_back(id);
        }
        self.dispatch_ready()
    }

    /// Moves the replicated clock forward, promoting every event now due
    /// into the awaiting queue, then dispatches as many as there are free
    /// slots.
    pub fn advance_to(&mut self, deadline_ms: u64) -> Vec<ChronosEffect> {
        if deadline_ms <= self.now_ms {
            return self.dispatch_ready();
        }
        self.now_ms = deadline_ms;
        let due_ids: Vec<u64> = self
            .events
            .iter()
            .filter(|(&id, e)| e.due_ms <= deadline_ms && !self.awaiting.contains(&id) && !self.running.contains_key_by_event(id))
            .map(|(&id, _)| id)
            .collect();
        for id in due_ids {
            self.awaiting.push_back(id);
        }
        self.dispatch_ready()
    }

    /// `node` finished running `event_id`. Frees its slot and tries to
    /// dispatch the next awaiting event onto it. A completion for an event
    /// `node` isn't currently credited with running is logged and otherwise
    /// ignored — it's a stale duplicate from a node that was already
    /// re-dispatched elsewhere after a removal.
    pub fn completed(&mut self, event_id: u64, node: NodeId) -> Vec<ChronosEffect> {
        match self.running.get(&node) {
            Some(&running_id) if running_id == event_id => {
                self.running.remove(&node);
                self.events.remove(&event_id);
            }
            _ => {
                tracing::debug!(event_id, %node, "ignoring stale chronos completion");
                return Vec::new();
            }
        }
        self.dispatch_ready()
    }

    /// Membership shrank (§4.4): anything `node` was running is put back at
    /// the front of the awaiting queue for immediate re-dispatch.
    ///
    /// This can duplicate execution if `node` finished the handler but was
    /// removed before its `ChronosCompleted` committed — re-dispatch favors
    /// availability over the at-most-once guarantee in that narrow race, a
    /// tradeoff recorded in this workspace's design notes.
    pub fn node_removed(&mut self, node: NodeId) -> Vec<ChronosEffect> {
        self.available_nodes.remove(&node);
        if let Some(event_id) = self.running.remove(&node) {
            self.awaiting.push_front(event_id);
        }
        self.dispatch_ready()
    }

    fn free_node(&self) -> Option<NodeId> {
        self.available_nodes
            .iter()
            .find(|n| !self.running.contains_key(n))
            .copied()
    }

    fn dispatch_ready(&mut self) -> Vec<ChronosEffect> {
        let mut effects = Vec::new();
        while let Some(&event_id) = self.awaiting.front() {
            let Some(node) = self.free_node() else {
                break;
            };
            self.awaiting.pop_front();
            let Some(event) = self.events.get(&event_id).cloned() else {
                continue;
            };
            self.running.insert(node, event_id);
            effects.push(ChronosEffect::DispatchTo { node, event });
        }
        if let Some(next_due) = self.next_due_after(self.now_ms) {
            effects.push(ChronosEffect::ArmNextTimer {
                after_ms: next_due.saturating_sub(self.now_ms),
            });
        }
        effects
    }

    fn next_due_after(&self, now: u64) -> Option<u64> {
        self.events
            .values()
            .map(|e| e.due_ms)
            .filter(|&due| due > now)
            .min()
    }
}

trait RunningLookup {
    fn contains_key_by_event(&self, event_id: u64) -> bool;
}

impl RunningLookup for BTreeMap<NodeId, u64> {
    fn contains_key_by_event(&self, event_id: u64) -> bool {
        self.values().any(|&id| id == event_id)
    }
}
