use std::collections::BTreeMap;

use replob_types::{MessageId, NodeId, NodeSet};
use replob_wire::{CarryEntry, Command};

/// A step's position in the vote transition (spec §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepState {
    Initial,
    Voted,
    Completed,
}

impl Default for StepState {
    fn default() -> Self {
        StepState::Initial
    }
}

/// Everything known about one consensus step: the membership snapshot it's
/// operating over, who has voted against that snapshot, which commands have
/// been carried into it so far, and its state.
///
/// `carries` is a `BTreeMap` keyed by `MessageId` so two nodes merging the
/// same carry set always iterate commands in the same order — that order
/// *is* the apply order once the step commits.
#[derive(Debug, Default, Clone)]
pub struct StepRecord {
    state: StepState,
    nodes: NodeSet,
    voted_nodes: NodeSet,
    carries: BTreeMap<MessageId, Command>,
}

impl StepRecord {
    /// Merges an incoming (or locally originated) vote's carries, reconciles
    /// `nodes` against the voter's view of membership, and adds `from` and
    /// `this_node` to the voted set — steps 2-4 of §4.3's vote transition.
    ///
    /// `nodes` starts empty and adopts the first membership it sees. If a
    /// later vote disagrees (a peer was evicted mid-step), the record resets
    /// to `Initial`, narrows `nodes` to the intersection, and clears `voted`
    /// so survivors converge on the smallest common live set.
    pub fn add_vote(
        &mut self,
        from: NodeId,
        this_node: NodeId,
        membership: &NodeSet,
        carries: impl IntoIterator<Item = CarryEntry>,
    ) {
        for entry in carries {
            self.carries.entry(entry.id).or_insert(entry.command);
        }

        if self.nodes.is_empty() {
            self.nodes = membership.clone();
        } else if &self.nodes != membership {
            self.state = StepState::Initial;
            self.nodes = self.nodes.intersection(membership).copied().collect();
            self.voted_nodes.clear();
        }

        self.voted_nodes.insert(from);
        self.voted_nodes.insert(this_node);
    }

    pub fn state(&self) -> StepState {
        self.state
    }

    /// Transitions `Initial` -> `Voted`; a no-op from any other state.
    pub fn mark_voted(&mut self) {
        if self.state == StepState::Initial {
            self.state = StepState::Voted;
        }
    }

    /// Narrows `nodes` down to whoever actually voted — the availability
    /// timer's "re-enter the vote protocol with `nodes := voted`" (§4.3).
    /// Since `voted` is by definition a subset of the old `nodes`, this
    /// makes `voted_nodes() == nodes()` true immediately.
    pub fn narrow_nodes_to_voted(&mut self) {
        self.nodes = self.voted_nodes.clone();
    }

    pub fn nodes(&self) -> &NodeSet {
        &self.nodes
    }

    pub fn voted_nodes(&self) -> &NodeSet {
        &self.voted_nodes
    }

    pub fn carry_entries(&self) -> Vec<CarryEntry> {
        self.carries
            .iter()
            .map(|(&id, command)| CarryEntry {
                id,
                command: command.clone(),
            })
            .collect()
    }

    /// Replaces the carry set wholesale with a remote commit's final
    /// CarrySet, so a node that missed every vote for this step still ends
    /// up applying the right thing (§4.3's commit transition: `carries := C`).
    pub fn adopt_carries(&mut self, carries: impl IntoIterator<Item = CarryEntry>) {
        self.carries = carries.into_iter().map(|entry| (entry.id, entry.command)).collect();
    }

    pub fn is_completed(&self) -> bool {
        self.state == StepState::Completed
    }

    pub fn mark_completed(&mut self) {
        self.state = StepState::Completed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(origin: u64, counter: u64) -> CarryEntry {
        CarryEntry {
            id: MessageId::new(NodeId::new(origin), counter),
            command: Command::KvSet {
                key: "k".into(),
                value: "v".into(),
            },
        }
    }

    fn nodes(ids: &[u64]) -> NodeSet {
        ids.iter().map(|&id| NodeId::new(id)).collect()
    }

    #[test]
    fn first_vote_adopts_the_membership_it_carries() {
        let mut record = StepRecord::default();
        let membership = nodes(&[1, 2, 3]);

        record.add_vote(NodeId::new(2), NodeId::new(1), &membership, [entry(1, 0)]);

        assert_eq!(record.nodes(), &membership);
        assert_eq!(record.voted_nodes(), &nodes(&[1, 2]));
        assert_eq!(record.state(), StepState::Initial);
    }

    #[test]
    fn a_disagreeing_membership_resets_to_initial_and_narrows_to_the_intersection() {
        let mut record = StepRecord::default();
        record.add_vote(NodeId::new(2), NodeId::new(1), &nodes(&[1, 2, 3]), [entry(1, 0)]);
        record.mark_voted();
        assert_eq!(record.state(), StepState::Voted);

        record.add_vote(NodeId::new(3), NodeId::new(1), &nodes(&[1, 3, 4]), []);

        assert_eq!(record.state(), StepState::Initial, "membership mismatch resets the transition");
        assert_eq!(record.nodes(), &nodes(&[1, 3]), "narrows to the intersection");
        assert_eq!(record.voted_nodes(), &nodes(&[1, 3]), "stale voters are cleared, then re-added");
    }
}
