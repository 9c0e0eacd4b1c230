use std::time::Duration;

use replob_types::{MessageId, NodeId, NodeSet, StepId};
use replob_wire::{CarryEntry, Command, Message};

use crate::record::{StepRecord, StepState};
use crate::step_table::StepTable;

/// Everything a [`Replob`] engine asks its driver to do. The engine itself
/// never touches a socket or a clock — `replob-net`/`replob`'s runtime loop
/// is the thing that turns these into actual sends and timers, which is what
/// lets this crate's tests run the whole protocol in-process with no I/O.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Send `message` to every other node.
    Broadcast(Message),
    /// `step` reached the availability threshold (see [`is_consistent`]);
    /// arm a one-shot timer so slower votes still have a chance to land in
    /// the same step before it commits.
    ArmAvailabilityTimer { step: StepId, after: Duration },
    /// `step` committed: apply `entries` in order, then forget the step.
    /// Each entry keeps the `MessageId` its proposer minted, so the applier
    /// can tell whether a command is the local result of its own
    /// `Runtime::apply_sync` call.
    Apply { step: StepId, entries: Vec<CarryEntry> },
}

/// The all-to-all atomic broadcast engine (ported from `Voting`/`Replob` in
/// `include/synca/once/replob.h`).
///
/// Each node proposes commands into whatever step is currently open
/// ([`Replob::propose`]), gossips its accumulated carry set to every peer on
/// every new vote it sees ([`Replob::handle_vote`]), and once a step's voters
/// are provably a majority (or an exact, deterministically tie-broken half)
/// commits it ([`Replob::handle_availability_timeout`],
/// [`Replob::handle_commit`]). Steps always complete in order (I1 in the
/// design note) because [`StepTable::complete`] only advances past
/// contiguous completions.
pub struct Replob {
    this_node: NodeId,
    membership: NodeSet,
    table: StepTable,
    availability_window: Duration,
    next_counter: u64,
}

impl Replob {
    pub fn new(this_node: NodeId, membership: NodeSet, availability_window: Duration) -> Self {
        Self {
            this_node,
            membership,
            table: StepTable::new(),
            availability_window,
            next_counter: 0,
        }
    }

    pub fn this_node(&self) -> NodeId {
        self.this_node
    }

    pub fn membership(&self) -> &NodeSet {
        &self.membership
    }

    pub fn current_step(&self) -> StepId {
        self.table.current()
    }

    fn next_message_id(&mut self) -> MessageId {
        let id = MessageId::new(self.this_node, self.next_counter);
        self.next_counter += 1;
        id
    }

    /// Proposes `command` into the currently open step, returning the
    /// `MessageId` minted for it (so a caller like `Runtime::apply_sync` can
    /// recognize it again once it's applied) alongside at least a
    /// `Broadcast(Vote)` effect.
    ///
    /// Modeled the same way the design note's Propose paragraph describes
    /// it: a local apply creates the CarryMsg and calls `vote({carryMsg},
    /// thisNode, currentMembership)`, so this goes through the same
    /// [`StepRecord::add_vote`]/[`Replob::vote_effects`] path `handle_vote`
    /// does, just with `from == this_node`.
    pub fn propose(&mut self, command: Command) -> (MessageId, Vec<Effect>) {
        let step = self.table.current();
        let id = self.next_message_id();
        let this_node = self.this_node;
        let membership = self.membership.clone();
        self.table
            .record_mut(step)
            .add_vote(this_node, this_node, &membership, [CarryEntry { id, command }]);
        (id, self.vote_effects(step))
    }

    /// Merges an incoming vote's carry set into `step`, reconciles the
    /// step's membership snapshot, and re-checks whether the step is now
    /// committable (§4.3 steps 1-6).
    pub fn handle_vote(&mut self, step: StepId, from: NodeId, carries: Vec<CarryEntry>) -> Vec<Effect> {
        if step < self.table.current() {
            return Vec::new();
        }
        if self.table.record(step).is_some_and(StepRecord::is_completed) {
            return Vec::new();
        }
        let this_node = self.this_node;
        let membership = self.membership.clone();
        self.table.record_mut(step).add_vote(from, this_node, &membership, carries);
        self.vote_effects(step)
    }

    /// A remote `Commit(step, carries)` arrived: adopt its CarrySet directly
    /// rather than whatever this node's own vote record accumulated (§4.3's
    /// commit transition, `carries := C`) — this is what lets a node that
    /// missed every vote for `step` (e.g. reconnecting mid-partition) still
    /// apply the right thing instead of silently dropping the commit.
    /// Idempotent if already completed.
    pub fn handle_commit(&mut self, step: StepId, carries: Vec<CarryEntry>) -> Vec<Effect> {
        if self.table.record(step).is_some_and(StepRecord::is_completed) {
            return Vec::new();
        }
        self.table.record_mut(step).adopt_carries(carries.clone());
        self.table.complete(step);
        vec![
            Effect::Broadcast(Message::Commit {
                step,
                carries: carries.clone(),
            }),
            Effect::Apply { step, entries: carries },
        ]
    }

    /// The availability timer armed by a previous [`Effect::ArmAvailabilityTimer`]
    /// fired while `step` was still voting. Re-runs `is_consistent` over the
    /// voters seen so far: if consistent, re-enters the vote protocol with
    /// `nodes := voted` (driving the unreachable peers out of this step,
    /// which immediately makes the narrowed set committable); otherwise
    /// gives up and invokes cleanup, dropping every step this node was
    /// tracking rather than risk disagreeing with whatever a better-connected
    /// node independently commits.
    pub fn handle_availability_timeout(&mut self, step: StepId) -> Vec<Effect> {
        let Some(record) = self.table.record(step) else {
            return Vec::new();
        };
        if record.is_completed() {
            return Vec::new();
        }
        if is_consistent(record.voted_nodes(), record.nodes()) {
            self.table.record_mut(step).narrow_nodes_to_voted();
            self.vote_effects(step)
        } else {
            self.table.cleanup();
            Vec::new()
        }
    }

    /// Steps 5-6 of §4.3's vote transition: commit once `voted == nodes`,
    /// otherwise broadcast this node's own vote and arm the availability
    /// timer the first time the record leaves `Initial` (never again —
    /// re-broadcasting on every subsequent vote would echo forever in a
    /// fully connected cluster, and the timer only needs arming once per
    /// step).
    fn vote_effects(&mut self, step: StepId) -> Vec<Effect> {
        let record = self.table.record(step).expect("just inserted");
        let full = record.voted_nodes() == record.nodes();
        let should_broadcast_vote = !full && record.state() == StepState::Initial;
        let carries = if should_broadcast_vote {
            record.carry_entries()
        } else {
            Vec::new()
        };

        if should_broadcast_vote {
            self.table.record_mut(step).mark_voted();
        }

        let mut effects = Vec::new();
        if full {
            effects.extend(self.commit_local(step));
        } else if should_broadcast_vote {
            effects.push(Effect::Broadcast(Message::Vote {
                step,
                from: self.this_node,
                carries,
            }));
            effects.push(Effect::ArmAvailabilityTimer {
                step,
                after: self.availability_window,
            });
        }
        effects
    }

    /// Commits `step` using this node's own accumulated carry set, once it
    /// has locally decided the step is done (full agreement, or a narrowed
    /// `nodes` after an availability timeout). Idempotent if already
    /// completed.
    fn commit_local(&mut self, step: StepId) -> Vec<Effect> {
        let Some(record) = self.table.record(step) else {
            return Vec::new();
        };
        if record.is_completed() {
            return Vec::new();
        }
        let carries = record.carry_entries();
        self.table.complete(step);
        vec![
            Effect::Broadcast(Message::Commit {
                step,
                carries: carries.clone(),
            }),
            Effect::Apply { step, entries: carries },
        ]
    }

    /// Applies a membership change, driven by the command-application layer
    /// once a `Command::RemoveNode` actually commits (§4.4: membership only
    /// ever shrinks, I3).
    pub fn remove_node(&mut self, node: NodeId) {
        self.membership.remove(&node);
    }
}

/// A step is committable once its voters are either:
/// - a strict majority of the membership, or
/// - exactly half, *and* the lowest-id member of the whole membership is
///   among the voters.
///
/// The tie-break makes the decision deterministic: every node computes the
/// same predicate over the same (monotonically growing) voter set, so they
/// all agree on the instant a half-sized set becomes committable without
/// needing another round of communication.
pub fn is_consistent(voted: &NodeSet, membership: &NodeSet) -> bool {
    let voted_count = voted.len();
    let member_count = membership.len();
    if voted_count * 2 > member_count {
        return true;
    }
    if voted_count * 2 == member_count {
        return match (voted.iter().next(), membership.iter().next()) {
            (Some(lowest_voter), Some(lowest_member)) => lowest_voter == lowest_member,
            _ => false,
        };
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn nodes(ids: &[u64]) -> NodeSet {
        ids.iter().map(|&i| NodeId::new(i)).collect()
    }

    #[test_case(&[1], &[1,2,3], false; "single vote of three is not enough")]
    #[test_case(&[1,2], &[1,2,3], true; "two of three is a strict majority")]
    #[test_case(&[1,2], &[1,2,3,4], true; "lowest id present makes an exact half committable")]
    #[test_case(&[2,3], &[1,2,3,4], false; "exact half without the lowest id is not committable")]
    fn consistency_matches_quorum_rule(voted: &[u64], membership: &[u64], expected: bool) {
        assert_eq!(is_consistent(&nodes(voted), &nodes(membership)), expected);
    }

    #[test]
    fn a_lone_node_commits_its_own_proposal_immediately() {
        // `nodes` adopts the singleton membership on propose and `voted`
        // already equals it (this node voted for itself), so this goes
        // straight to commit without ever broadcasting its own vote (§4.3
        // step 5 takes priority over step 6).
        let mut replob = Replob::new(NodeId::new(1), nodes(&[1]), Duration::from_millis(50));
        let (_id, effects) = replob.propose(Command::RemoveNode { node: NodeId::new(9) });
        assert!(matches!(effects[0], Effect::Broadcast(Message::Commit { .. })));
        assert!(matches!(effects[1], Effect::Apply { .. }));
        assert_eq!(replob.current_step(), StepId::new(1));
    }

    #[test]
    fn three_nodes_commit_only_once_all_three_have_voted() {
        let mut replob = Replob::new(NodeId::new(1), nodes(&[1, 2, 3]), Duration::from_millis(50));
        let step = replob.current_step();
        let (_id, effects) = replob.propose(Command::RemoveNode { node: NodeId::new(9) });
        assert!(!effects.iter().any(|e| matches!(e, Effect::Apply { .. })));

        let carries = match &effects[0] {
            Effect::Broadcast(Message::Vote { carries, .. }) => carries.clone(),
            _ => panic!("expected a vote broadcast"),
        };

        let effects = replob.handle_vote(step, NodeId::new(2), carries.clone());
        assert!(
            !effects.iter().any(|e| matches!(e, Effect::Apply { .. })),
            "only two of three voted so far"
        );

        let effects = replob.handle_vote(step, NodeId::new(3), carries);
        assert!(effects.iter().any(|e| matches!(e, Effect::Apply { .. })));
        assert_eq!(replob.current_step(), step.next());
    }

    #[test]
    fn a_vote_is_broadcast_once_not_rebroadcast_on_every_later_vote() {
        let mut replob = Replob::new(NodeId::new(1), nodes(&[1, 2, 3]), Duration::from_millis(50));
        let step = replob.current_step();
        let (_id, effects) = replob.propose(Command::RemoveNode { node: NodeId::new(9) });
        let carries = match &effects[0] {
            Effect::Broadcast(Message::Vote { carries, .. }) => carries.clone(),
            _ => panic!("expected a vote broadcast"),
        };

        // Node 1 already broadcast its own vote once, above. A further vote
        // from a peer that still doesn't complete the step must not trigger
        // a second broadcast of node 1's vote, or an all-to-all cluster
        // would echo every vote forever.
        let effects = replob.handle_vote(step, NodeId::new(2), carries);
        assert!(!effects
            .iter()
            .any(|e| matches!(e, Effect::Broadcast(Message::Vote { from, .. }) if *from == NodeId::new(1))));
    }

    #[test]
    fn receiving_a_vote_counts_this_node_as_a_voter_too() {
        // A pure receiver that never calls `propose` for this step must
        // still count itself, or a full-membership commit can never fire
        // locally no matter how many remote votes arrive.
        let mut replob = Replob::new(NodeId::new(1), nodes(&[1, 2]), Duration::from_millis(50));
        let step = replob.current_step();
        let entry = CarryEntry {
            id: MessageId::new(NodeId::new(2), 0),
            command: Command::RemoveNode { node: NodeId::new(9) },
        };
        let effects = replob.handle_vote(step, NodeId::new(2), vec![entry]);
        assert!(
            effects.iter().any(|e| matches!(e, Effect::Apply { .. })),
            "node 1 should count itself and reach full agreement with node 2's vote"
        );
    }

    #[test]
    fn a_consistent_availability_timeout_on_a_two_node_split_commits_with_nodes_narrowed_to_voted() {
        let mut replob = Replob::new(NodeId::new(1), nodes(&[1, 2]), Duration::from_millis(50));
        let step = replob.current_step();
        replob.propose(Command::RemoveNode { node: NodeId::new(9) });
        // only node 1 (the lowest id) has voted: |voted|*2 == |nodes| and
        // the lowest id is among the voters, so this is consistent.
        let effects = replob.handle_availability_timeout(step);
        assert!(
            effects.iter().any(|e| matches!(e, Effect::Apply { .. })),
            "a consistent split should proceed with nodes := voted and commit"
        );
        assert_eq!(replob.current_step(), step.next());
    }

    #[test]
    fn an_inconsistent_availability_timeout_on_a_two_node_split_invokes_cleanup() {
        let mut replob = Replob::new(NodeId::new(2), nodes(&[1, 2]), Duration::from_millis(50));
        let step = replob.current_step();
        replob.propose(Command::RemoveNode { node: NodeId::new(9) });
        // only node 2 (the higher id) has voted: |voted|*2 == |nodes| but
        // the lowest id (1) isn't among the voters, so this is inconsistent.
        let effects = replob.handle_availability_timeout(step);
        assert!(!effects.iter().any(|e| matches!(e, Effect::Apply { .. })));
        assert_eq!(replob.current_step(), StepId::ZERO, "cleanup rewinds current() back to zero");
    }

    #[test]
    fn a_remote_commit_is_adopted_even_if_this_node_missed_every_vote() {
        // A node reconnecting after a partition has no record at all for
        // `step`, yet must still apply the carries a `Commit` message
        // brings with it rather than committing an empty CarrySet.
        let mut replob = Replob::new(NodeId::new(3), nodes(&[1, 2, 3]), Duration::from_millis(50));
        let step = replob.current_step();
        let entry = CarryEntry {
            id: MessageId::new(NodeId::new(1), 0),
            command: Command::RemoveNode { node: NodeId::new(9) },
        };
        let effects = replob.handle_commit(step, vec![entry.clone()]);
        let entries = effects
            .iter()
            .find_map(|e| match e {
                Effect::Apply { entries, .. } => Some(entries.clone()),
                _ => None,
            })
            .expect("expected an apply effect");
        assert_eq!(entries, vec![entry]);
        assert_eq!(replob.current_step(), step.next());
    }

    #[test]
    fn a_stale_vote_for_an_already_completed_step_is_ignored() {
        let mut replob = Replob::new(NodeId::new(1), nodes(&[1]), Duration::from_millis(50));
        replob.propose(Command::RemoveNode { node: NodeId::new(9) });
        let effects = replob.handle_vote(StepId::ZERO, NodeId::new(2), Vec::new());
        assert!(effects.is_empty());
    }

    proptest::proptest! {
        /// Whatever the membership, a voter set that covers every member is
        /// always committable — the weakest form of the quorum rule, and
        /// the one a regression here would be most likely to break.
        #[test]
        fn full_membership_is_always_consistent(member_ids in proptest::collection::hash_set(1u64..1000, 1..16)) {
            let membership: NodeSet = member_ids.iter().map(|&id| NodeId::new(id)).collect();
            proptest::prop_assert!(is_consistent(&membership, &membership));
        }

        /// Adding a voter never turns a committable set back into a
        /// non-committable one.
        #[test]
        fn consistency_is_monotonic_in_the_voter_set(
            member_ids in proptest::collection::hash_set(1u64..1000, 2..16),
            extra_voter_idx in 0usize..16,
        ) {
            let membership: NodeSet = member_ids.iter().map(|&id| NodeId::new(id)).collect();
            let members: Vec<NodeId> = membership.iter().copied().collect();
            let mut voted = NodeSet::new();
            for &node in members.iter().take(members.len() / 2) {
                voted.insert(node);
            }
            if is_consistent(&voted, &membership) {
                let idx = extra_voter_idx % members.len();
                voted.insert(members[idx]);
                proptest::prop_assert!(is_consistent(&voted, &membership));
            }
        }
    }
}
