use std::collections::HashMap;

use replob_chronos::{Chronos, ChronosEffect, ScheduledEvent};
use replob_types::NodeId;

const EVENT_COUNT: u64 = 50;
const INTERVAL_MS: u64 = 3000;
const HANDLER_DURATION_MS: u64 = 1000;
const STEP_MS: u64 = 250;

/// Drives a three-node [`Chronos`] through fifty staggered events, each
/// simulated to take one second once dispatched, checking that at most
/// three ever run at once (one per node) and that removing a node
/// mid-stream re-dispatches its in-flight event onto a survivor instead of
/// losing it.
#[test]
fn fifty_events_drain_with_at_most_three_in_flight_and_survive_a_node_removal() {
    let mut chronos = Chronos::new([1, 2, 3].into_iter().map(NodeId::new).collect());
    let mut running: HashMap<NodeId, (u64, u64)> = HashMap::new();

    for i in 0..EVENT_COUNT {
        let effects = chronos.add_event(ScheduledEvent {
            id: i,
            due_ms: i * INTERVAL_MS,
            payload: Vec::new(),
        });
        apply(&chronos, &mut running, effects);
    }

    let mut completed_per_node: HashMap<NodeId, u64> = HashMap::new();
    let mut total_completed = 0u64;
    let mut node_two_removed = false;

    let mut now = 0u64;
    let deadline = EVENT_COUNT * INTERVAL_MS + HANDLER_DURATION_MS * 4;
    while now <= deadline && total_completed < EVENT_COUNT {
        now += STEP_MS;

        if !node_two_removed && now >= (EVENT_COUNT / 2) * INTERVAL_MS {
            node_two_removed = true;
            running.retain(|&node, _| node != NodeId::new(2));
            let effects = chronos.node_removed(NodeId::new(2));
            apply(&chronos, &mut running, effects);
        }

        let effects = chronos.advance_to(now);
        apply(&chronos, &mut running, effects);

        assert!(running.len() <= 3, "never more than one event per node");

        let finished: Vec<NodeId> = running
            .iter()
            .filter(|&(_, &(_, complete_at))| complete_at <= now)
            .map(|(&node, _)| node)
            .collect();
        for node in finished {
            let (event_id, _) = running.remove(&node).unwrap();
            *completed_per_node.entry(node).or_default() += 1;
            total_completed += 1;
            let effects = chronos.completed(event_id, node);
            apply(&chronos, &mut running, effects);
        }
    }

    assert_eq!(total_completed, EVENT_COUNT, "every event eventually completes");
    assert!(node_two_removed);
    assert_eq!(completed_per_node.values().sum::<u64>(), EVENT_COUNT);
    // Node 2 stops taking new work once removed partway through, so only
    // nodes 1 and 3 are expected to land near an even three-way split.
    for node in [NodeId::new(1), NodeId::new(3)] {
        let count = completed_per_node.get(&node).copied().unwrap_or(0);
        assert!(count >= 15, "node {node} only ran {count} events after picking up node 2's slack");
    }
}

fn apply(chronos: &Chronos, running: &mut HashMap<NodeId, (u64, u64)>, effects: Vec<ChronosEffect>) {
    for effect in effects {
        if let ChronosEffect::DispatchTo { node, event } = effect {
            running.insert(node, (event.id, chronos.now_ms() + HANDLER_DURATION_MS));
        }
    }
}
