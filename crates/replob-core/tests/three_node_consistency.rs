mod support;

use replob_types::NodeId;
use replob_wire::Command;
use support::Cluster;

/// Three nodes each proposing their own batch of commands end up with
/// identical, fully-ordered logs once every vote has round-tripped — the
/// consensus guarantee the whole crate exists to provide. The harness
/// drives each proposal synchronously to completion rather than truly
/// interleaving network traffic, but every node still merges carry sets it
/// didn't originate, which is the part of the protocol this exercises.
#[test]
fn concurrent_proposals_from_every_node_converge_to_one_sequence() {
    let mut cluster = Cluster::new(&[1, 2, 3]);

    for node_id in [1u64, 2, 3] {
        for k in 1..=10u64 {
            cluster.propose(
                NodeId::new(node_id),
                Command::KvSet {
                    key: "list".into(),
                    value: (10 * k + node_id).to_string(),
                },
            );
        }
    }

    let reference = cluster.applied_log(NodeId::new(1)).to_vec();
    assert_eq!(reference.len(), 30);
    for node_id in [2u64, 3] {
        assert_eq!(
            cluster.applied_log(NodeId::new(node_id)),
            reference.as_slice(),
            "node {node_id} diverged from node 1's applied order"
        );
    }
}
