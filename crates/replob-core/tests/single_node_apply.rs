mod support;

use replob_types::NodeId;
use replob_wire::Command;
use support::Cluster;

/// A lone node always has a majority of one: every proposal commits on the
/// same round-trip that votes for it, with nothing broadcast to wait on.
#[test]
fn five_sequential_proposals_apply_in_order_with_no_peers_to_vote() {
    let mut cluster = Cluster::new(&[1]);
    let node = NodeId::new(1);

    for i in 0..5u64 {
        cluster.propose(node, Command::KvSet { key: "x".into(), value: i.to_string() });
    }

    let log = cluster.applied_log(node);
    assert_eq!(log.len(), 5);
    for (i, command) in log.iter().enumerate() {
        assert_eq!(command, &Command::KvSet { key: "x".into(), value: i.to_string() });
    }
}
