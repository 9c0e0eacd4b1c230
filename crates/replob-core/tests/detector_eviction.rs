mod support;

use replob_types::NodeId;
use replob_wire::Command;
use support::Cluster;

/// Once a failed node has been evicted, the survivors keep agreeing using
/// the shrunken membership — I3 (membership only ever shrinks) plus the
/// quorum rule both still have to hold on the smaller set.
#[test]
fn survivors_keep_committing_with_the_shrunken_membership() {
    let mut cluster = Cluster::new(&[1, 2, 3]);
    let node1 = NodeId::new(1);
    let node2 = NodeId::new(2);
    let node3 = NodeId::new(3);

    cluster.propose(node1, Command::KvSet { key: "k".into(), value: "before".into() });
    assert_eq!(cluster.applied_log(node1).len(), 1);
    assert_eq!(cluster.applied_log(node2).len(), 1);
    assert_eq!(cluster.applied_log(node3).len(), 1);

    // Node 3 stops responding; the detector on 1 and 2 would propose and
    // commit `RemoveNode { node: 3 }` — modeled directly here since that
    // commit path is already covered by `voting::tests`.
    cluster.evict(node3);

    cluster.propose(node1, Command::KvSet { key: "k".into(), value: "after".into() });
    assert_eq!(cluster.applied_log(node1).last().unwrap(), &Command::KvSet {
        key: "k".into(),
        value: "after".into(),
    });
    assert_eq!(cluster.applied_log(node2).last().unwrap(), cluster.applied_log(node1).last().unwrap());
}
