use replob_types::NodeId;

#[derive(Debug, thiserror::Error)]
pub enum NetError {
    #[error("node {0} is not a known peer")]
    UnknownNode(NodeId),

    #[error("connector to node {0} is disconnected")]
    Disconnected(NodeId),

    #[error(transparent)]
    Wire(#[from] replob_wire::WireError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
