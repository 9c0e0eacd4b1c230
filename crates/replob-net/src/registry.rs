use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use replob_journey::Scheduler;
use replob_types::{Endpoint, NodeId, NodeSet};
use replob_wire::Message;

use crate::connector::Connector;
use crate::error::NetError;

/// Static membership: which node this process is, and where every peer
/// listens. Mirrors `NodesConfig` in the source (`addNode`/`removeNode`/
/// `thisNode`/`otherNodes`).
#[derive(Debug, Clone)]
pub struct NodesConfig {
    this_node: NodeId,
    endpoints: HashMap<NodeId, Endpoint>,
}

impl NodesConfig {
    pub fn new(this_node: NodeId) -> Self {
        Self {
            this_node,
            endpoints: HashMap::new(),
        }
    }

    pub fn add_node(&mut self, node: NodeId, endpoint: Endpoint) {
        self.endpoints.insert(node, endpoint);
    }

    pub fn remove_node(&mut self, node: NodeId) {
        self.endpoints.remove(&node);
    }

    pub fn this_node(&self) -> NodeId {
        self.this_node
    }

    pub fn endpoint(&self, node: NodeId) -> Option<&Endpoint> {
        self.endpoints.get(&node)
    }

    pub fn nodes(&self) -> NodeSet {
        self.endpoints.keys().copied().collect()
    }

    pub fn other_nodes(&self) -> NodeSet {
        self.endpoints
            .keys()
            .copied()
            .filter(|&n| n != self.this_node)
            .collect()
    }
}

/// The live set of outbound [`Connector`]s, one per peer, plus the
/// broadcast/unicast send helpers every other crate uses to talk to the
/// cluster. Corresponds to `Nodes` in the source.
pub struct Nodes {
    config: RwLock<NodesConfig>,
    connectors: RwLock<HashMap<NodeId, Arc<Connector>>>,
    scheduler: Scheduler,
}

impl Nodes {
    pub fn new(config: NodesConfig, scheduler: Scheduler) -> Arc<Self> {
        let connectors = config
            .endpoints
            .iter()
            .filter(|(&node, _)| node != config.this_node)
            .map(|(&node, endpoint)| (node, Arc::new(Connector::new(node, endpoint.clone()))))
            .collect();
        Arc::new(Self {
            config: RwLock::new(config),
            connectors: RwLock::new(connectors),
            scheduler,
        })
    }

    pub fn this_node(&self) -> NodeId {
        self.config.read().expect("nodes config poisoned").this_node()
    }

    pub fn other_nodes(&self) -> NodeSet {
        self.config.read().expect("nodes config poisoned").other_nodes()
    }

    /// Adds a peer, opening no connection until the first send to it.
    pub fn add_node(&self, node: NodeId, endpoint: Endpoint) {
        self.config
            .write()
            .expect("nodes config poisoned")
            .add_node(node, endpoint.clone());
        if node != self.this_node() {
            self.connectors
                .write()
                .expect("connectors poisoned")
                .entry(node)
                .or_insert_with(|| Arc::new(Connector::new(node, endpoint)));
        }
    }

    /// Permanently disconnects and forgets a peer — the only membership
    /// change the failure detector ever applies (I3: membership only
    /// shrinks).
    pub fn remove_node(&self, node: NodeId) {
        self.config.write().expect("nodes config poisoned").remove_node(node);
        if let Some(connector) = self.connectors.write().expect("connectors poisoned").remove(&node) {
            connector.disconnect();
        }
    }

    fn connector(&self, node: NodeId) -> Result<Arc<Connector>, NetError> {
        self.connectors
            .read()
            .expect("connectors poisoned")
            .get(&node)
            .cloned()
            .ok_or(NetError::UnknownNode(node))
    }

    pub async fn send(&self, node: NodeId, message: Message) -> Result<(), NetError> {
        self.connector(node)?.send(&message).await
    }

    /// Fans `message` out to every other known node, one journey per peer —
    /// matching `broadcast()`'s `go()`-per-peer shape in the source, so one
    /// slow/unreachable peer never blocks delivery to the rest.
    pub fn broadcast(&self, message: Message) {
        for node in self.other_nodes() {
            if let Ok(connector) = self.connector(node) {
                let message = message.clone();
                replob_journey::spawn(&self.scheduler, move || async move {
                    if let Err(error) = connector.send(&message).await {
                        tracing::debug!(node = %connector.node(), %error, "broadcast send failed");
                    }
                });
            }
        }
    }
}
