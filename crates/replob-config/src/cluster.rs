use std::env;

use replob_types::{Endpoint, NodeId};

use crate::error::ConfigError;

/// Node ids in a run are `1..=NODES`, matching `initNodes()`'s bound in
/// `examples/server.h`; the source didn't document why 20, so this crate
/// keeps the same cap rather than inventing a new one.
const MAX_NODES: u64 = 20;

const ENV_NODES: &str = "NODES";
const ENV_NODE_ID: &str = "NODE_ID";
const BASE_PORT: u16 = 8800;

/// Cluster membership derived from the environment: how many nodes there
/// are, which one this process is, and where every peer listens.
///
/// Every node binds `127.0.0.1:{8800 + id}` — `getEnvInt`/`c_nodes`/
/// `c_nodeId` in `examples/server.h` is the direct source for both the
/// variable names and the port formula.
#[derive(Debug, Clone)]
pub struct ClusterConfig {
    pub node_count: u64,
    pub this_node: NodeId,
}

impl ClusterConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let node_count = read_env_int(ENV_NODES)?;
        if node_count == 0 || node_count > MAX_NODES {
            return Err(ConfigError::NodeCountOutOfRange {
                actual: node_count,
                max: MAX_NODES,
            });
        }
        let node_id = read_env_int(ENV_NODE_ID)?;
        if node_id == 0 || node_id > node_count {
            return Err(ConfigError::NodeIdOutOfRange {
                actual: node_id,
                nodes: node_count,
            });
        }
        Ok(Self {
            node_count,
            this_node: NodeId::new(node_id),
        })
    }

    /// The `(NodeId, Endpoint)` pairs for every node in the cluster,
    /// including this one.
    pub fn all_endpoints(&self) -> Vec<(NodeId, Endpoint)> {
        (1..=self.node_count)
            .map(|id| (NodeId::new(id), Self::endpoint_for(id)))
            .collect()
    }

    pub fn this_endpoint(&self) -> Endpoint {
        Self::endpoint_for(self.this_node.get())
    }

    fn endpoint_for(id: u64) -> Endpoint {
        Endpoint::loopback(BASE_PORT + id as u16)
    }
}

fn read_env_int(name: &'static str) -> Result<u64, ConfigError> {
    let value = env::var(name).map_err(|_| ConfigError::MissingEnv(name))?;
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidInt { name, value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn endpoints_use_the_8800_plus_id_formula() {
        let _lock = ENV_LOCK.lock().unwrap();
        env::set_var(ENV_NODES, "3");
        env::set_var(ENV_NODE_ID, "2");
        let config = ClusterConfig::from_env().unwrap();
        assert_eq!(config.this_endpoint().socket_addr_string(), "127.0.0.1:8802");
        assert_eq!(config.all_endpoints().len(), 3);
        env::remove_var(ENV_NODES);
        env::remove_var(ENV_NODE_ID);
    }

    #[test]
    fn rejects_a_node_id_outside_the_cluster() {
        let _lock = ENV_LOCK.lock().unwrap();
        env::set_var(ENV_NODES, "2");
        env::set_var(ENV_NODE_ID, "5");
        assert!(matches!(
            ClusterConfig::from_env(),
            Err(ConfigError::NodeIdOutOfRange { .. })
        ));
        env::remove_var(ENV_NODES);
        env::remove_var(ENV_NODE_ID);
    }
}
