//! # replob-net: TCP transport
//!
//! One [`Connector`] per peer, a [`Nodes`] registry that owns all of them and
//! exposes `send`/`broadcast`, and [`listener::serve`] for the accept loop.
//! Grounded on `src/connector.cpp`, `src/node.cpp` and `src/network.cpp`,
//! rebuilt on `tokio::net` instead of `boost::asio`.

mod connector;
mod error;
mod listener;
mod registry;

pub use connector::Connector;
pub use error::NetError;
pub use listener::serve;
pub use registry::{Nodes, NodesConfig};
