//! # replob-config: cluster configuration and logging setup
//!
//! [`ClusterConfig`] resolves `NODES`/`NODE_ID` from the environment the way
//! `examples/server.h`'s `initNodes()` did. [`RuntimeSettings`] layers the
//! detector/Chronos/Replob tuning knobs on top of that, and [`init_tracing`]
//! wires up `tracing-subscriber` once per binary.

mod cluster;
mod error;
mod logging;
mod settings;

pub use cluster::ClusterConfig;
pub use error::ConfigError;
pub use logging::init_tracing;
pub use settings::RuntimeSettings;
