//! Starts a node and periodically logs current membership, so killing one
//! process in a multi-node run visibly shrinks the set once the remaining
//! nodes' detectors time it out and commit its removal. Ported from
//! `examples/failure_detector.cpp`'s `Detector` demo.

use std::time::Duration;

use replob::{ClusterConfig, Runtime, RuntimeHooks, RuntimeSettings, Scheduler};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    replob_config::init_tracing();
    let cluster = ClusterConfig::from_env()?;
    let settings = RuntimeSettings::load()?;
    let scheduler = Scheduler::current("detector-demo");

    let runtime = Runtime::start(cluster, settings, scheduler, RuntimeHooks::default()).await?;

    loop {
        tokio::time::sleep(Duration::from_secs(1)).await;
        tracing::info!(this_node = %runtime.this_node(), membership = ?runtime.membership(), "membership snapshot");
    }
}
