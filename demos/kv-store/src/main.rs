//! Replicated key/value store: every node applies the same `KvSet`
//! commands in the same order, so each ends up with an identical table.
//! Ported from `examples/kv.cpp`, where only node 1 ever issues writes
//! (`starter()` runs `kv()` solely on node 1) — this demo keeps that shape
//! via `--set key=value` flags, honored only when `NODE_ID=1`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use clap::Parser;

use replob::{ClusterConfig, Command, Runtime, RuntimeHooks, RuntimeSettings, Scheduler};

#[derive(Parser)]
#[command(about = "Replicated key/value store demo")]
struct Args {
    /// `key=value` pairs to write once this node has started. Only honored
    /// on node 1, matching the source's single-writer demo scenario.
    #[arg(long = "set")]
    sets: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    replob_config::init_tracing();
    let args = Args::parse();
    let cluster = ClusterConfig::from_env()?;
    let settings = RuntimeSettings::load()?;
    let scheduler = Scheduler::current("kv-store-demo");

    let table: Arc<Mutex<HashMap<String, String>>> = Arc::new(Mutex::new(HashMap::new()));
    let hook_table = table.clone();
    let app_hook = Arc::new(move |command: Command| {
        if let Command::KvSet { key, value } = command {
            hook_table.lock().expect("kv table poisoned").insert(key, value);
        }
    });

    let this_node = cluster.this_node;
    let runtime = Runtime::start(
        cluster,
        settings,
        scheduler,
        RuntimeHooks {
            app_hook: Some(app_hook),
            chronos_handler: None,
        },
    )
    .await?;

    if this_node.get() == 1 {
        for pair in &args.sets {
            let Some((key, value)) = pair.split_once('=') else {
                tracing::warn!(pair, "ignoring --set argument without '='");
                continue;
            };
            runtime.propose(Command::KvSet {
                key: key.to_string(),
                value: value.to_string(),
            });
        }
    }

    loop {
        tokio::time::sleep(Duration::from_secs(2)).await;
        let snapshot = table.lock().expect("kv table poisoned").clone();
        tracing::info!(?snapshot, "kv store state");
    }
}
