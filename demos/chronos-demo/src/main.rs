//! Schedules a batch of events at staggered deadlines and runs each on
//! whichever node Chronos dispatches it to, printing a running completion
//! count. Mirrors `example1`/`example2`/`example3` in `examples/chronos.cpp`,
//! which exercise 3 concurrent execution slots against 50 scheduled events.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use replob::{ClusterConfig, Runtime, RuntimeHooks, RuntimeSettings, ScheduledEvent, Scheduler};

#[derive(Parser)]
#[command(about = "Chronos scheduler demo")]
struct Args {
    /// Number of events node 1 schedules at startup.
    #[arg(long, default_value_t = 50)]
    events: u64,

    /// Milliseconds between each event's due time.
    #[arg(long, default_value_t = 100)]
    spacing_ms: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    replob_config::init_tracing();
    let args = Args::parse();
    let cluster = ClusterConfig::from_env()?;
    let settings = RuntimeSettings::load()?;
    let scheduler = Scheduler::current("chronos-demo");

    let completed = Arc::new(AtomicU64::new(0));
    let handler_completed = completed.clone();
    let chronos_handler = Arc::new(move |event: ScheduledEvent| {
        let completed = handler_completed.clone();
        Box::pin(async move {
            tracing::debug!(event_id = event.id, "running chronos event");
            tokio::time::sleep(Duration::from_millis(20)).await;
            completed.fetch_add(1, Ordering::Relaxed);
        }) as std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send>>
    });

    let this_node = cluster.this_node;
    let runtime = Runtime::start(
        cluster,
        settings,
        scheduler,
        RuntimeHooks {
            app_hook: None,
            chronos_handler: Some(chronos_handler),
        },
    )
    .await?;

    if this_node.get() == 1 {
        for i in 0..args.events {
            runtime.schedule_event(ScheduledEvent {
                id: i,
                due_ms: i * args.spacing_ms,
                payload: Vec::new(),
            });
        }
    }

    loop {
        tokio::time::sleep(Duration::from_secs(1)).await;
        tracing::info!(completed = completed.load(Ordering::Relaxed), total = args.events, "progress");
    }
}
