use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use replob_journey::{reschedule, timer, Goer, Scheduler};
use replob_types::NodeId;

/// Tracks the last time each peer was heard from and raises `on_stale` once
/// a peer has gone quiet for longer than `threshold`.
///
/// Grounded on the `Detector` struct in `examples/chronos.cpp` and
/// `examples/failure_detector.cpp`: a periodic pulse broadcast by the
/// runtime keeps every live peer's entry fresh, and a periodic scan here
/// finds the ones that fell silent. The decision of *what* to do about a
/// stale peer is left to the caller — proposing `Command::RemoveNode`
/// requires a live `Replob` engine, which this crate has no dependency on,
/// so it's wired up by whatever owns both (`replob::Runtime`).
pub struct Detector {
    pulse_interval: Duration,
    threshold: Duration,
    last_seen: Mutex<HashMap<NodeId, Instant>>,
}

impl Detector {
    pub fn new(pulse_interval: Duration, threshold: Duration) -> Arc<Self> {
        Arc::new(Self {
            pulse_interval,
            threshold,
            last_seen: Mutex::new(HashMap::new()),
        })
    }

    /// Records a heartbeat (or any other traffic) from `node` at the given
    /// instant.
    pub fn record(&self, node: NodeId, now: Instant) {
        self.last_seen.lock().expect("detector map poisoned").insert(node, now);
    }

    /// Erases `node`'s entry. Only call this once its removal has actually
    /// committed (not merely been proposed) — erasing earlier would let a
    /// peer that's still alive but slow to vote get proposed for removal
    /// again on every scan in between.
    pub fn forget(&self, node: NodeId) {
        self.last_seen.lock().expect("detector map poisoned").remove(&node);
    }

    fn scan(&self, known: &[NodeId], now: Instant) -> Vec<NodeId> {
        let mut map = self.last_seen.lock().expect("detector map poisoned");
        let mut stale = Vec::new();
        for &node in known {
            let last = *map.entry(node).or_insert(now);
            if now.duration_since(last) >= self.threshold {
                stale.push(node);
            }
        }
        stale
    }

    /// Spawns the pulse/scan loop as a journey. `broadcast_pulse` sends the
    /// heartbeat to every peer; `known_nodes` returns current membership for
    /// the staleness scan; `on_stale` is called once per peer per scan while
    /// it remains stale (callers should make proposing `RemoveNode` a no-op
    /// for a node that's already been proposed, same as `replob-core`
    /// deduplicates via its step table).
    pub fn run(
        self: &Arc<Self>,
        scheduler: &Scheduler,
        sequence_start: u64,
        mut broadcast_pulse: impl FnMut(u64) + Send + 'static,
        known_nodes: impl Fn() -> Vec<NodeId> + Send + 'static,
        mut on_stale: impl FnMut(NodeId) + Send + 'static,
    ) -> Goer {
        let detector = self.clone();
        replob_journey::spawn(scheduler, move || async move {
            let mut sequence = sequence_start;
            loop {
                broadcast_pulse(sequence);
                sequence += 1;
                for node in detector.scan(&known_nodes(), Instant::now()) {
                    on_stale(node);
                }
                if timer::sleep(detector.pulse_interval).await.is_err() {
                    break;
                }
                reschedule().await;
            }
        })
    }
}
