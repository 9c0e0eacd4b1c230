use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use replob_chronos::{Chronos, ChronosEffect, ScheduledEvent};
use replob_config::{ClusterConfig, RuntimeSettings};
use replob_core::{Effect, Replob};
use replob_detector::Detector;
use replob_journey::{timer, JourneyEvent, Scheduler, WaitGroup};
use replob_net::{Nodes, NodesConfig};
use replob_types::{MessageId, NodeId, NodeSet};
use replob_wire::{Command, Message};

use crate::error::RuntimeError;

/// Invoked for every committed application command (currently just
/// `Command::KvSet`) — `demos/kv-store` uses this to update its local table.
pub type AppHook = Arc<dyn Fn(Command) + Send + Sync>;

/// Invoked to actually run one Chronos event on the node it was dispatched
/// to; `demos/chronos-demo` supplies this.
pub type ChronosHandler =
    Arc<dyn Fn(ScheduledEvent) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

fn noop_app_hook() -> AppHook {
    Arc::new(|_| {})
}

fn noop_chronos_handler() -> ChronosHandler {
    Arc::new(|_| Box::pin(async {}))
}

/// One running node: the consensus engine, its transport, the failure
/// detector and Chronos, wired together the way `examples/server.h`'s
/// `Server` ties a node's pieces together at startup.
pub struct Runtime {
    this_node: NodeId,
    nodes: Arc<Nodes>,
    replob: Mutex<Replob>,
    chronos: Mutex<Chronos>,
    detector: Arc<Detector>,
    scheduler: Scheduler,
    cleanup: replob_journey::CleanupRegistry,
    app_hook: AppHook,
    chronos_handler: ChronosHandler,
    /// Origin-only done-handles for `apply_sync`, keyed by the `MessageId`
    /// `Replob::propose` minted for the pending command. Only the node that
    /// proposed a command ever has an entry here, which is what makes the
    /// done-signal origin-only without any extra wire traffic.
    pending_applies: Mutex<HashMap<MessageId, Arc<WaitGroup>>>,
}

/// Builder-style optional hooks for [`Runtime::start`].
#[derive(Default)]
pub struct RuntimeHooks {
    pub app_hook: Option<AppHook>,
    pub chronos_handler: Option<ChronosHandler>,
}

impl Runtime {
    pub async fn start(
        cluster: ClusterConfig,
        settings: RuntimeSettings,
        scheduler: Scheduler,
        hooks: RuntimeHooks,
    ) -> Result<Arc<Self>, RuntimeError> {
        let this_node = cluster.this_node;
        let mut nodes_config = NodesConfig::new(this_node);
        let mut membership: NodeSet = NodeSet::new();
        for (id, endpoint) in cluster.all_endpoints() {
            nodes_config.add_node(id, endpoint);
            membership.insert(id);
        }

        let nodes = Nodes::new(nodes_config, scheduler.clone());
        let replob = Mutex::new(Replob::new(
            this_node,
            membership.clone(),
            Duration::from_millis(settings.availability_window_ms),
        ));
        let chronos = Mutex::new(Chronos::new(membership));
        let detector = Detector::new(
            Duration::from_millis(settings.pulse_interval_ms),
            Duration::from_millis(settings.detector_threshold_ms),
        );

        let runtime = Arc::new(Self {
            this_node,
            nodes,
            replob,
            chronos,
            detector,
            scheduler: scheduler.clone(),
            cleanup: replob_journey::CleanupRegistry::new(),
            app_hook: hooks.app_hook.unwrap_or_else(noop_app_hook),
            chronos_handler: hooks.chronos_handler.unwrap_or_else(noop_chronos_handler),
            pending_applies: Mutex::new(HashMap::new()),
        });

        runtime.spawn_listener(&cluster);
        runtime.spawn_detector();

        Ok(runtime)
    }

    fn spawn_listener(self: &Arc<Self>, cluster: &ClusterConfig) {
        let endpoint = cluster.this_endpoint();
        let runtime = self.clone();
        let scheduler = self.scheduler.clone();
        replob_journey::spawn(&self.scheduler, move || async move {
            let message_runtime = runtime.clone();
            let result = replob_net::serve(&endpoint, &scheduler, move |message| {
                message_runtime.handle_message(message);
            })
            .await;
            if let Err(error) = result {
                tracing::error!(%error, "listener stopped");
            }
        });
    }

    fn spawn_detector(self: &Arc<Self>) {
        let pulse_runtime = self.clone();
        let known_runtime = self.clone();
        let stale_runtime = self.clone();
        self.detector.run(
            &self.scheduler,
            0,
            move |sequence| {
                pulse_runtime.nodes.broadcast(Message::Heartbeat {
                    from: pulse_runtime.this_node,
                    sequence,
                });
            },
            move || {
                known_runtime
                    .replob
                    .lock()
                    .expect("replob poisoned")
                    .membership()
                    .iter()
                    .copied()
                    .collect()
            },
            move |node| {
                stale_runtime.propose(Command::RemoveNode { node });
            },
        );
    }

    pub fn this_node(&self) -> NodeId {
        self.this_node
    }

    pub fn nodes(&self) -> &Arc<Nodes> {
        &self.nodes
    }

    pub fn membership(&self) -> NodeSet {
        self.replob.lock().expect("replob poisoned").membership().clone()
    }

    /// Proposes `command` into the currently open consensus step, returning
    /// the `MessageId` minted for it.
    pub fn propose(self: &Arc<Self>, command: Command) -> MessageId {
        let (id, effects) = self.replob.lock().expect("replob poisoned").propose(command);
        self.run_effects(effects);
        id
    }

    /// Proposes `command` and blocks the calling journey until it has been
    /// applied on this node — the command still runs through consensus on
    /// every node, but only the proposing node's caller ever waits on it.
    ///
    /// Ported from the source's `apply_sync`: there it wrapped the command
    /// with a detachable `Completer` tied to the caller's coroutine; here the
    /// same role is played by a single-unit [`WaitGroup`] keyed by the
    /// command's `MessageId` in `pending_applies`.
    pub async fn apply_sync(self: &Arc<Self>, command: Command) -> Result<(), JourneyEvent> {
        let wg = Arc::new(WaitGroup::new());
        wg.add(1);
        let (id, effects) = self.replob.lock().expect("replob poisoned").propose(command);
        self.pending_applies.lock().expect("pending_applies poisoned").insert(id, wg.clone());
        self.run_effects(effects);
        let result = wg.wait().await;
        self.pending_applies.lock().expect("pending_applies poisoned").remove(&id);
        result
    }

    /// Replicates a new Chronos event onto every node via consensus rather
    /// than mutating local state directly.
    pub fn schedule_event(self: &Arc<Self>, event: ScheduledEvent) {
        self.propose(Command::ChronosSchedule {
            event_id: event.id,
            due_ms: event.due_ms,
            payload: event.payload,
        });
    }

    fn handle_message(self: &Arc<Self>, message: Message) {
        match message {
            Message::Vote { step, from, carries } => {
                let effects = self
                    .replob
                    .lock()
                    .expect("replob poisoned")
                    .handle_vote(step, from, carries);
                self.run_effects(effects);
            }
            Message::Commit { step, carries } => {
                let effects = self.replob.lock().expect("replob poisoned").handle_commit(step, carries);
                self.run_effects(effects);
            }
            Message::Heartbeat { from, .. } => {
                self.detector.record(from, Instant::now());
            }
        }
    }

    fn run_effects(self: &Arc<Self>, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Broadcast(message) => self.nodes.broadcast(message),
                Effect::ArmAvailabilityTimer { step, after } => {
                    let runtime = self.clone();
                    replob_journey::spawn(&self.scheduler, move || async move {
                        if timer::sleep(after).await.is_err() {
                            return;
                        }
                        let effects = runtime
                            .replob
                            .lock()
                            .expect("replob poisoned")
                            .handle_availability_timeout(step);
                        runtime.run_effects(effects);
                    });
                }
                Effect::Apply { entries, .. } => {
                    for entry in entries {
                        self.apply_committed(entry.command.clone());
                        if entry.id.origin() == self.this_node {
                            if let Some(wg) = self
                                .pending_applies
                                .lock()
                                .expect("pending_applies poisoned")
                                .get(&entry.id)
                            {
                                wg.done();
                            }
                        }
                    }
                }
            }
        }
    }

    fn apply_committed(self: &Arc<Self>, command: Command) {
        match command.clone() {
            Command::RemoveNode { node } => {
                self.nodes.remove_node(node);
                self.replob.lock().expect("replob poisoned").remove_node(node);
                let effects = self.chronos.lock().expect("chronos poisoned").node_removed(node);
                self.detector.forget(node);
                self.run_chronos_effects(effects);
            }
            Command::ChronosAdvanceTo { deadline_ms } => {
                let effects = self
                    .chronos
                    .lock()
                    .expect("chronos poisoned")
                    .advance_to(deadline_ms);
                self.run_chronos_effects(effects);
            }
            Command::ChronosCompleted { event_id, node } => {
                let effects = self
                    .chronos
                    .lock()
                    .expect("chronos poisoned")
                    .completed(event_id, node);
                self.run_chronos_effects(effects);
            }
            Command::ChronosSchedule { event_id, due_ms, payload } => {
                let effects = self.chronos.lock().expect("chronos poisoned").add_event(ScheduledEvent {
                    id: event_id,
                    due_ms,
                    payload,
                });
                self.run_chronos_effects(effects);
            }
            Command::KvSet { .. } => {
                (self.app_hook)(command);
            }
        }
    }

    fn run_chronos_effects(self: &Arc<Self>, effects: Vec<ChronosEffect>) {
        for effect in effects {
            match effect {
                ChronosEffect::DispatchTo { node, event } if node == self.this_node => {
                    let runtime = self.clone();
                    let handler = self.chronos_handler.clone();
                    replob_journey::spawn(&self.scheduler, move || async move {
                        let event_id = event.id;
                        handler(event).await;
                        runtime.propose(Command::ChronosCompleted { event_id, node });
                    });
                }
                ChronosEffect::DispatchTo { .. } => {}
                ChronosEffect::ArmNextTimer { after_ms } => {
                    let runtime = self.clone();
                    replob_journey::spawn(&self.scheduler, move || async move {
                        if timer::sleep(Duration::from_millis(after_ms)).await.is_err() {
                            return;
                        }
                        let deadline = runtime.chronos.lock().expect("chronos poisoned").now_ms() + after_ms;
                        runtime.propose(Command::ChronosAdvanceTo { deadline_ms: deadline });
                    });
                }
            }
        }
    }

    /// Registers a hook to run, in reverse order, when [`Runtime::shutdown`]
    /// is called.
    pub fn on_shutdown(&self, hook: impl FnOnce() + Send + 'static) {
        self.cleanup.register(hook);
    }

    pub fn shutdown(&self) {
        self.cleanup.run_all();
    }
}
