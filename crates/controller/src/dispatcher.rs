//! Event dispatcher.
//!
//! Receives identity-keyed change notifications from the external watcher
//! and drives the reconciler with bounded concurrency. Delivery is
//! at-least-once: enqueues for a key already pending collapse into a
//! single rerun, and a pass may run again with nothing to do, which the
//! reconciler tolerates by construction.
//!
//! Per-key serialization comes from the key-state map, not per-key locks:
//! at most one worker holds a given identity at a time, and a notification
//! arriving mid-pass marks the key dirty so it reruns once the pass ends.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::{Stream, StreamExt};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};
use webctl_cluster::ObjectKey;

use crate::outcome::ReconcileOutcome;
use crate::reconciler::Reconciler;
use crate::shutdown::{Shutdown, ShutdownSignal};

/// Configuration for the dispatcher.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Number of concurrent workers.
    pub workers: usize,
    /// Backoff delay for the first retry.
    pub backoff_base: Duration,
    /// Upper bound on the backoff delay.
    pub backoff_max: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            backoff_base: Duration::from_millis(500),
            backoff_max: Duration::from_secs(60),
        }
    }
}

/// Scheduling state of one identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyState {
    /// Waiting in the channel for a worker.
    Queued,
    /// A pass is in flight.
    Running,
    /// A pass is in flight and another notification arrived meanwhile.
    RunningDirty,
}

/// Work-queue dispatcher driving the reconciler.
pub struct Dispatcher {
    reconciler: Arc<Reconciler>,
    config: DispatcherConfig,
    tx: mpsc::UnboundedSender<ObjectKey>,
    /// Receiver handed to the worker pool on the first `run` call.
    rx: Mutex<Option<mpsc::UnboundedReceiver<ObjectKey>>>,
    states: Mutex<HashMap<ObjectKey, KeyState>>,
    /// Consecutive retryable failures per key, cleared on convergence.
    retries: Mutex<HashMap<ObjectKey, u32>>,
    shutdown: Shutdown,
}

impl Dispatcher {
    /// Create a new dispatcher around a reconciler.
    pub fn new(reconciler: Arc<Reconciler>, config: DispatcherConfig) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            reconciler,
            config,
            tx,
            rx: Mutex::new(Some(rx)),
            states: Mutex::new(HashMap::new()),
            retries: Mutex::new(HashMap::new()),
            shutdown: Shutdown::new(),
        }
    }

    /// Get the configuration.
    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// Subscribe to the dispatcher's shutdown signal.
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.subscribe()
    }

    /// Signal shutdown: workers stop after their current pass, and passes
    /// in flight abort at the next cluster-call boundary.
    pub fn signal_shutdown(&self) {
        self.shutdown.signal();
    }

    /// Accept a change notification for an identity.
    ///
    /// Collapses with any notification already pending for the same key.
    pub async fn enqueue(&self, key: ObjectKey) {
        let mut states = self.states.lock().await;
        match states.get(&key) {
            Some(KeyState::Running) => {
                states.insert(key, KeyState::RunningDirty);
            }
            Some(KeyState::Queued | KeyState::RunningDirty) => {
                // Already pending; nothing to add.
            }
            None => {
                states.insert(key.clone(), KeyState::Queued);
                let _ = self.tx.send(key);
            }
        }
    }

    /// Enqueue every identity yielded by a watcher stream until the stream
    /// ends or shutdown is signalled.
    pub async fn drive<S>(&self, mut events: S)
    where
        S: Stream<Item = ObjectKey> + Unpin,
    {
        let mut signal = self.shutdown.subscribe();
        loop {
            let event = tokio::select! {
                _ = signal.wait() => None,
                event = events.next() => event,
            };
            let Some(key) = event else { break };
            self.enqueue(key).await;
        }
    }

    /// Start the worker pool.
    ///
    /// Effective only once; later calls return no handles. The returned
    /// handles complete after [`signal_shutdown`](Self::signal_shutdown).
    pub async fn run(self: &Arc<Self>) -> Vec<JoinHandle<()>> {
        let receiver = { self.rx.lock().await.take() };
        let Some(receiver) = receiver else {
            warn!("dispatcher workers already started");
            return Vec::new();
        };
        let queue = Arc::new(Mutex::new(receiver));

        (0..self.config.workers.max(1))
            .map(|worker| {
                let dispatcher = Arc::clone(self);
                let queue = Arc::clone(&queue);
                let mut signal = self.shutdown.subscribe();
                tokio::spawn(async move {
                    loop {
                        let key = tokio::select! {
                            _ = signal.wait() => None,
                            key = next_key(&queue) => key,
                        };
                        let Some(key) = key else { break };
                        dispatcher.process(key, &signal).await;
                    }
                    debug!(worker, "dispatcher worker stopped");
                })
            })
            .collect()
    }

    /// Run one pass for a key and schedule any follow-up.
    async fn process(self: &Arc<Self>, key: ObjectKey, signal: &ShutdownSignal) {
        {
            let mut states = self.states.lock().await;
            states.insert(key.clone(), KeyState::Running);
        }

        let outcome = self.reconciler.reconcile(&key, signal).await;

        let dirty = {
            let mut states = self.states.lock().await;
            matches!(states.remove(&key), Some(KeyState::RunningDirty))
        };

        match outcome {
            ReconcileOutcome::Converged => {
                let mut retries = self.retries.lock().await;
                retries.remove(&key);
                debug!(key = %key, "pass converged");
            }
            ReconcileOutcome::Retryable { reason } => {
                let attempt = {
                    let mut retries = self.retries.lock().await;
                    let counter = retries.entry(key.clone()).or_insert(0);
                    let attempt = *counter;
                    *counter = counter.saturating_add(1);
                    attempt
                };
                let delay = backoff_delay(&self.config, attempt);
                warn!(key = %key, %reason, attempt, ?delay, "pass needs retry");
                if !dirty && !signal.is_shutdown() {
                    let dispatcher = Arc::clone(self);
                    let mut signal = signal.clone();
                    let key = key.clone();
                    tokio::spawn(async move {
                        tokio::select! {
                            _ = signal.wait() => {}
                            () = tokio::time::sleep(delay) => dispatcher.enqueue(key).await,
                        }
                    });
                }
            }
            ReconcileOutcome::Fatal { reason } => {
                // Surfaced for operators; never retried automatically. A
                // fresh watcher event starts over with a clean backoff.
                error!(key = %key, %reason, "reconciliation failed, operator intervention required");
                let mut retries = self.retries.lock().await;
                retries.remove(&key);
            }
        }

        if dirty {
            // Something changed while the pass ran; rerun immediately.
            self.enqueue(key).await;
        }
    }
}

/// Pull the next key off the shared queue.
async fn next_key(queue: &Arc<Mutex<mpsc::UnboundedReceiver<ObjectKey>>>) -> Option<ObjectKey> {
    queue.lock().await.recv().await
}

/// Exponential backoff, saturating at the configured maximum.
fn backoff_delay(config: &DispatcherConfig, attempt: u32) -> Duration {
    let factor = 2u32.saturating_pow(attempt.min(16));
    config
        .backoff_base
        .saturating_mul(factor)
        .min(config.backoff_max)
}
