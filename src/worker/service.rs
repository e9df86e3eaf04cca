//! Worker (Shard) Service
//!
//! Holds everything one shard process knows: its credential, the unit of work it runs,
//! its view of the hash ring, the current task queue and the current phase event.
//!
//! ## Lifecycle
//! `Unconfigured -> Configured -> Running -> Stopped`. Configuration happens exactly once
//! per process; every later attempt is rejected without touching the stored state.
//! Every operation except `configure` and `request_stop` is gated by `authorize`.

use super::protocol::CredentialRequest;
use super::types::{Lifecycle, ShardCredential, ShardId, ShardStatus};
use crate::config::WorkerSettings;
use crate::error::WorkerError;
use crate::queue::{PhaseEvent, TaskQueue};
use crate::ring::{HashRing, RingMembership};
use crate::uow::{UnitOfWork, UowRegistry};

use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{RwLock, watch};

#[derive(Default)]
struct ShardState {
    lifecycle: Lifecycle,
    credential: Option<ShardCredential>,
    strategy: Option<String>,
    uow: Option<Arc<dyn UnitOfWork>>,
    membership: Option<RingMembership>,
    ring: Option<Arc<HashRing>>,
    queue: Option<Arc<TaskQueue>>,
    phase: Option<PhaseEvent>,
}

pub struct Worker {
    /// Bind address and shutdown timings.
    settings: WorkerSettings,
    /// Strategies this shard can be configured with.
    registry: Arc<UowRegistry>,
    /// Everything `shard/config`, `ring/init` and the queue routes mutate.
    state: RwLock<ShardState>,
    /// Flipped to `true` once the shard accepts a stop.
    stop_tx: watch::Sender<bool>,
}

impl Worker {
    /// Creates an unconfigured worker.
    ///
    /// # Arguments
    /// * `settings` - Bind address and shutdown timings.
    /// * `registry` - Strategies `shard/config` may name.
    pub fn new(settings: WorkerSettings, registry: Arc<UowRegistry>) -> Arc<Self> {
        let (stop_tx, _) = watch::channel(false);

        Arc::new(Self {
            settings,
            registry,
            state: RwLock::new(ShardState::default()),
            stop_tx,
        })
    }

    // ============================================================
    // CONFIGURATION & AUTHENTICATION
    // ============================================================

    /// Configures the shard: stores the credential and instantiates the unit of work.
    ///
    /// Allowed once per process. A credential with an empty `prefix` or `shard_id`, or
    /// an unknown strategy, leaves the shard unconfigured.
    ///
    /// # Arguments
    /// * `credential` - The `(prefix, shard_id)` pair every later request must carry.
    /// * `strategy_id` - Registry identifier of the unit of work (e.g. `"echo"`).
    ///
    /// # Returns
    /// `AlreadyConfigured`, `MalformedPayload` or `UnknownStrategy` on rejection.
    pub async fn configure(
        &self,
        credential: ShardCredential,
        strategy_id: &str,
    ) -> Result<(), WorkerError> {
        let mut state = self.state.write().await;

        if state.lifecycle != Lifecycle::Unconfigured {
            if let Some(existing) = &state.credential {
                tracing::warn!(
                    "Denied configuring {} (already configured as {})",
                    credential,
                    existing
                );
            }
            return Err(WorkerError::AlreadyConfigured);
        }

        if credential.prefix.is_empty() || credential.shard_id.is_empty() {
            tracing::error!("Refusing to configure with incomplete credential ({})", credential);
            return Err(WorkerError::MalformedPayload(
                "prefix and shard_id are required".to_string(),
            ));
        }

        tracing::info!("Initializing unit of work based on {}", strategy_id);
        let uow = match self.registry.instantiate(strategy_id, &credential.prefix) {
            Ok(uow) => uow,
            Err(e) => {
                tracing::error!("Failed to configure {}: {}", credential, e);
                return Err(e);
            }
        };

        tracing::info!("Configuring {}", credential);
        state.credential = Some(credential);
        state.strategy = Some(strategy_id.to_string());
        state.uow = Some(uow);
        state.lifecycle = Lifecycle::Configured;

        Ok(())
    }

    /// Checks an offered credential against the one this shard was configured with.
    ///
    /// # Returns
    /// `AuthMismatch` (logging both sides) unless the pair matches exactly.
    pub async fn authorize(&self, offered: &ShardCredential) -> Result<(), WorkerError> {
        let state = self.state.read().await;

        match &state.credential {
            Some(expected) if expected == offered => Ok(()),
            expected => {
                let expected = expected
                    .as_ref()
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "<unconfigured>".to_string());

                tracing::error!("Incorrect credentials {} (expected {})", offered, expected);

                Err(WorkerError::AuthMismatch {
                    offered: offered.clone(),
                    expected,
                })
            }
        }
    }

    /// Extracts the credential from a raw JSON request body and authorizes it.
    pub async fn authorize_payload(&self, body: &[u8]) -> Result<ShardCredential, WorkerError> {
        let req: CredentialRequest = parse_payload(body)?;
        self.authorize(&req.credential).await?;
        Ok(req.credential)
    }

    // ============================================================
    // HASH RING
    // ============================================================

    /// Replaces this shard's view of the ring with the given membership.
    ///
    /// # Arguments
    /// * `credential` - Must match the configured credential.
    /// * `membership` - The full `shard_id -> address` map; must not be empty.
    ///
    /// The unit of work is told about the new ring through `on_ring_init`.
    pub async fn ring_init(
        &self,
        credential: &ShardCredential,
        membership: RingMembership,
    ) -> Result<(), WorkerError> {
        self.authorize(credential).await?;

        let ring = HashRing::from_membership(&membership)
            .map_err(|e| WorkerError::MalformedPayload(e.to_string()))?;
        let ring = Arc::new(ring);

        tracing::info!("Setting hash ring {:?}", membership);

        let uow = {
            let mut state = self.state.write().await;
            state.membership = Some(membership);
            state.ring = Some(ring.clone());
            state.uow.clone()
        };

        if let Some(uow) = uow {
            uow.on_ring_init(&credential.shard(), &ring).await;
        }

        Ok(())
    }

    // ============================================================
    // TASK QUEUE & PHASES
    // ============================================================

    /// Creates a fresh task queue and spawns its consumer.
    ///
    /// Replaces any previous queue; callers must not do this while the previous
    /// queue still has unfinished payloads.
    ///
    /// # Returns
    /// `NotConfigured` when there is no unit of work to feed the consumer.
    pub async fn prepare_queue(&self) -> Result<(), WorkerError> {
        let mut state = self.state.write().await;
        let uow = state.uow.clone().ok_or(WorkerError::NotConfigured)?;

        if let Some(previous) = &state.queue {
            if previous.unfinished() > 0 {
                tracing::warn!(
                    "Replacing task queue with {} unfinished payloads",
                    previous.unfinished()
                );
            }
        }

        state.queue = Some(Arc::new(TaskQueue::spawn(uow)));
        if state.lifecycle == Lifecycle::Configured {
            state.lifecycle = Lifecycle::Running;
        }

        tracing::debug!("Prepared task queue");
        Ok(())
    }

    /// Appends a payload to the current task queue without blocking.
    ///
    /// # Returns
    /// `NoActiveQueue` if `prepare_queue` has not been called.
    pub async fn enqueue(&self, payload: Value) -> Result<(), WorkerError> {
        let state = self.state.read().await;
        let queue = state.queue.as_ref().ok_or(WorkerError::NoActiveQueue)?;
        queue.put(payload)
    }

    /// Starts a production phase; `queue_wait` callers block until `end_phase`.
    pub async fn begin_phase(&self) -> PhaseEvent {
        let mut state = self.state.write().await;
        let event = PhaseEvent::new();

        if let Some(previous) = state.phase.replace(event.clone()) {
            tracing::warn!("Phase begun while another was in flight, ending the old one");
            previous.set();
        }

        tracing::debug!("Production phase started");
        event
    }

    /// Ends the current production phase, waking every `queue_wait` caller.
    pub async fn end_phase(&self) {
        let event = self.state.write().await.phase.take();

        match event {
            Some(event) => {
                event.set();
                tracing::debug!("Production phase ended");
            }
            None => tracing::debug!("No production phase in flight"),
        }
    }

    /// Runs `producer` inside a production phase; the phase ends when it completes.
    pub async fn run_phase<F, T>(&self, producer: F) -> T
    where
        F: Future<Output = T>,
    {
        self.begin_phase().await;
        let output = producer.await;
        self.end_phase().await;
        output
    }

    /// Phase one of the barrier: returns once the current phase has ended,
    /// or immediately when no phase is in flight.
    pub async fn queue_wait(&self) {
        let event = self.state.read().await.phase.clone();

        if let Some(event) = event {
            tracing::debug!("Waiting for producers to finish the current phase");
            event.wait().await;
        }
    }

    /// Phase two of the barrier: returns once the task queue has drained.
    pub async fn queue_join(&self) {
        let queue = self.state.read().await.queue.clone();

        if let Some(queue) = queue {
            tracing::debug!("Joining task queue ({} unfinished)", queue.unfinished());
            queue.join().await;
        }
    }

    // ============================================================
    // SHUTDOWN
    // ============================================================

    /// Stops the shard if `offered` matches its credential.
    ///
    /// A mismatch is only logged; the caller has already been answered and learns nothing.
    ///
    /// # Returns
    /// `true` if the stop was accepted.
    pub async fn request_stop(&self, offered: &ShardCredential) -> bool {
        let mut state = self.state.write().await;

        match &state.credential {
            Some(expected) if expected == offered => {
                tracing::info!("Worker service stopping");
                state.lifecycle = Lifecycle::Stopped;
                self.stop_tx.send_replace(true);
                true
            }
            _ => {
                tracing::error!("Incorrect {} for stop request", offered);
                false
            }
        }
    }

    /// Stops the shard without a credential check, for local signals.
    pub async fn shutdown(&self) {
        self.state.write().await.lifecycle = Lifecycle::Stopped;
        self.stop_tx.send_replace(true);
    }

    pub fn is_stopping(&self) -> bool {
        *self.stop_tx.borrow()
    }

    /// Resolves once a matching stop request has been accepted.
    pub fn stopped(&self) -> impl Future<Output = ()> + Send + 'static {
        let mut rx = self.stop_tx.subscribe();
        async move {
            let _ = rx.wait_for(|stopping| *stopping).await;
        }
    }

    /// Resolves `force_close_after` past the stop. Requests still parked on a barrier
    /// at that point have their connection cut.
    pub fn force_closed(&self) -> impl Future<Output = ()> + Send + 'static {
        let stopped = self.stopped();
        let grace = self.settings.force_close_after;
        async move {
            stopped.await;
            tokio::time::sleep(grace).await;
        }
    }

    // ============================================================
    // ACCESSORS
    // ============================================================

    pub fn settings(&self) -> &WorkerSettings {
        &self.settings
    }

    pub async fn lifecycle(&self) -> Lifecycle {
        self.state.read().await.lifecycle
    }

    pub async fn credential(&self) -> Option<ShardCredential> {
        self.state.read().await.credential.clone()
    }

    pub async fn shard_id(&self) -> Option<ShardId> {
        self.state
            .read()
            .await
            .credential
            .as_ref()
            .map(|c| c.shard())
    }

    pub async fn uow(&self) -> Option<Arc<dyn UnitOfWork>> {
        self.state.read().await.uow.clone()
    }

    pub async fn ring(&self) -> Option<Arc<HashRing>> {
        self.state.read().await.ring.clone()
    }

    pub async fn membership(&self) -> Option<RingMembership> {
        self.state.read().await.membership.clone()
    }

    pub async fn status(&self) -> ShardStatus {
        let state = self.state.read().await;

        ShardStatus {
            lifecycle: state.lifecycle,
            credential: state.credential.clone(),
            strategy: state.strategy.clone(),
            ring_size: state.ring.as_ref().map(|r| r.len()).unwrap_or(0),
            queue_active: state.queue.is_some(),
            unfinished_tasks: state.queue.as_ref().map(|q| q.unfinished()).unwrap_or(0),
            phase_in_flight: state.phase.is_some(),
        }
    }
}

/// Parses a JSON request body into `T`, mapping failures onto `MalformedPayload`.
pub fn parse_payload<T: serde::de::DeserializeOwned>(body: &[u8]) -> Result<T, WorkerError> {
    serde_json::from_slice(body).map_err(|e| {
        tracing::warn!("Failed to parse request payload: {}", e);
        WorkerError::MalformedPayload(e.to_string())
    })
}
