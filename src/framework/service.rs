use super::client::ShardClient;
use super::types::{ExternalWorkerDescriptor, ShardEntry, ShardReply};
use crate::config::FrameworkSettings;
use crate::ring::{HashRing, RingMembership};
use crate::uow::{UnitOfWork, UowRegistry};
use crate::worker::protocol::{
    ENDPOINT_QUEUE_JOIN, ENDPOINT_QUEUE_WAIT, ENDPOINT_RING_INIT, ENDPOINT_SHARD_CONFIG,
    ENDPOINT_SHARD_STOP,
};
use crate::worker::types::{ShardCredential, ShardId};

use anyhow::Result;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

/// The coordinator of one distributed run.
pub struct Framework {
    /// Unit of work name and storage root.
    settings: FrameworkSettings,
    /// Fresh per `Framework`; scopes every credential of the run.
    run_id: Uuid,
    /// Namespace shared by every shard of this run: `{prefix_root}/{run_id}`.
    prefix: String,
    /// Coordinator-side instance of the unit of work, used for `orchestrate`.
    uow: Arc<dyn UnitOfWork>,
    /// Ordered by shard id, which (zero-padded) is also assignment order.
    shards: BTreeMap<ShardId, ShardEntry>,
    /// Built from `shards`; `None` until at least one shard is assigned.
    ring: Option<HashRing>,
    /// Stamps the run credential on every outgoing request.
    client: ShardClient,
}

impl Framework {
    /// Creates a coordinator for a fresh run of `settings.uow_name`.
    ///
    /// # Arguments
    /// * `settings` - Unit of work name and storage root.
    /// * `registry` - Where the unit of work is looked up.
    ///
    /// # Returns
    /// An error if the unit of work is not registered.
    pub fn new(settings: FrameworkSettings, registry: &UowRegistry) -> Result<Self> {
        let run_id = Uuid::new_v4();
        let prefix = format!(
            "{}/{}",
            settings.prefix_root.trim_end_matches('/'),
            run_id.simple()
        );
        tracing::info!("Run prefix: {}", prefix);

        tracing::info!("Initializing unit of work based on {}", settings.uow_name);
        let uow = registry.instantiate(&settings.uow_name, &prefix)?;

        Ok(Self {
            settings,
            run_id,
            prefix,
            uow,
            shards: BTreeMap::new(),
            ring: None,
            client: ShardClient::new(),
        })
    }

    // ============================================================
    // SHARD REGISTRY
    // ============================================================

    /// Associates one shard with each worker address, in order.
    ///
    /// Replaces any previous assignment and rebuilds the ring.
    ///
    /// # Arguments
    /// * `addresses` - Worker `host:port` strings; index `i` becomes `shard/<i>`, zero-padded
    ///   to the width of the address count.
    /// * `descriptors` - Optional cluster-manager descriptors, one per address.
    ///
    /// # Returns
    /// An error if the descriptor count does not match the address count.
    pub fn assign_shards(
        &mut self,
        addresses: Vec<String>,
        descriptors: Option<Vec<ExternalWorkerDescriptor>>,
    ) -> Result<()> {
        let count = addresses.len();

        if let Some(descriptors) = &descriptors {
            if descriptors.len() != count {
                return Err(anyhow::anyhow!(
                    "Got {} worker descriptors for {} addresses",
                    descriptors.len(),
                    count
                ));
            }
        }

        let mut descriptors = descriptors.map(|d| d.into_iter());
        let mut shards = BTreeMap::new();

        for (index, uri) in addresses.into_iter().enumerate() {
            let shard_id = ShardId::from_index(index, count);
            let descriptor = descriptors.as_mut().and_then(|d| d.next());

            match &descriptor {
                Some(descriptor) => {
                    tracing::info!("{} -> {} ({})", shard_id, uri, descriptor.report())
                }
                None => tracing::info!("{} -> {}", shard_id, uri),
            }

            shards.insert(shard_id, ShardEntry { uri, descriptor });
        }

        self.ring = if shards.is_empty() {
            None
        } else {
            Some(HashRing::build(shards.keys().cloned())?)
        };
        self.shards = shards;

        Ok(())
    }

    pub fn shard_ids(&self) -> Vec<ShardId> {
        self.shards.keys().cloned().collect()
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    pub fn shard(&self, shard_id: &ShardId) -> Option<&ShardEntry> {
        self.shards.get(shard_id)
    }

    /// The `shard_id -> address` map pushed to every shard on `ring/init`.
    pub fn membership(&self) -> RingMembership {
        self.shards
            .iter()
            .map(|(shard_id, entry)| (shard_id.clone(), entry.uri.clone()))
            .collect()
    }

    pub fn ring(&self) -> Option<&HashRing> {
        self.ring.as_ref()
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn uow_name(&self) -> &str {
        &self.settings.uow_name
    }

    pub fn credential(&self, shard_id: &ShardId) -> ShardCredential {
        ShardCredential::new(self.prefix.clone(), shard_id)
    }

    // ============================================================
    // REQUESTS
    // ============================================================

    /// Sends one request to one shard.
    ///
    /// # Arguments
    /// * `shard_id` - Target shard; must be assigned.
    /// * `path` - Shard route, e.g. `/queue/wait`.
    /// * `payload` - JSON message; the shard's credential is merged in.
    pub async fn unicast(&self, shard_id: &ShardId, path: &str, payload: Value) -> Result<ShardReply> {
        let entry = self
            .shards
            .get(shard_id)
            .ok_or_else(|| anyhow::anyhow!("Unknown shard {}", shard_id))?;

        self.client
            .post(&entry.uri, path, &self.credential(shard_id), payload)
            .await
    }

    /// Sends the same request to every shard concurrently.
    ///
    /// # Arguments
    /// * `path` - Shard route, e.g. `/shard/config`.
    /// * `payload` - JSON message; each shard's own credential is merged in.
    ///
    /// # Returns
    /// Replies in registry order. A transport failure on any shard fails the whole call;
    /// non-success statuses are returned for the caller to judge.
    pub async fn broadcast(&self, path: &str, payload: Value) -> Result<Vec<ShardReply>> {
        let requests = self.shards.iter().map(|(shard_id, entry)| {
            let credential = self.credential(shard_id);
            let payload = payload.clone();
            async move {
                self.client
                    .post(&entry.uri, path, &credential, payload)
                    .await
            }
        });

        futures::future::join_all(requests)
            .await
            .into_iter()
            .collect()
    }

    // ============================================================
    // RUN STEPS
    // ============================================================

    /// `shard/config` on every shard with this run's unit of work.
    pub async fn configure_shards(&self) -> Result<Vec<ShardReply>> {
        self.broadcast(
            ENDPOINT_SHARD_CONFIG,
            json!({ "strategyId": self.settings.uow_name }),
        )
        .await
    }

    /// `ring/init` on every shard with the full membership.
    pub async fn init_ring(&self) -> Result<Vec<ShardReply>> {
        self.broadcast(ENDPOINT_RING_INIT, json!({ "ring": self.membership() }))
            .await
    }

    /// Two-phase barrier: every shard acknowledges `queue/wait` (producers done) before
    /// any shard is sent `queue/join` (queue drained).
    pub async fn phase_barrier(&self) -> Result<()> {
        tracing::info!("Phase barrier: waiting on {} shards", self.shard_count());
        check_replies(
            ENDPOINT_QUEUE_WAIT,
            &self.broadcast(ENDPOINT_QUEUE_WAIT, json!({})).await?,
        )?;

        tracing::info!("Phase barrier: joining {} shards", self.shard_count());
        check_replies(
            ENDPOINT_QUEUE_JOIN,
            &self.broadcast(ENDPOINT_QUEUE_JOIN, json!({})).await?,
        )?;

        Ok(())
    }

    pub async fn stop_shards(&self) -> Result<Vec<ShardReply>> {
        self.broadcast(ENDPOINT_SHARD_STOP, json!({})).await
    }

    /// Runs the unit of work end to end across every assigned shard.
    ///
    /// Shards are sent `shard/stop` even when an earlier step fails.
    pub async fn orchestrate_run(&self) -> Result<()> {
        if self.shards.is_empty() {
            return Err(anyhow::anyhow!("No shards assigned"));
        }

        tracing::info!(
            "Orchestrating {} across {} shards",
            self.settings.uow_name,
            self.shard_count()
        );

        let outcome = self.drive().await;
        if let Err(e) = &outcome {
            tracing::error!("Run failed: {}", e);
        }

        let stopped = self.stop_shards().await;
        outcome?;
        check_replies(ENDPOINT_SHARD_STOP, &stopped?)?;

        tracing::info!("Run {} complete", self.run_id);
        Ok(())
    }

    async fn drive(&self) -> Result<()> {
        check_replies(ENDPOINT_SHARD_CONFIG, &self.configure_shards().await?)?;
        check_replies(ENDPOINT_RING_INIT, &self.init_ring().await?)?;

        self.uow.orchestrate(self).await?;

        self.phase_barrier().await
    }
}

/// Fails if any reply is not a success, naming the shard and its answer.
pub fn check_replies(step: &str, replies: &[ShardReply]) -> Result<()> {
    let failures: Vec<String> = replies
        .iter()
        .filter(|reply| !reply.is_success())
        .map(|reply| format!("{} ({}: {})", reply.shard_id, reply.status, reply.first_line()))
        .collect();

    if failures.is_empty() {
        Ok(())
    } else {
        Err(anyhow::anyhow!("{} rejected by {}", step, failures.join(", ")))
    }
}
