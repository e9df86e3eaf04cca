//! Echo Unit of Work
//!
//! A minimal strategy used for smoke runs and tests. Shards record every payload they
//! perform; the coordinator spreads numbered items over the shards by hash-ring owner.
//!
//! Extra shard routes (all require the shard credential):
//! - `/echo/prep`: prepare a task queue and begin a production phase.
//! - `/echo/put`: enqueue `{"items": [...]}`.
//! - `/echo/done`: end the production phase.
//! - `/echo/count`: report how many payloads were performed.

use super::types::UnitOfWork;
use crate::error::WorkerError;
use crate::framework::{Framework, check_replies};
use crate::ring::HashRing;
use crate::worker::Worker;
use crate::worker::protocol::BODY_OKAY;
use crate::worker::service::parse_payload;
use crate::worker::types::{ShardCredential, ShardId};

use anyhow::Result;
use async_trait::async_trait;
use axum::Json;
use axum::body::Bytes;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};

pub const ECHO_UOW: &str = "echo";

pub const ENDPOINT_ECHO_PREP: &str = "/echo/prep";
pub const ENDPOINT_ECHO_PUT: &str = "/echo/put";
pub const ENDPOINT_ECHO_DONE: &str = "/echo/done";
pub const ENDPOINT_ECHO_COUNT: &str = "/echo/count";

const DEFAULT_ITEMS_PER_RUN: usize = 16;

#[derive(Debug, Serialize, Deserialize)]
pub struct EchoPutRequest {
    #[serde(flatten)]
    pub credential: ShardCredential,
    pub items: Vec<Value>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EchoCountResponse {
    pub shard_id: Option<ShardId>,
    pub performed: usize,
}

pub struct EchoUow {
    prefix: String,
    items_per_run: usize,
    performed: Mutex<Vec<Value>>,
    local_shard: RwLock<Option<ShardId>>,
}

impl EchoUow {
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            items_per_run: DEFAULT_ITEMS_PER_RUN,
            performed: Mutex::new(Vec::new()),
            local_shard: RwLock::new(None),
        }
    }

    /// Number of items `orchestrate` distributes.
    pub fn with_items(mut self, items_per_run: usize) -> Self {
        self.items_per_run = items_per_run;
        self
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Payloads performed so far, in the order they were performed.
    pub async fn performed(&self) -> Vec<Value> {
        self.performed.lock().await.clone()
    }

    /// Groups the run's items by the shard owning each item key.
    pub fn plan(&self, ring: &HashRing) -> BTreeMap<ShardId, Vec<Value>> {
        let mut batches: BTreeMap<ShardId, Vec<Value>> = BTreeMap::new();

        for seq in 0..self.items_per_run {
            let key = format!("item-{}", seq);
            batches
                .entry(ring.owner(&key).clone())
                .or_default()
                .push(json!({ "key": key, "seq": seq }));
        }

        batches
    }

    async fn prep(&self, worker: &Arc<Worker>, body: &Bytes) -> Result<Response, WorkerError> {
        worker.authorize_payload(body).await?;
        worker.prepare_queue().await?;
        worker.begin_phase().await;
        Ok((StatusCode::OK, BODY_OKAY).into_response())
    }

    async fn put(&self, worker: &Arc<Worker>, body: &Bytes) -> Result<Response, WorkerError> {
        let req: EchoPutRequest = parse_payload(body)?;
        worker.authorize(&req.credential).await?;

        let count = req.items.len();
        for item in req.items {
            worker.enqueue(item).await?;
        }

        tracing::debug!("Queued {} echo items", count);
        Ok((StatusCode::OK, BODY_OKAY).into_response())
    }

    async fn done(&self, worker: &Arc<Worker>, body: &Bytes) -> Result<Response, WorkerError> {
        worker.authorize_payload(body).await?;
        worker.end_phase().await;
        Ok((StatusCode::OK, BODY_OKAY).into_response())
    }

    async fn count(&self, worker: &Arc<Worker>, body: &Bytes) -> Result<Response, WorkerError> {
        worker.authorize_payload(body).await?;

        let response = EchoCountResponse {
            shard_id: self.local_shard.read().await.clone(),
            performed: self.performed.lock().await.len(),
        };
        Ok((StatusCode::OK, Json(response)).into_response())
    }
}

#[async_trait]
impl UnitOfWork for EchoUow {
    fn name(&self) -> &str {
        ECHO_UOW
    }

    async fn perform_task(&self, payload: Value) -> Result<()> {
        if let Some(delay_ms) = payload.get("delay_ms").and_then(Value::as_u64) {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        }

        tracing::debug!("Echo task: {}", payload);
        let fail = payload.get("fail").and_then(Value::as_bool).unwrap_or(false);
        self.performed.lock().await.push(payload);

        if fail {
            return Err(anyhow::anyhow!("echo task asked to fail"));
        }
        Ok(())
    }

    async fn orchestrate(&self, framework: &Framework) -> Result<()> {
        let ring = framework
            .ring()
            .ok_or_else(|| anyhow::anyhow!("No shards assigned to the framework"))?;

        check_replies(
            ENDPOINT_ECHO_PREP,
            &framework.broadcast(ENDPOINT_ECHO_PREP, json!({})).await?,
        )?;

        for (shard_id, items) in self.plan(ring) {
            tracing::info!("Sending {} echo items to {}", items.len(), shard_id);
            let reply = framework
                .unicast(&shard_id, ENDPOINT_ECHO_PUT, json!({ "items": items }))
                .await?;
            check_replies(ENDPOINT_ECHO_PUT, std::slice::from_ref(&reply))?;
        }

        check_replies(
            ENDPOINT_ECHO_DONE,
            &framework.broadcast(ENDPOINT_ECHO_DONE, json!({})).await?,
        )?;

        Ok(())
    }

    async fn handle_endpoint(
        &self,
        worker: &Arc<Worker>,
        path: &str,
        body: &Bytes,
    ) -> Option<Response> {
        let outcome = match path {
            ENDPOINT_ECHO_PREP => self.prep(worker, body).await,
            ENDPOINT_ECHO_PUT => self.put(worker, body).await,
            ENDPOINT_ECHO_DONE => self.done(worker, body).await,
            ENDPOINT_ECHO_COUNT => self.count(worker, body).await,
            _ => return None,
        };

        Some(outcome.unwrap_or_else(|e| e.into_response()))
    }

    async fn on_ring_init(&self, shard_id: &ShardId, ring: &Arc<HashRing>) {
        tracing::debug!("Echo shard {} sees {} shards", shard_id, ring.len());
        *self.local_shard.write().await = Some(shard_id.clone());
    }
}
