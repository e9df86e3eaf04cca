use crate::framework::Framework;
use crate::ring::HashRing;
use crate::worker::Worker;
use crate::worker::types::ShardId;

use anyhow::Result;
use async_trait::async_trait;
use axum::body::Bytes;
use axum::response::Response;
use serde_json::Value;
use std::sync::Arc;

/// A pluggable distributed computation.
///
/// One instance lives on the coordinator (for `orchestrate`) and one on every configured
/// shard (for `perform_task` and `handle_endpoint`), each bound to the run's prefix.
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    /// Identifier the strategy was instantiated under.
    fn name(&self) -> &str;

    /// Performs one task taken from the shard's task queue.
    ///
    /// Errors are the strategy's own business: the queue logs them and still counts
    /// the payload as processed.
    async fn perform_task(&self, payload: Value) -> Result<()>;

    /// Drives the distributed run from the coordinator side.
    async fn orchestrate(&self, framework: &Framework) -> Result<()>;

    /// Serves a strategy-specific request on a shard. `None` means "not mine".
    async fn handle_endpoint(
        &self,
        _worker: &Arc<Worker>,
        _path: &str,
        _body: &Bytes,
    ) -> Option<Response> {
        None
    }

    /// Called on a shard after `ring/init` with the shard's own identity and the new ring.
    async fn on_ring_init(&self, _shard_id: &ShardId, _ring: &Arc<HashRing>) {}
}
