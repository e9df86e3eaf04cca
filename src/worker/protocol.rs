//! Shard Wire Protocol
//!
//! REST paths served by every worker, the JSON request bodies they accept, and the
//! plain-text acknowledgements they send back.
//!
//! Every authorized request carries the shard credential flattened into the JSON
//! object next to the operation's own fields.

use super::types::ShardCredential;
use crate::ring::RingMembership;
use serde::{Deserialize, Serialize};

// --- Lifecycle ---

/// Bootstraps the shard credential and the unit of work. Not authorized.
pub const ENDPOINT_SHARD_CONFIG: &str = "/shard/config";
/// Begins shutdown after a short delay.
pub const ENDPOINT_SHARD_STOP: &str = "/shard/stop";

// --- Hash ring ---

pub const ENDPOINT_RING_INIT: &str = "/ring/init";
pub const ENDPOINT_RING_ADD: &str = "/ring/add";
pub const ENDPOINT_RING_DEL: &str = "/ring/del";

// --- Barrier ---

/// Phase one: returns once producers have signalled the end of the current phase.
pub const ENDPOINT_QUEUE_WAIT: &str = "/queue/wait";
/// Phase two: returns once the task queue has drained.
pub const ENDPOINT_QUEUE_JOIN: &str = "/queue/join";

// --- Checkpointing hooks ---

pub const ENDPOINT_CHECK_PERSIST: &str = "/check/persist";
pub const ENDPOINT_CHECK_RECOVER: &str = "/check/recover";

// --- Utility ---

pub const ENDPOINT_INFO: &str = "/";

// --- Acknowledgement bodies ---

pub const BODY_OKAY: &str = "Bokay\r\n";
pub const BODY_GOODBYE: &str = "Goodbye\r\n";
pub const BODY_JOIN_STARTED: &str = "join queue...\r\n";
pub const BODY_JOIN_DONE: &str = "done\r\n";

// --- Data Transfer Objects ---

/// Body of `/shard/config`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShardConfigRequest {
    #[serde(flatten)]
    pub credential: ShardCredential,
    /// Identifier of the unit of work to instantiate on the shard.
    #[serde(rename = "strategyId", alias = "uow_name")]
    pub strategy_id: String,
}

/// Body of `/ring/init`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RingInitRequest {
    #[serde(flatten)]
    pub credential: ShardCredential,
    pub ring: RingMembership,
}

/// Body of every request that only needs the credential.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CredentialRequest {
    #[serde(flatten)]
    pub credential: ShardCredential,
}
