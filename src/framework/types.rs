use crate::worker::types::ShardId;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

/// What the cluster manager knows about the process serving a shard.
///
/// Opaque to the core apart from the address it exposes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExternalWorkerDescriptor {
    pub host: String,
    pub slave_id: String,
    pub task_id: String,
    pub executor_id: String,
    pub ip_addr: Option<String>,
    pub port: Option<u16>,
}

impl ExternalWorkerDescriptor {
    /// `ip:port` of the worker service, once both are known.
    pub fn shard_uri(&self) -> Option<String> {
        match (&self.ip_addr, self.port) {
            (Some(ip), Some(port)) => Some(format!("{}:{}", ip, port)),
            _ => None,
        }
    }

    /// One-line telemetry summary.
    pub fn report(&self) -> String {
        format!(
            "host {} slave {} task {} exe {} ip {}:{}",
            self.host,
            self.slave_id,
            self.task_id,
            self.executor_id,
            self.ip_addr.as_deref().unwrap_or("?"),
            self.port.map(|p| p.to_string()).unwrap_or_else(|| "?".to_string())
        )
    }
}

/// One registry slot: where a shard is served and, optionally, who serves it.
#[derive(Debug, Clone, PartialEq)]
pub struct ShardEntry {
    pub uri: String,
    pub descriptor: Option<ExternalWorkerDescriptor>,
}

/// A shard's answer to one request.
#[derive(Debug, Clone)]
pub struct ShardReply {
    pub shard_id: ShardId,
    pub status: StatusCode,
    pub body: String,
}

impl ShardReply {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn first_line(&self) -> &str {
        self.body.lines().next().unwrap_or("")
    }
}
