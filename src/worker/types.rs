use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of one shard within a Framework run, e.g. `shard/007`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ShardId(pub String);

impl ShardId {
    /// Builds the identifier for shard `index` out of `count`, zero-padded to the
    /// number of digits in `count` (3 shards -> `shard/0`, 10 shards -> `shard/00`).
    pub fn from_index(index: usize, count: usize) -> Self {
        let width = count.to_string().len();
        Self(format!("shard/{:0width$}", index, width = width))
    }
}

impl fmt::Display for ShardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The `(prefix, shard_id)` pair a shard requires on every authorized request.
///
/// Missing fields deserialize as empty strings so that a request without credentials
/// is rejected by the credential check rather than by the JSON parser.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ShardCredential {
    #[serde(default)]
    pub prefix: String,
    #[serde(default)]
    pub shard_id: String,
}

impl ShardCredential {
    pub fn new(prefix: impl Into<String>, shard_id: &ShardId) -> Self {
        Self {
            prefix: prefix.into(),
            shard_id: shard_id.0.clone(),
        }
    }

    pub fn shard(&self) -> ShardId {
        ShardId(self.shard_id.clone())
    }
}

impl fmt::Display for ShardCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "shard {} prefix {}", self.shard_id, self.prefix)
    }
}

/// Lifecycle of a worker process. `Unconfigured -> Configured` happens at most once.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum Lifecycle {
    #[default]
    Unconfigured,
    Configured,
    /// A task queue has been prepared and its consumer is running.
    Running,
    Stopped,
}

/// Point-in-time view of a shard's state, used by the introspection endpoint and by
/// tests asserting that rejected requests leave the shard untouched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShardStatus {
    pub lifecycle: Lifecycle,
    pub credential: Option<ShardCredential>,
    pub strategy: Option<String>,
    pub ring_size: usize,
    pub queue_active: bool,
    pub unfinished_tasks: usize,
    pub phase_in_flight: bool,
}
