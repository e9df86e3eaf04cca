//! Runtime settings for the two process roles.

use std::net::SocketAddr;
use std::time::Duration;

pub const DEFAULT_WORKER_PORT: u16 = 9311;
pub const DEFAULT_PREFIX_ROOT: &str = "/tmp/distributed_framework";

/// Settings of one worker (shard) process.
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    pub bind_addr: SocketAddr,
    /// Delay between acknowledging `shard/stop` and stopping the serving loop,
    /// so the `Goodbye` reaches the caller first.
    pub stop_delay: Duration,
    /// Once the serving loop stops accepting, callers still blocked on `queue/wait` or
    /// `queue/join` after this long have their connection aborted.
    pub force_close_after: Duration,
}

impl WorkerSettings {
    pub fn on_port(port: u16) -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], port)),
            ..Self::default()
        }
    }
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_WORKER_PORT)),
            stop_delay: Duration::from_secs(1),
            force_close_after: Duration::from_secs(2),
        }
    }
}

/// Settings of the coordinator process.
#[derive(Debug, Clone)]
pub struct FrameworkSettings {
    /// Identifier of the unit of work driven by this run.
    pub uow_name: String,
    /// Storage root; the run prefix is `{prefix_root}/{run uuid}`.
    pub prefix_root: String,
}

impl FrameworkSettings {
    pub fn new(uow_name: impl Into<String>) -> Self {
        Self {
            uow_name: uow_name.into(),
            prefix_root: DEFAULT_PREFIX_ROOT.to_string(),
        }
    }
}
