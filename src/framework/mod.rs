//! Framework (Coordinator) Module
//!
//! Drives a fleet of worker shards through one distributed run.
//!
//! ## Run Sequence
//! 1. **Registry**: One `ShardId` per worker address, zero-padded by index.
//! 2. **Configuration**: `shard/config` with the run credential and the unit of work.
//! 3. **Ring**: `ring/init` with the full `shard_id -> address` membership.
//! 4. **Orchestration**: The unit of work's `orchestrate` issues whatever calls it needs.
//! 5. **Barrier**: `queue/wait` on every shard, then `queue/join` on every shard.
//! 6. **Shutdown**: `shard/stop` on every shard.
//!
//! Shards never talk to each other; every cross-shard call goes through here.
//!
//! ## Submodules
//! - **`types`**: Registry entries, external worker descriptors, shard replies.
//! - **`client`**: The HTTP client that stamps the run credential on every request.
//! - **`service`**: The `Framework` itself.

pub mod client;
pub mod service;
pub mod types;

pub use service::{Framework, check_replies};
