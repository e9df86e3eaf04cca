//! Hash Ring Module
//!
//! Consistent hashing from an arbitrary partition key (e.g. an individual's
//! identifier) to the shard that owns it.
//!
//! ## Core Concepts
//! - **Virtual Nodes**: Every shard is placed on the ring many times so keys spread evenly
//!   even when only a handful of shards are running.
//! - **Determinism**: The same membership always yields the same ring, on the coordinator
//!   and on every worker that received `ring/init`.
//! - **Membership**: The `shard_id -> address` map pushed by the coordinator; the ring is
//!   rebuilt from it wholesale.

pub mod hashring;

pub use hashring::{HashRing, RingMembership};
