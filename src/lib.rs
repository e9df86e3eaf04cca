//! Distributed Framework Library
//!
//! Coordinates a fleet of worker processes ("shards") that jointly run a pluggable,
//! partitioned unit of work. The binary executable (`main.rs`) starts either role.
//!
//! ## Architecture Modules
//! - **`ring`**: Consistent hash ring mapping partition keys to shard identifiers.
//! - **`queue`**: Per-shard task queue and the one-shot phase signal that together make up
//!   the two-phase barrier (wait for producers, then join until drained).
//! - **`worker`**: One shard's HTTP service: configuration, credential checks, ring view,
//!   barrier endpoints and shutdown.
//! - **`uow`**: The `UnitOfWork` strategy contract and the identifier -> constructor registry.
//! - **`framework`**: The coordinator: assigns shard identities, pushes configuration and
//!   ring membership, delegates to the unit of work, runs the barrier and stops the shards.
//! - **`config`** / **`error`**: Runtime settings and the error taxonomy.

pub mod config;
pub mod error;
pub mod framework;
pub mod queue;
pub mod ring;
pub mod uow;
pub mod worker;

#[cfg(test)]
pub(crate) mod test_support;
