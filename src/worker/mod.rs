//! Worker (Shard) Module
//!
//! One shard of the distributed computation, served over HTTP.
//!
//! ## Request Flow
//! 1. **Extension**: Every request is first offered to the configured unit of work, which
//!    may serve strategy-specific paths.
//! 2. **Built-in routes**: Otherwise the lifecycle, ring, barrier and checkpoint routes in
//!    `protocol` apply; unknown paths get a 404.
//! 3. **Admission**: Apart from `shard/config` and `shard/stop`, each route checks the
//!    caller's `(prefix, shard_id)` credential before touching any state.
//!
//! Each connection is served on its own tokio task, so a caller parked on `queue/wait`
//! or `queue/join` never blocks the shard from answering others.
//!
//! ## Submodules
//! - **`types`**: Shard identity, credential, lifecycle and status snapshot.
//! - **`protocol`**: Paths, request DTOs and acknowledgement bodies.
//! - **`service`**: The `Worker` state machine.
//! - **`handlers`**: axum handlers and the unit-of-work middleware.
//! - **`server`**: Router construction and the serving loop.

pub mod handlers;
pub mod protocol;
pub mod server;
pub mod service;
pub mod types;

pub use service::Worker;

#[cfg(test)]
mod tests;
