//! Unit of Work Module
//!
//! The pluggable computation a Framework run distributes across its shards.
//!
//! ## Contract
//! A strategy implements [`UnitOfWork`]:
//! - **`perform_task`**: Called by a shard's task queue consumer once per dequeued payload.
//! - **`orchestrate`**: Called once by the coordinator after every shard is configured and
//!   ring-initialized; drives the run through REST calls.
//! - **`handle_endpoint`**: Lets the strategy serve extra paths on a shard. The shard offers
//!   every request here first and falls back to its built-in routes when it returns `None`.
//!
//! Strategies are looked up by identifier in the [`UowRegistry`]; unknown identifiers fail
//! with `UnknownStrategy`.
//!
//! ## Submodules
//! - **`types`**: The `UnitOfWork` trait.
//! - **`registry`**: Identifier -> constructor registry.
//! - **`echo`**: A built-in strategy that records the payloads it performs.

pub mod echo;
pub mod registry;
pub mod types;

pub use registry::UowRegistry;
pub use types::UnitOfWork;
