//! Barrier Task Queue Module
//!
//! The per-shard building blocks of the two-phase barrier.
//!
//! ## Primitives
//! - **`TaskQueue`**: An unbounded FIFO of task payloads drained by exactly one consumer,
//!   which hands each payload to the unit of work. `join` resolves once every payload
//!   pushed so far has been processed.
//! - **`PhaseEvent`**: A one-shot signal for one production phase. Producers set it when
//!   they are done sending; any number of `queue/wait` callers observe it.
//!
//! The two are independent: waiting on the event says nothing about the
//! queue having drained, and a drained queue says nothing about producers being done.

pub mod phase;
pub mod task_queue;

pub use phase::PhaseEvent;
pub use task_queue::TaskQueue;

#[cfg(test)]
mod tests;
