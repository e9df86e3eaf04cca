use crate::error::WorkerError;
use crate::uow::UnitOfWork;

use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

/// A joinable FIFO of task payloads with a single consumer.
///
/// `put` never blocks. The consumer task processes payloads strictly in arrival order,
/// one at a time, and only counts a payload as done once `perform_task` has returned
/// (or failed, or panicked), so `join` cannot hang on a single bad payload.
pub struct TaskQueue {
    tx: mpsc::UnboundedSender<Value>,
    /// Payloads pushed but not yet processed.
    unfinished: Arc<watch::Sender<usize>>,
}

impl TaskQueue {
    /// Creates the queue and spawns its consumer on the current runtime.
    ///
    /// The consumer exits once the queue is dropped and every queued payload is processed.
    pub fn spawn(uow: Arc<dyn UnitOfWork>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let (unfinished, _) = watch::channel(0usize);
        let unfinished = Arc::new(unfinished);

        let counter = unfinished.clone();
        tokio::spawn(async move {
            consume(rx, uow, counter).await;
        });

        Self { tx, unfinished }
    }

    /// Appends a payload to the queue.
    pub fn put(&self, payload: Value) -> Result<(), WorkerError> {
        self.unfinished.send_modify(|n| *n += 1);

        if self.tx.send(payload).is_err() {
            self.unfinished.send_modify(|n| *n = n.saturating_sub(1));
            tracing::error!("Task queue consumer is gone, payload not queued");
            return Err(WorkerError::NoActiveQueue);
        }

        Ok(())
    }

    pub fn unfinished(&self) -> usize {
        *self.unfinished.borrow()
    }

    /// Suspends the caller until every payload pushed so far has been processed.
    pub async fn join(&self) {
        let mut rx = self.unfinished.subscribe();
        let _ = rx.wait_for(|n| *n == 0).await;
    }
}

async fn consume(
    mut rx: mpsc::UnboundedReceiver<Value>,
    uow: Arc<dyn UnitOfWork>,
    unfinished: Arc<watch::Sender<usize>>,
) {
    tracing::debug!("Task queue consumer started for {}", uow.name());

    while let Some(payload) = rx.recv().await {
        let task_uow = uow.clone();

        // A panic inside the strategy surfaces here as a JoinError.
        let outcome = tokio::spawn(async move { task_uow.perform_task(payload).await }).await;

        match outcome {
            Ok(Ok(())) => tracing::trace!("Task performed"),
            Ok(Err(e)) => tracing::warn!("Task failed in {}: {}", uow.name(), e),
            Err(e) => tracing::error!("Task panicked in {}: {}", uow.name(), e),
        }

        unfinished.send_modify(|n| *n = n.saturating_sub(1));
    }

    tracing::debug!("Task queue consumer stopped");
}
