use tokio::sync::watch;

/// One-shot "producers are done" signal scoped to a single production phase.
///
/// Cloning shares the same underlying signal. Once set it stays set; a new phase
/// needs a fresh `PhaseEvent`.
#[derive(Debug, Clone)]
pub struct PhaseEvent {
    tx: watch::Sender<bool>,
}

impl PhaseEvent {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    /// Marks the phase as finished, waking every current and future waiter.
    pub fn set(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_set(&self) -> bool {
        *self.tx.borrow()
    }

    /// Suspends the calling task until `set` has been called.
    pub async fn wait(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait.
        let _ = rx.wait_for(|done| *done).await;
    }
}

impl Default for PhaseEvent {
    fn default() -> Self {
        Self::new()
    }
}
