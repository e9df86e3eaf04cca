//! Worker Module Tests
//!
//! Exercises the `Worker` state machine directly, without HTTP.
//!
//! ## Test Scopes
//! - **Configuration**: Exactly-once configuration, failed configuration leaves no trace.
//! - **Admission**: Requests with the wrong credential leave the shard untouched.
//! - **Barrier**: `queue_wait` and `queue_join` semantics and their independence.
//! - **Shutdown**: Credential-checked stop.

#[cfg(test)]
mod tests {
    use crate::config::WorkerSettings;
    use crate::error::WorkerError;
    use crate::ring::RingMembership;
    use crate::test_support::{RECORDING_UOW, RecordingUow, registry_with};
    use crate::uow::UowRegistry;
    use crate::worker::Worker;
    use crate::worker::types::{Lifecycle, ShardCredential, ShardId};
    use serde_json::json;
    use std::sync::Arc;
    use std::time::{Duration, Instant};
    use tokio::sync::Semaphore;
    use tokio::time::timeout;

    const PARKED: Duration = Duration::from_millis(100);
    const GENEROUS: Duration = Duration::from_secs(5);

    fn credential(prefix: &str, shard: &str) -> ShardCredential {
        ShardCredential {
            prefix: prefix.to_string(),
            shard_id: shard.to_string(),
        }
    }

    fn membership(n: usize) -> RingMembership {
        (0..n)
            .map(|i| (ShardId::from_index(i, n), format!("127.0.0.1:{}", 9311 + i)))
            .collect()
    }

    async fn configured_worker(uow: Arc<RecordingUow>) -> (Arc<Worker>, ShardCredential) {
        let worker = Worker::new(WorkerSettings::default(), registry_with(uow));
        let cred = credential("p", "shard/0");
        worker.configure(cred.clone(), RECORDING_UOW).await.unwrap();
        (worker, cred)
    }

    // ============================================================
    // CONFIGURATION
    // ============================================================

    #[tokio::test]
    async fn test_shard_id_zero_padding() {
        assert_eq!(ShardId::from_index(2, 3).0, "shard/2");
        assert_eq!(ShardId::from_index(0, 10).0, "shard/00");
        assert_eq!(ShardId::from_index(9, 10).0, "shard/09");
        assert_eq!(ShardId::from_index(7, 100).0, "shard/007");
    }

    #[tokio::test]
    async fn test_second_configuration_is_rejected() {
        // ARRANGE
        let worker = Worker::new(WorkerSettings::default(), UowRegistry::with_builtins());
        let first = credential("p", "shard/0");
        worker.configure(first.clone(), "echo").await.unwrap();
        let before = worker.status().await;

        // ACT
        let result = worker.configure(credential("q", "shard/9"), "echo").await;

        // ASSERT
        assert_eq!(result, Err(WorkerError::AlreadyConfigured));
        assert_eq!(worker.credential().await, Some(first));
        assert_eq!(worker.status().await, before);
        assert_eq!(before.strategy.as_deref(), Some("echo"));
    }

    #[tokio::test]
    async fn test_unknown_strategy_leaves_shard_unconfigured() {
        let worker = Worker::new(WorkerSettings::default(), UowRegistry::with_builtins());

        let result = worker.configure(credential("p", "shard/0"), "nope").await;

        assert_eq!(result, Err(WorkerError::UnknownStrategy("nope".to_string())));
        assert_eq!(worker.lifecycle().await, Lifecycle::Unconfigured);
        assert!(worker.credential().await.is_none());
        assert!(worker.uow().await.is_none());

        // A correct configuration is still possible afterwards
        worker
            .configure(credential("p", "shard/0"), "echo")
            .await
            .unwrap();
        assert_eq!(worker.lifecycle().await, Lifecycle::Configured);
    }

    #[tokio::test]
    async fn test_incomplete_credential_leaves_shard_unconfigured() {
        let worker = Worker::new(WorkerSettings::default(), UowRegistry::with_builtins());

        for incomplete in [credential("", "shard/0"), credential("p", ""), credential("", "")] {
            let result = worker.configure(incomplete, "echo").await;
            assert!(matches!(result, Err(WorkerError::MalformedPayload(_))));
        }

        assert_eq!(worker.lifecycle().await, Lifecycle::Unconfigured);
        assert!(worker.credential().await.is_none());
        assert!(matches!(
            worker.authorize(&ShardCredential::default()).await,
            Err(WorkerError::AuthMismatch { .. })
        ));
    }

    // ============================================================
    // ADMISSION
    // ============================================================

    #[tokio::test]
    async fn test_unconfigured_shard_rejects_everything() {
        let worker = Worker::new(WorkerSettings::default(), UowRegistry::with_builtins());

        let result = worker.authorize(&credential("p", "shard/0")).await;

        assert!(matches!(result, Err(WorkerError::AuthMismatch { .. })));
    }

    #[tokio::test]
    async fn test_wrong_credentials_leave_state_untouched() {
        // ARRANGE
        let (worker, _cred) = configured_worker(RecordingUow::new()).await;
        let before = worker.status().await;
        let wrong_prefix = credential("other", "shard/0");
        let wrong_shard = credential("p", "shard/1");

        // ACT
        let ring = worker.ring_init(&wrong_prefix, membership(2)).await;
        let auth = worker
            .authorize_payload(br#"{"prefix":"p","shard_id":"shard/1"}"#)
            .await;
        let missing = worker.authorize_payload(b"{}").await;
        let stopped = worker.request_stop(&wrong_shard).await;

        // ASSERT
        assert!(matches!(ring, Err(WorkerError::AuthMismatch { .. })));
        assert!(matches!(auth, Err(WorkerError::AuthMismatch { .. })));
        assert!(matches!(missing, Err(WorkerError::AuthMismatch { .. })));
        assert!(!stopped);
        assert!(!worker.is_stopping());
        assert_eq!(worker.status().await, before);
        assert!(worker.membership().await.is_none());
    }

    #[tokio::test]
    async fn test_malformed_payload_is_reported() {
        let (worker, _cred) = configured_worker(RecordingUow::new()).await;

        let result = worker.authorize_payload(b"not json").await;

        assert!(matches!(result, Err(WorkerError::MalformedPayload(_))));
    }

    // ============================================================
    // HASH RING
    // ============================================================

    #[tokio::test]
    async fn test_ring_init_stores_membership() {
        let (worker, cred) = configured_worker(RecordingUow::new()).await;

        worker.ring_init(&cred, membership(3)).await.unwrap();

        assert_eq!(worker.membership().await, Some(membership(3)));
        let ring = worker.ring().await.unwrap();
        assert_eq!(ring.len(), 3);
        assert!(ring.contains(&ShardId("shard/2".to_string())));
        assert_eq!(worker.status().await.ring_size, 3);
    }

    #[tokio::test]
    async fn test_ring_init_rejects_empty_membership() {
        let (worker, cred) = configured_worker(RecordingUow::new()).await;

        let result = worker.ring_init(&cred, RingMembership::new()).await;

        assert!(matches!(result, Err(WorkerError::MalformedPayload(_))));
        assert!(worker.ring().await.is_none());
    }

    // ============================================================
    // TASK QUEUE & BARRIER
    // ============================================================

    #[tokio::test]
    async fn test_enqueue_without_queue_fails() {
        let (worker, _cred) = configured_worker(RecordingUow::new()).await;

        let result = worker.enqueue(json!({ "seq": 0 })).await;

        assert_eq!(result, Err(WorkerError::NoActiveQueue));
    }

    #[tokio::test]
    async fn test_prepare_queue_requires_configuration() {
        let worker = Worker::new(WorkerSettings::default(), UowRegistry::with_builtins());

        assert_eq!(worker.prepare_queue().await, Err(WorkerError::NotConfigured));
    }

    #[tokio::test]
    async fn test_prepared_queue_feeds_unit_of_work() {
        // ARRANGE
        let uow = RecordingUow::new();
        let (worker, _cred) = configured_worker(uow.clone()).await;

        // ACT
        worker.prepare_queue().await.unwrap();
        for seq in 0..10 {
            worker.enqueue(json!({ "seq": seq })).await.unwrap();
        }
        timeout(GENEROUS, worker.queue_join()).await.unwrap();

        // ASSERT
        assert_eq!(worker.lifecycle().await, Lifecycle::Running);
        assert_eq!(uow.performed().await.len(), 10);
        assert_eq!(worker.status().await.unfinished_tasks, 0);
    }

    #[tokio::test]
    async fn test_queue_wait_without_phase_returns_immediately() {
        let (worker, _cred) = configured_worker(RecordingUow::new()).await;

        timeout(PARKED, worker.queue_wait())
            .await
            .expect("no phase in flight, nothing to wait for");
    }

    #[tokio::test]
    async fn test_queue_wait_returns_only_after_phase_ends() {
        // ARRANGE
        let (worker, _cred) = configured_worker(RecordingUow::new()).await;
        worker.begin_phase().await;
        let waiter = {
            let worker = worker.clone();
            tokio::spawn(async move { worker.queue_wait().await })
        };

        // ASSERT: parked while the phase is open
        tokio::time::sleep(PARKED).await;
        assert!(!waiter.is_finished());
        assert!(worker.status().await.phase_in_flight);

        // ACT
        worker.end_phase().await;

        // ASSERT
        timeout(GENEROUS, waiter).await.unwrap().unwrap();
        assert!(!worker.status().await.phase_in_flight);

        // The ended phase was discarded, later waits return at once
        timeout(PARKED, worker.queue_wait()).await.unwrap();
    }

    #[tokio::test]
    async fn test_join_does_not_wait_for_phase() {
        // ARRANGE: phase open, queue empty
        let (worker, _cred) = configured_worker(RecordingUow::new()).await;
        worker.prepare_queue().await.unwrap();
        worker.begin_phase().await;

        // ASSERT: join returns, wait does not
        timeout(PARKED, worker.queue_join())
            .await
            .expect("empty queue joins immediately");
        assert!(timeout(PARKED, worker.queue_wait()).await.is_err());

        worker.end_phase().await;
    }

    #[tokio::test]
    async fn test_wait_does_not_wait_for_queue() {
        // ARRANGE: no phase, queue holding a parked task
        let gate = Arc::new(Semaphore::new(0));
        let (worker, _cred) = configured_worker(RecordingUow::gated(gate.clone())).await;
        worker.prepare_queue().await.unwrap();
        worker.enqueue(json!({ "seq": 0 })).await.unwrap();

        // ASSERT: wait returns, join does not
        timeout(PARKED, worker.queue_wait()).await.unwrap();
        assert!(timeout(PARKED, worker.queue_join()).await.is_err());

        gate.add_permits(1);
        timeout(GENEROUS, worker.queue_join()).await.unwrap();
    }

    #[tokio::test]
    async fn test_run_phase_always_ends_phase() {
        let (worker, _cred) = configured_worker(RecordingUow::new()).await;
        worker.prepare_queue().await.unwrap();

        let queued = worker
            .run_phase(async {
                for seq in 0..3 {
                    worker.enqueue(json!({ "seq": seq })).await.unwrap();
                }
                3
            })
            .await;

        assert_eq!(queued, 3);
        assert!(!worker.status().await.phase_in_flight);
        timeout(PARKED, worker.queue_wait()).await.unwrap();
    }

    // ============================================================
    // SHUTDOWN
    // ============================================================

    #[tokio::test]
    async fn test_matching_stop_request_stops_shard() {
        let (worker, cred) = configured_worker(RecordingUow::new()).await;
        let stopped = worker.stopped();

        assert!(worker.request_stop(&cred).await);

        timeout(GENEROUS, stopped).await.unwrap();
        assert!(worker.is_stopping());
        assert_eq!(worker.lifecycle().await, Lifecycle::Stopped);
    }

    #[tokio::test]
    async fn test_force_close_follows_stop_after_grace() {
        // ARRANGE
        let settings = WorkerSettings {
            force_close_after: PARKED,
            ..WorkerSettings::default()
        };
        let worker = Worker::new(settings, UowRegistry::with_builtins());
        let force_closed = worker.force_closed();

        // ASSERT: nothing is cut off while the shard runs
        assert!(timeout(PARKED * 2, worker.force_closed()).await.is_err());

        // ACT
        let started = Instant::now();
        worker.shutdown().await;

        // ASSERT
        timeout(GENEROUS, force_closed).await.unwrap();
        assert!(started.elapsed() >= PARKED);
    }
}
