//! Barrier Primitive Tests
//!
//! ## Test Scopes
//! - **PhaseEvent**: Waiters stay parked until the event is set, and a set event releases
//!   every waiter, including late ones.
//! - **TaskQueue**: FIFO processing, `join` semantics under slow and failing tasks.

#[cfg(test)]
mod tests {
    use crate::queue::{PhaseEvent, TaskQueue};
    use crate::test_support::RecordingUow;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::Semaphore;
    use tokio::time::timeout;

    const PARKED: Duration = Duration::from_millis(100);
    const GENEROUS: Duration = Duration::from_secs(5);

    // ============================================================
    // PHASE EVENT
    // ============================================================

    #[tokio::test]
    async fn test_wait_parks_until_set() {
        // ARRANGE
        let event = PhaseEvent::new();
        let waiter = {
            let event = event.clone();
            tokio::spawn(async move { event.wait().await })
        };

        // ASSERT: still parked while the phase is open
        tokio::time::sleep(PARKED).await;
        assert!(!waiter.is_finished());
        assert!(!event.is_set());

        // ACT
        event.set();

        // ASSERT
        timeout(GENEROUS, waiter).await.unwrap().unwrap();
        assert!(event.is_set());
    }

    #[tokio::test]
    async fn test_set_releases_many_waiters() {
        let event = PhaseEvent::new();
        let waiters: Vec<_> = (0..5)
            .map(|_| {
                let event = event.clone();
                tokio::spawn(async move { event.wait().await })
            })
            .collect();

        event.set();

        for waiter in waiters {
            timeout(GENEROUS, waiter).await.unwrap().unwrap();
        }
    }

    #[tokio::test]
    async fn test_wait_after_set_returns_immediately() {
        let event = PhaseEvent::new();
        event.set();

        timeout(PARKED, event.wait())
            .await
            .expect("a set event must not block");
    }

    // ============================================================
    // TASK QUEUE
    // ============================================================

    #[tokio::test]
    async fn test_payloads_processed_in_arrival_order() {
        // ARRANGE
        let uow = RecordingUow::new();
        let queue = TaskQueue::spawn(uow.clone());

        // ACT
        for seq in 0..50 {
            queue.put(json!({ "seq": seq })).unwrap();
        }
        timeout(GENEROUS, queue.join()).await.unwrap();

        // ASSERT
        let seqs: Vec<u64> = uow
            .performed()
            .await
            .iter()
            .map(|p| p["seq"].as_u64().unwrap())
            .collect();
        assert_eq!(seqs, (0..50).collect::<Vec<u64>>());
        assert_eq!(queue.unfinished(), 0);
    }

    #[tokio::test]
    async fn test_join_on_empty_queue_returns_immediately() {
        let queue = TaskQueue::spawn(RecordingUow::new());

        timeout(PARKED, queue.join())
            .await
            .expect("nothing queued, nothing to wait for");
    }

    #[tokio::test]
    async fn test_join_waits_for_unprocessed_payloads() {
        // ARRANGE: every task needs a permit before it can finish
        let gate = Arc::new(Semaphore::new(0));
        let uow = RecordingUow::gated(gate.clone());
        let queue = Arc::new(TaskQueue::spawn(uow.clone()));

        for seq in 0..3 {
            queue.put(json!({ "seq": seq })).unwrap();
        }

        // ASSERT: join stays parked while tasks are outstanding
        assert!(timeout(PARKED, queue.join()).await.is_err());
        assert_eq!(queue.unfinished(), 3);

        // ACT: let two through, join must still be parked
        gate.add_permits(2);
        assert!(timeout(PARKED, queue.join()).await.is_err());
        assert_eq!(uow.performed().await.len(), 2);

        // ACT: release the last one
        gate.add_permits(1);
        timeout(GENEROUS, queue.join()).await.unwrap();

        // ASSERT
        assert_eq!(uow.performed().await.len(), 3);
        assert_eq!(queue.unfinished(), 0);
    }

    #[tokio::test]
    async fn test_join_covers_interleaved_producers() {
        // ARRANGE
        let uow = RecordingUow::new();
        let queue = Arc::new(TaskQueue::spawn(uow.clone()));

        // ACT: several producers push concurrently, yielding between puts
        let producers: Vec<_> = (0..4)
            .map(|producer| {
                let queue = queue.clone();
                tokio::spawn(async move {
                    for seq in 0..25 {
                        queue.put(json!({ "producer": producer, "seq": seq })).unwrap();
                        tokio::task::yield_now().await;
                    }
                })
            })
            .collect();
        for producer in producers {
            producer.await.unwrap();
        }
        timeout(GENEROUS, queue.join()).await.unwrap();

        // ASSERT: everything pushed before the join was processed, each producer in order
        let performed = uow.performed().await;
        assert_eq!(performed.len(), 100);
        for producer in 0..4 {
            let seqs: Vec<u64> = performed
                .iter()
                .filter(|p| p["producer"] == producer)
                .map(|p| p["seq"].as_u64().unwrap())
                .collect();
            assert_eq!(seqs, (0..25).collect::<Vec<u64>>());
        }
    }

    #[tokio::test]
    async fn test_failing_and_panicking_tasks_still_count_as_done() {
        // ARRANGE
        let uow = RecordingUow::new();
        let queue = TaskQueue::spawn(uow.clone());

        // ACT
        queue.put(json!({ "fail": true })).unwrap();
        queue.put(json!({ "panic": true })).unwrap();
        queue.put(json!({ "seq": 1 })).unwrap();

        // ASSERT: join does not hang on the bad payloads and the consumer survives
        timeout(GENEROUS, queue.join()).await.unwrap();
        assert_eq!(uow.performed().await, vec![json!({ "seq": 1 })]);

        queue.put(json!({ "seq": 2 })).unwrap();
        timeout(GENEROUS, queue.join()).await.unwrap();
        assert_eq!(uow.performed().await.len(), 2);
    }
}
