//! Offline queueing and replay scenarios.

use std::time::Duration;

use ferry_tests::prelude::*;

fn offline_harness(records: Vec<Fields>) -> Harness {
    Harness::build(
        CollectionConfig::new(COLLECTION)
            .with_insert(DeliveryStrategy::Offline)
            .with_update(DeliveryStrategy::Offline)
            .with_delete(DeliveryStrategy::Offline),
        records,
    )
}

mod replay {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_queued_edits_reach_the_server_consolidated() {
        // GIVEN a synced todo and a session of offline edits
        let harness = offline_harness(vec![todo(1, "Buy milk", false)]);
        harness.wrapper.initialize().await.unwrap();
        let actions = &harness.actions;

        actions.add_one(todo(2, "Walk the dog", false), fields!()).await.unwrap();
        actions
            .update_one(&key(2), fields! { "title" => "Walk the cat" }, fields!())
            .await
            .unwrap();
        actions
            .update_one(&key(1), fields! { "done" => true }, fields!())
            .await
            .unwrap();
        actions.add_one(todo(3, "Scratch that", false), fields!()).await.unwrap();
        actions.delete_one(&key(3), fields!()).await.unwrap();
        assert_eq!(harness.outbox.len(), 5);

        // WHEN the backlog is replayed
        let stats = harness.outbox.replay().await.unwrap();

        // THEN only what survives consolidation is sent
        assert_eq!(stats.queued, 5);
        assert_eq!(stats.consolidated, 2);
        assert_eq!(stats.replayed, 2);
        assert_eq!(stats.remaining, 0);
        assert_eq!(
            harness.api.call_types(),
            vec![MutationType::Insert, MutationType::Update]
        );
        assert_eq!(
            harness.api.calls()[0].payload,
            todo(2, "Walk the cat", false)
        );

        // AND server and local store agree
        assert_eq!(
            harness.api.records(),
            vec![todo(1, "Buy milk", true), todo(2, "Walk the cat", false)]
        );
        assert_eq!(harness.collection().values(), harness.api.records());
        assert!(harness.collection().pending_keys().is_empty());
        assert!(harness.outbox.is_empty());
    }

    #[tokio::test]
    async fn test_transient_failure_keeps_the_transaction_queued() {
        // GIVEN one queued insert and a flaky server
        let harness = offline_harness(Vec::new());
        harness
            .actions
            .add_one(todo(1, "Buy milk", false), fields!())
            .await
            .unwrap();
        harness.api.fail_next(1);

        // WHEN replayed once
        let stats = harness.outbox.replay().await.unwrap();

        // THEN it stays queued with a backoff, still visible locally
        assert_eq!(stats.replayed, 0);
        assert!(stats.failed.is_some());
        let backlog = harness.outbox.backlog();
        assert_eq!(backlog.len(), 1);
        assert_eq!(backlog[0].attempts, 1);
        assert_eq!(backlog[0].retry_delay, Some(Duration::from_secs(1)));
        assert_eq!(
            harness.collection().get(&key(1)),
            Some(todo(1, "Buy milk", false))
        );

        // AND the retry reuses the same idempotency key
        harness.outbox.replay().await.unwrap();
        let keys: Vec<_> = harness
            .api
            .calls()
            .into_iter()
            .map(|c| c.idempotency_key)
            .collect();
        assert_eq!(keys, vec!["tx-1".to_string(), "tx-1".to_string()]);
        assert!(harness.outbox.is_empty());
    }

    #[tokio::test]
    async fn test_abandoned_insert_disappears_locally() {
        // GIVEN a queued insert and a server that never comes back
        let harness = offline_harness(Vec::new());
        harness
            .actions
            .add_one(todo(9, "Lost cause", false), fields!())
            .await
            .unwrap();
        harness.api.fail_next(100);

        // WHEN every retry is spent
        harness.outbox.replay().await.unwrap();
        harness.outbox.replay().await.unwrap();
        let stats = harness.outbox.replay().await.unwrap();

        // THEN the transaction is gone and so is its local trace
        assert!(stats.abandoned.is_some());
        assert!(harness.outbox.is_empty());
        assert_eq!(harness.collection().get(&key(9)), None);
        assert!(harness.collection().pending_keys().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drain_waits_out_the_backoff() {
        let harness = offline_harness(Vec::new());
        harness
            .actions
            .add_one(todo(1, "Buy milk", false), fields!())
            .await
            .unwrap();
        harness.api.fail_next(2);
        let started = tokio::time::Instant::now();

        let replayed = harness.outbox.drain().await.unwrap();

        assert_eq!(replayed, 1);
        assert!(started.elapsed() >= Duration::from_secs(5));
        assert_eq!(harness.api.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_empty_server_answer_drops_the_transaction() {
        let harness = offline_harness(Vec::new());
        harness
            .actions
            .add_one(todo(1, "Buy milk", false), fields!())
            .await
            .unwrap();
        harness.api.answer_empty(true);

        let err = harness.outbox.replay().await.unwrap_err();

        assert!(matches!(
            err,
            OutboxError::Rejected {
                source: SyncError::EmptyResponse { .. },
                ..
            }
        ));
        assert!(harness.outbox.is_empty());
        assert_eq!(harness.collection().get(&key(1)), None);
        assert!(harness.collection().pending_keys().is_empty());
    }
}

mod leadership {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_followers_keep_their_backlog() {
        let harness = offline_harness(Vec::new());
        harness
            .actions
            .add_one(todo(1, "Buy milk", false), fields!())
            .await
            .unwrap();
        harness.outbox.set_leader(false);

        let err = harness.outbox.replay().await.unwrap_err();

        assert!(matches!(err, OutboxError::NotLeader));
        assert_eq!(harness.outbox.len(), 1);
        assert!(harness.api.calls().is_empty());
    }
}
