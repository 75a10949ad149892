//! Action factory scenarios against a live collection.

use ferry_tests::prelude::*;

mod online {
    use super::*;
    use pretty_assertions::assert_eq;
    use tokio::task::LocalSet;

    #[tokio::test]
    async fn test_online_insert_waits_for_the_server_record() {
        LocalSet::new()
            .run_until(async {
                // GIVEN inserts delivered online
                let harness = Harness::uniform(DeliveryStrategy::Online);

                // WHEN a todo is added
                let dispatched = harness
                    .actions
                    .add_one(todo(1, "Buy milk", false), fields!())
                    .await
                    .unwrap();

                // THEN the server holds it and the local store has it synced
                assert_eq!(dispatched.strategy(), DeliveryStrategy::Online);
                assert_eq!(api_titles(&harness), vec!["Buy milk".to_string()]);
                assert_eq!(
                    harness.collection().get_synced(&key(1)),
                    Some(todo(1, "Buy milk", false))
                );
                assert!(harness.collection().pending_keys().is_empty());
                assert!(harness.outbox.is_empty());
            })
            .await;
    }

    #[tokio::test]
    async fn test_online_failure_leaves_local_store_unchanged() {
        LocalSet::new()
            .run_until(async {
                let harness = Harness::build(
                    CollectionConfig::new(COLLECTION).with_update(DeliveryStrategy::Online),
                    vec![todo(1, "Buy milk", false)],
                );
                harness.wrapper.initialize().await.unwrap();
                harness.api.fail_next(1);

                let err = harness
                    .actions
                    .update_one(&key(1), fields! { "done" => true }, fields!())
                    .await
                    .unwrap_err();

                assert!(matches!(err, ActionError::Sync(SyncError::Remote { .. })));
                assert_eq!(
                    harness.collection().get(&key(1)),
                    Some(todo(1, "Buy milk", false))
                );
            })
            .await;
    }

    #[tokio::test]
    async fn test_failed_online_delete_keeps_queued_edit_visible() {
        LocalSet::new()
            .run_until(async {
                // GIVEN a todo completed offline
                let harness = Harness::build(
                    CollectionConfig::new(COLLECTION)
                        .with_update(DeliveryStrategy::Offline)
                        .with_delete(DeliveryStrategy::Online),
                    vec![todo(1, "Buy milk", false)],
                );
                harness.wrapper.initialize().await.unwrap();
                harness
                    .actions
                    .update_one(&key(1), fields! { "done" => true }, fields!())
                    .await
                    .unwrap();

                // WHEN deleting it online fails
                harness.api.fail_next(1);
                let err = harness.actions.delete_one(&key(1), fields!()).await;

                // THEN the queued edit is still what the collection shows
                assert!(err.is_err());
                assert_eq!(
                    harness.collection().get(&key(1)),
                    Some(todo(1, "Buy milk", true))
                );
                assert_eq!(harness.outbox.len(), 1);

                // AND it still reaches the server on replay
                harness.outbox.replay().await.unwrap();
                assert_eq!(harness.api.record("1"), Some(todo(1, "Buy milk", true)));
                assert!(harness.collection().pending_keys().is_empty());
            })
            .await;
    }

    fn api_titles(harness: &Harness) -> Vec<String> {
        harness
            .api
            .records()
            .iter()
            .filter_map(|r| r.get("title").and_then(|v| v.as_str()).map(String::from))
            .collect()
    }
}

mod optimistic {
    use super::*;
    use pretty_assertions::assert_eq;
    use tokio::task::LocalSet;

    #[tokio::test]
    async fn test_optimistic_update_is_visible_before_the_server_answers() {
        LocalSet::new()
            .run_until(async {
                // GIVEN a synced todo and optimistic updates
                let harness = Harness::build(
                    CollectionConfig::new(COLLECTION).with_update(DeliveryStrategy::Optimistic),
                    vec![todo(1, "Buy milk", false)],
                );
                harness.wrapper.initialize().await.unwrap();

                // WHEN the todo is completed
                let dispatched = harness
                    .actions
                    .update_one(&key(1), fields! { "done" => true }, fields!())
                    .await
                    .unwrap();

                // THEN the change shows locally right away
                assert_eq!(
                    harness.collection().get(&key(1)),
                    Some(todo(1, "Buy milk", true))
                );
                assert_eq!(
                    harness.collection().get_synced(&key(1)),
                    Some(todo(1, "Buy milk", false))
                );

                // AND settles once persisted
                let Dispatched::Optimistic(handle) = dispatched else {
                    panic!("expected an optimistic dispatch");
                };
                handle.persisted().await.unwrap();
                assert_eq!(
                    harness.collection().get_synced(&key(1)),
                    Some(todo(1, "Buy milk", true))
                );
                assert_eq!(harness.api.calls()[0].payload, fields! { "done" => true });
            })
            .await;
    }

    #[tokio::test]
    async fn test_optimistic_update_reaches_server_when_nobody_awaits_it() {
        LocalSet::new()
            .run_until(async {
                // GIVEN a synced todo and optimistic updates
                let harness = Harness::build(
                    CollectionConfig::new(COLLECTION).with_update(DeliveryStrategy::Optimistic),
                    vec![todo(1, "Buy milk", false)],
                );
                harness.wrapper.initialize().await.unwrap();

                // WHEN the update is fired and its handle thrown away
                drop(
                    harness
                        .actions
                        .update_one(&key(1), fields! { "done" => true }, fields!())
                        .await
                        .unwrap(),
                );
                for _ in 0..10 {
                    tokio::task::yield_now().await;
                }

                // THEN the server still got the change and the store settled
                assert_eq!(harness.api.calls().len(), 1);
                assert_eq!(harness.api.record("1"), Some(todo(1, "Buy milk", true)));
                assert_eq!(
                    harness.collection().get_synced(&key(1)),
                    Some(todo(1, "Buy milk", true))
                );
                assert!(harness.collection().pending_keys().is_empty());
            })
            .await;
    }

    #[tokio::test]
    async fn test_rejected_optimistic_update_rolls_back() {
        LocalSet::new()
            .run_until(async {
                let harness = Harness::build(
                    CollectionConfig::new(COLLECTION).with_update(DeliveryStrategy::Optimistic),
                    vec![todo(1, "Buy milk", false)],
                );
                harness.wrapper.initialize().await.unwrap();
                harness.api.fail_next(1);

                let Dispatched::Optimistic(handle) = harness
                    .actions
                    .update_one(&key(1), fields! { "done" => true }, fields!())
                    .await
                    .unwrap()
                else {
                    panic!("expected an optimistic dispatch");
                };

                assert!(handle.persisted().await.is_err());
                assert_eq!(
                    harness.collection().get(&key(1)),
                    Some(todo(1, "Buy milk", false))
                );
            })
            .await;
    }
}

mod offline {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_offline_delete_is_queued_with_annotations() {
        // GIVEN a synced todo and offline deletes
        let harness = Harness::build(
            CollectionConfig::new(COLLECTION).with_delete(DeliveryStrategy::Offline),
            vec![todo(1, "Buy milk", false)],
        );
        harness.wrapper.initialize().await.unwrap();

        // WHEN the todo is deleted with an annotation
        let dispatched = harness
            .actions
            .delete_one(&key(1), fields! { "reason" => "done" })
            .await
            .unwrap();

        // THEN it is gone locally, queued, and the server is untouched
        let Dispatched::Queued(transaction) = dispatched else {
            panic!("expected a queued dispatch");
        };
        assert!(transaction.is_committed());
        let mutation = &transaction.mutations()[0];
        assert_eq!(mutation.mutation_type, MutationType::Delete);
        let metadata = mutation.metadata.as_ref().unwrap();
        assert_eq!(metadata.context(), Some(DeliveryStrategy::Offline));
        assert_eq!(metadata.annotations(), &fields! { "reason" => "done" });

        assert_eq!(harness.collection().get(&key(1)), None);
        assert_eq!(harness.outbox.len(), 1);
        assert!(harness.api.calls().is_empty());
    }
}

mod contract {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_reserved_metadata_key_fails_before_any_effect() {
        let harness = Harness::uniform(DeliveryStrategy::Offline);

        let err = harness
            .actions
            .add_one(todo(1, "Buy milk", false), fields! { "context" => "mine" })
            .await
            .unwrap_err();

        assert!(matches!(err, ActionError::ReservedMetadataKey { .. }));
        assert_eq!(
            err.to_string(),
            "\"context\" property is reserved in metadata object"
        );
        assert!(harness.collection().is_empty());
        assert!(harness.outbox.is_empty());
    }

    #[tokio::test]
    async fn test_unconfigured_operation_is_absent() {
        let harness = Harness::build(
            CollectionConfig::new(COLLECTION).with_insert(DeliveryStrategy::Offline),
            Vec::new(),
        );

        assert!(harness.actions.has(OperationKind::Insert));
        assert!(!harness.actions.has(OperationKind::Delete));

        let err = harness
            .actions
            .delete_one(&key(1), fields!())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ActionError::NotConfigured {
                operation: OperationKind::Delete,
                ..
            }
        ));
    }
}
