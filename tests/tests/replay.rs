//! Sequential execution and write-back scenarios.

use std::rc::Rc;

use ferry_tests::prelude::*;

fn persister(api: Rc<RecordingApi>) -> Persister {
    Persister::new(MutationsMap::from_endpoints(api), ApplyWrite::default())
}

mod execution {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_two_entities_replay_in_order_with_one_batch() {
        // GIVEN a transaction creating one todo and completing another
        let api = Rc::new(RecordingApi::with_records(vec![todo(2, "Walk the dog", false)]));
        let store = BatchLog::new();
        let transaction = tx(
            1,
            100,
            vec![
                insert(1, todo(1, "Buy milk", false)),
                update(2, todo(2, "Walk the dog", false), todo(2, "Walk the dog", true)),
            ],
        );

        // WHEN persisted
        let responses = persister(api.clone())
            .persist(&transaction, &transaction.idempotency_key(), &store)
            .await
            .unwrap();

        // THEN the calls went out in order under one idempotency key
        assert_eq!(
            api.call_types(),
            vec![MutationType::Insert, MutationType::Update]
        );
        let keys: Vec<_> = api.calls().into_iter().map(|c| c.idempotency_key).collect();
        assert_eq!(keys, vec!["tx-1".to_string(), "tx-1".to_string()]);
        assert_eq!(api.calls()[1].payload, fields! { "done" => true });

        // AND the store received exactly one batch of two upserts
        assert_eq!(responses.len(), 2);
        assert_eq!(store.batch_count(), 1);
        assert_eq!(
            store.ops(),
            vec![
                WriteOp::Upsert(todo(1, "Buy milk", false)),
                WriteOp::Upsert(todo(2, "Walk the dog", true)),
            ]
        );
    }

    #[tokio::test]
    async fn test_remote_failure_stops_the_transaction_and_writes_nothing() {
        // GIVEN a server that fails the first call
        let api = Rc::new(RecordingApi::new());
        api.fail_next(1);
        let store = BatchLog::new();
        let transaction = tx(
            1,
            100,
            vec![
                insert(1, todo(1, "Buy milk", false)),
                insert(2, todo(2, "Walk the dog", false)),
            ],
        );

        // WHEN persisted
        let err = persister(api.clone())
            .persist(&transaction, "tx-1", &store)
            .await
            .unwrap_err();

        // THEN the second mutation was never sent
        assert!(err.is_retryable());
        assert_eq!(api.calls().len(), 1);
        assert_eq!(store.batch_count(), 0);
    }

    #[tokio::test]
    async fn test_caller_annotations_reach_the_server_without_context() {
        let api = Rc::new(RecordingApi::new());
        let metadata = MutationMetadata::new(fields! { "source" => "import" })
            .unwrap()
            .with_context(DeliveryStrategy::Offline);
        let transaction = tx(
            1,
            100,
            vec![insert(1, todo(1, "Buy milk", false)).with_metadata(metadata)],
        );

        execute(&transaction, &MutationsMap::from_endpoints(api.clone()), "tx-1")
            .await
            .unwrap();

        assert_eq!(api.calls()[0].metadata, fields! { "source" => "import" });
    }
}

mod write_back {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_delete_response_removes_by_echoed_key() {
        // GIVEN a delete answered with the removed record's id
        let store = BatchLog::new();
        let responses = vec![MutationResponse {
            mutation_type: MutationType::Delete,
            response: RemoteResponse::single(fields! { "id" => 7 }),
        }];

        // WHEN written back
        ApplyWrite::default().apply_write(&responses, &store).unwrap();

        // THEN one delete of key 7 and no upsert
        assert_eq!(store.ops(), vec![WriteOp::Delete(key(7))]);
    }

    #[test]
    fn test_empty_response_is_a_contract_violation() {
        // GIVEN an insert answered with no data
        let store = BatchLog::new();
        let responses = vec![
            MutationResponse {
                mutation_type: MutationType::Update,
                response: RemoteResponse::single(todo(1, "Buy milk", true)),
            },
            MutationResponse {
                mutation_type: MutationType::Insert,
                response: RemoteResponse::default(),
            },
        ];

        // WHEN written back
        let err = ApplyWrite::default()
            .apply_write(&responses, &store)
            .unwrap_err();

        // THEN nothing was written, not even the valid update
        assert!(err.is_contract_violation());
        assert!(matches!(
            err,
            SyncError::EmptyResponse {
                mutation_type: MutationType::Insert
            }
        ));
        assert_eq!(store.batch_count(), 0);
    }

    #[tokio::test]
    async fn test_empty_server_answer_fails_the_persist() {
        let api = Rc::new(RecordingApi::new());
        api.answer_empty(true);
        let store = BatchLog::new();
        let transaction = tx(1, 100, vec![insert(1, todo(1, "Buy milk", false))]);

        let err = persister(api.clone())
            .persist(&transaction, "tx-1", &store)
            .await
            .unwrap_err();

        assert!(err.is_contract_violation());
        assert_eq!(api.calls().len(), 1);
        assert_eq!(store.batch_count(), 0);
    }
}
