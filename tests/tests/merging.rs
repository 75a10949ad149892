//! Merge engine scenarios.

use ferry_tests::prelude::*;

mod cancellation {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_insert_then_delete_cancels_out() {
        // GIVEN an insert followed by a delete of the same entity
        let existing = stamped(insert(1, todo(1, "Buy milk", false)), 1);
        let incoming = stamped(delete(1, todo(1, "Buy milk", false)), 2);

        // WHEN merged
        let merged = merge(existing, incoming).unwrap();

        // THEN nothing remains to send
        assert!(merged.is_none());
    }
}

mod collapsing {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_update_then_update_keeps_first_original_and_last_modified() {
        // GIVEN two successive edits
        let first = stamped(
            update(1, todo(1, "Buy milk", false), todo(1, "Buy oat milk", false)),
            1,
        );
        let second = stamped(
            update(1, todo(1, "Buy oat milk", false), todo(1, "Buy oat milk", true)),
            2,
        );

        // WHEN merged
        let merged = merge(first, second).unwrap().unwrap();

        // THEN the result spans both edits
        assert_eq!(merged.mutation_type, MutationType::Update);
        assert_eq!(merged.original, todo(1, "Buy milk", false));
        assert_eq!(merged.modified, todo(1, "Buy oat milk", true));
        assert_eq!(
            merged.changes,
            fields! { "title" => "Buy oat milk", "done" => true }
        );
        assert_eq!(merged.updated_at, 2);
    }

    #[test]
    fn test_insert_then_update_stays_an_insert() {
        let created = stamped(insert(1, todo(1, "Buy milk", false)), 1);
        let edited = stamped(
            update(1, todo(1, "Buy milk", false), todo(1, "Buy milk", true)),
            2,
        );

        let merged = merge(created, edited).unwrap().unwrap();

        assert_eq!(merged.mutation_type, MutationType::Insert);
        assert!(merged.original.is_empty());
        assert_eq!(merged.modified, todo(1, "Buy milk", true));
        assert_eq!(merged.key, key(1));
    }

    #[test]
    fn test_update_then_delete_becomes_the_delete() {
        let edited = stamped(
            update(1, todo(1, "Buy milk", false), todo(1, "Buy milk", true)),
            1,
        );
        let removed = stamped(delete(1, todo(1, "Buy milk", true)), 2);

        let merged = merge(edited, removed.clone()).unwrap();

        assert_eq!(merged, Some(removed));
    }
}

mod invalid_pairs {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_update_after_delete_is_rejected() {
        // GIVEN an entity already deleted
        let removed = stamped(delete(1, todo(1, "Buy milk", false)), 1);
        let edited = stamped(
            update(1, todo(1, "Buy milk", false), todo(1, "Buy milk", true)),
            2,
        );

        // WHEN an update is merged after the delete
        let err = merge(removed, edited).unwrap_err();

        // THEN the pair is refused and named in the message
        assert!(matches!(
            err,
            MutationError::UnmergeablePair {
                existing: MutationType::Delete,
                incoming: MutationType::Update,
            }
        ));
        assert_eq!(
            err.to_string(),
            "Unhandled mutation combination: delete-update"
        );
    }

    #[test]
    fn test_insert_after_delete_and_after_update_are_rejected() {
        let removed = stamped(delete(1, todo(1, "Buy milk", false)), 1);
        let edited = stamped(
            update(1, todo(1, "Buy milk", false), todo(1, "Buy milk", true)),
            1,
        );
        let created = stamped(insert(1, todo(1, "Buy milk", false)), 2);

        assert!(matches!(
            merge(removed, created.clone()),
            Err(MutationError::UnmergeablePair { .. })
        ));
        assert!(matches!(
            merge(edited, created),
            Err(MutationError::UnmergeablePair { .. })
        ));
    }

    #[test]
    fn test_different_entities_do_not_merge() {
        let first = insert(1, todo(1, "Buy milk", false));
        let second = insert(2, todo(2, "Walk the dog", false));

        assert!(matches!(
            merge(first, second),
            Err(MutationError::GlobalKeyMismatch { .. })
        ));
    }
}
