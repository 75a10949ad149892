//! Record and transaction builders.

use ferry_core::{fields, Fields, GlobalKey, Key, MutationId, TransactionId};
use ferry_mutation::PendingMutation;
use ferry_transaction::Transaction;

pub const COLLECTION: &str = "todos";

pub fn todo(id: i64, title: &str, done: bool) -> Fields {
    fields! { "id" => id, "title" => title, "done" => done }
}

pub fn global_key(id: i64) -> GlobalKey {
    GlobalKey::new(COLLECTION, &Key::from(id))
}

pub fn key(id: i64) -> Key {
    Key::from(id)
}

pub fn insert(id: i64, snapshot: Fields) -> PendingMutation {
    PendingMutation::insert(global_key(id), snapshot)
}

pub fn update(id: i64, original: Fields, modified: Fields) -> PendingMutation {
    PendingMutation::update(global_key(id), original, modified)
}

pub fn delete(id: i64, original: Fields) -> PendingMutation {
    PendingMutation::delete(global_key(id), original)
}

/// Stamp ordering tokens so later builders win merges.
pub fn stamped(mutation: PendingMutation, seq: u64) -> PendingMutation {
    mutation.stamped(MutationId::new(seq), seq as i64)
}

pub fn tx(id: u64, created_at: i64, mutations: Vec<PendingMutation>) -> Transaction {
    Transaction::with_mutations(TransactionId::new(id), created_at, mutations)
}
