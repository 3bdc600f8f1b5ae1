//! Foreign key probes against a parent table's primary key.

use crate::testing::{int_index, row, row_by};
use crate::types::{TxnId, Value};
use crate::{IndexStore, Snapshot, Uniqueness};

/// Child rows are (id, parent_id); the parent key is child column 1.
const FK_MAP: &[usize] = &[1];

#[test]
fn test_committed_parent_exists() {
    let parent_pk = int_index("pk_parent", Uniqueness::PrimaryKey, &[0]);
    let store = IndexStore::new();
    let checker = Snapshot::latest(TxnId(10));
    parent_pk
        .insert(&checker, &store, row(1, vec![Value::Integer(100)]))
        .expect("insert parent");

    let child = [Value::Integer(7), Value::Integer(100)];
    assert!(parent_pk.exists_parent(&checker, &store, &child, FK_MAP).expect("probe"));

    let orphan = [Value::Integer(8), Value::Integer(101)];
    assert!(!parent_pk.exists_parent(&checker, &store, &orphan, FK_MAP).expect("probe"));
}

#[test]
fn test_rolled_back_parent_is_absent() {
    let parent_pk = int_index("pk_parent", Uniqueness::PrimaryKey, &[0]);
    let store = IndexStore::new();

    // Txn 6 inserted parent 100 and rolled back; its entry awaits cleanup.
    let writer = Snapshot::latest(TxnId(6));
    parent_pk
        .insert(&writer, &store, row_by(1, vec![Value::Integer(100)], TxnId(6)))
        .expect("insert parent");

    let checker = Snapshot::latest(TxnId(10)).with_aborted([TxnId(6)]);
    let child = [Value::Integer(7), Value::Integer(100)];
    assert!(!parent_pk.exists_parent(&checker, &store, &child, FK_MAP).expect("probe"));
    // The entry is still physically present.
    assert_eq!(parent_pk.node_count(&store).expect("count"), 1);
}

#[test]
fn test_uncommitted_parent_is_absent() {
    let parent_pk = int_index("pk_parent", Uniqueness::PrimaryKey, &[0]);
    let store = IndexStore::new();
    let writer = Snapshot::latest(TxnId(12));
    parent_pk
        .insert(&writer, &store, row_by(1, vec![Value::Integer(100)], TxnId(12)))
        .expect("insert parent");

    let checker = Snapshot::latest(TxnId(13)).with_in_flight([TxnId(12)]);
    let child = [Value::Integer(7), Value::Integer(100)];
    assert!(!parent_pk.exists_parent(&checker, &store, &child, FK_MAP).expect("probe"));
    // The writer sees its own parent.
    assert!(parent_pk.exists_parent(&writer, &store, &child, FK_MAP).expect("probe"));
}

#[test]
fn test_null_foreign_key_matches_nothing() {
    let parent_pk = int_index("pk_parent", Uniqueness::PrimaryKey, &[0]);
    let store = IndexStore::new();
    let checker = Snapshot::latest(TxnId(10));
    parent_pk
        .insert(&checker, &store, row(1, vec![Value::Integer(100)]))
        .expect("insert parent");

    let child = [Value::Integer(7), Value::Null];
    assert!(!parent_pk.exists_parent(&checker, &store, &child, FK_MAP).expect("probe"));
}

#[test]
fn test_composite_key_prefix() {
    let parent = int_index("uq_parent", Uniqueness::Unique, &[0, 1]);
    let store = IndexStore::new();
    let checker = Snapshot::latest(TxnId(10));
    parent
        .insert(&checker, &store, row(1, vec![Value::Integer(1), Value::Integer(2)]))
        .expect("insert parent");

    // Child (a, b, c) references (c, a).
    let child = [Value::Integer(2), Value::Null, Value::Integer(1)];
    assert!(parent.exists_parent(&checker, &store, &child, &[2, 0]).expect("probe"));
    assert!(!parent.exists_parent(&checker, &store, &child, &[0, 2]).expect("probe"));
}

#[test]
#[should_panic(expected = "column map")]
fn test_oversized_column_map_panics() {
    let parent_pk = int_index("pk_parent", Uniqueness::PrimaryKey, &[0]);
    let store = IndexStore::new();
    let checker = Snapshot::latest(TxnId(10));
    let child = [Value::Integer(1), Value::Integer(2)];
    let _ = parent_pk.exists_parent(&checker, &store, &child, &[0, 1]);
}
