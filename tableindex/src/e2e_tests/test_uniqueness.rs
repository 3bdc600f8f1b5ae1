//! Unique and non-unique indexes fed the same rows.

use crate::testing::{init_tracing, int_index, row, row_by, session};
use crate::types::{TxnId, Value};
use crate::{IndexError, IndexStore, Snapshot, Uniqueness};

fn rows() -> Vec<std::sync::Arc<crate::Row>> {
    vec![
        row(1, vec![Value::Integer(1), Value::from("a")]),
        row(2, vec![Value::Integer(2), Value::from("b")]),
        row(3, vec![Value::Integer(1), Value::from("c")]),
    ]
}

fn scan_keys(index: &crate::TableIndex, store: &IndexStore, reader: &Snapshot) -> Vec<(i64, u64)> {
    index
        .first_row(reader, store, &[], 0)
        .map(|r| {
            let r = r.expect("scan");
            match r.value(0) {
                Value::Integer(k) => (*k, r.id().get()),
                other => panic!("unexpected key {other}"),
            }
        })
        .collect()
}

#[test]
fn test_non_unique_keeps_duplicates_in_row_order() {
    init_tracing();
    let index = int_index("ix_col0", Uniqueness::NonUnique, &[0]);
    let store = IndexStore::new();
    let writer = session(5);

    for r in rows() {
        index.insert(&writer, &store, r).expect("insert");
    }

    assert_eq!(scan_keys(&index, &store, &writer), vec![(1, 1), (1, 3), (2, 2)]);
    assert_eq!(index.size(&writer, &store).expect("size"), 3);
    assert_eq!(index.size_unique(&store).expect("size unique"), 2);
}

#[test]
fn test_unique_rejects_third_row() {
    init_tracing();
    let index = int_index("uq_col0", Uniqueness::Unique, &[0]);
    let store = IndexStore::new();
    let writer = session(5);

    let mut results = rows().into_iter().map(|r| index.insert(&writer, &store, r));
    assert!(results.next().expect("first").is_ok());
    assert!(results.next().expect("second").is_ok());
    let error = results.next().expect("third").expect_err("duplicate key");

    let IndexError::UniqueViolation(violation) = error else {
        panic!("expected unique violation, got {error}");
    };
    assert_eq!(violation.index_name, "uq_col0");
    assert_eq!(violation.key, vec![Value::Integer(1)]);
    assert_eq!(violation.existing_row.get(), 1);

    assert_eq!(scan_keys(&index, &store, &writer), vec![(1, 1), (2, 2)]);
    assert_eq!(index.node_count(&store).expect("count"), 2);
}

#[test]
fn test_failed_insert_leaves_structure_unchanged() {
    let index = int_index("pk", Uniqueness::PrimaryKey, &[0]);
    let store = IndexStore::new();
    let writer = session(5);
    index.insert(&writer, &store, row(1, vec![Value::Integer(7)])).expect("insert");

    let before = store.modifications().expect("modifications");
    assert!(index.insert(&writer, &store, row(2, vec![Value::Integer(7)])).is_err());
    assert_eq!(store.modifications().expect("modifications"), before);
    assert!(index.check_index(&writer, &store).expect("check").is_ok());
}

#[test]
fn test_nulls_never_conflict() {
    let index = int_index("uq", Uniqueness::Unique, &[0, 1]);
    let store = IndexStore::new();
    let writer = session(5);

    for id in 1..=3 {
        index
            .insert(&writer, &store, row(id, vec![Value::Integer(1), Value::Null]))
            .expect("null keys are distinct");
    }
    assert_eq!(index.size(&writer, &store).expect("size"), 3);
}

#[test]
fn test_dead_rows_do_not_conflict() {
    let index = int_index("uq", Uniqueness::Unique, &[0]);
    let store = IndexStore::new();

    // Row 1 was deleted by committed txn 2; row 2 was written by aborted txn 3.
    let deleted = row(1, vec![Value::Integer(9)]);
    deleted.mark_deleted(TxnId(2));
    let rolled_back = row_by(2, vec![Value::Integer(9)], TxnId(3));
    let writer = Snapshot::latest(TxnId(10)).with_aborted([TxnId(3)]);

    index.insert(&writer, &store, deleted).expect("insert deleted");
    index.insert(&writer, &store, rolled_back).expect("insert rolled back");
    index
        .insert(&writer, &store, row(3, vec![Value::Integer(9)]))
        .expect("key is free");

    assert_eq!(index.size(&writer, &store).expect("size"), 1);
    assert!(index.check_index(&writer, &store).expect("check").is_ok());
}

#[test]
fn test_in_flight_insert_blocks_key() {
    let index = int_index("uq", Uniqueness::Unique, &[0]);
    let store = IndexStore::new();

    // Txn 20 inserted key 4 and has not committed; txn 21 tries the same key.
    let other = Snapshot::latest(TxnId(20));
    index
        .insert(&other, &store, row_by(1, vec![Value::Integer(4)], TxnId(20)))
        .expect("first writer");

    let me = Snapshot::latest(TxnId(21)).with_in_flight([TxnId(20)]);
    assert_eq!(index.size(&me, &store).expect("size"), 0);
    assert!(matches!(
        index.insert(&me, &store, row_by(2, vec![Value::Integer(4)], TxnId(21))),
        Err(IndexError::UniqueViolation(_))
    ));
}

#[test]
fn test_insert_then_delete_restores_size() {
    let index = int_index("ix", Uniqueness::NonUnique, &[0]);
    let store = IndexStore::new();
    let writer = session(5);
    let keep = row(1, vec![Value::Integer(1)]);
    index.insert(&writer, &store, keep).expect("insert");

    let before = index.size(&writer, &store).expect("size");
    let temporary = row(2, vec![Value::Integer(1)]);
    index.insert(&writer, &store, temporary.clone()).expect("insert");
    assert!(index.delete(&writer, &store, &temporary).expect("delete"));
    assert_eq!(index.size(&writer, &store).expect("size"), before);

    // A second delete of the same entry is a benign miss.
    assert!(!index.delete(&writer, &store, &temporary).expect("delete miss"));
}
