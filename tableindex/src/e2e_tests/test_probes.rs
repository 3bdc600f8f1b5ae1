//! Probe variants of `find_first_row`.

use crate::testing::{int_index, row, session};
use crate::types::{Collation, PersistenceId, SqlType, TxnId, Value};
use crate::{
    CompareOp, CursorState, IndexColumn, IndexDescriptor, IndexRole, IndexStore, TableIndex, Uniqueness,
};

fn ids(cursor: crate::RowCursor<'_>) -> Vec<u64> {
    cursor.collect_rows().expect("scan").iter().map(|r| r.id().get()).collect()
}

/// (a, b) rows: ids 1..=6.
fn two_column_index() -> (TableIndex, IndexStore) {
    let index = int_index("ix_ab", Uniqueness::NonUnique, &[0, 1]);
    let store = IndexStore::new();
    let writer = session(5);
    let data: [(i64, Option<i64>); 6] = [(1, Some(1)), (1, Some(2)), (1, None), (2, Some(1)), (2, Some(2)), (3, Some(1))];
    for (id, (a, b)) in (1_u64..).zip(data) {
        index
            .insert(&writer, &store, row(id, vec![Value::Integer(a), b.into()]))
            .expect("insert");
    }
    (index, store)
}

#[test]
fn test_equality_on_prefix_returns_only_matches() {
    let (index, store) = two_column_index();
    let reader = session(5);
    let probe = [Value::Integer(1)];
    let cursor = index.find_first_row(&reader, &store, &probe, 1, 0, CompareOp::Equal, false);
    assert_eq!(ids(cursor), vec![3, 1, 2]);

    let cursor = index.find_first_row(&reader, &store, &probe, 1, 0, CompareOp::Equal, true);
    assert_eq!(ids(cursor), vec![2, 1, 3]);
}

#[test]
fn test_inequality_on_second_column() {
    let (index, store) = two_column_index();
    let reader = session(5);
    let probe = [Value::Integer(2), Value::Integer(1)];
    let cursor = index.find_first_row(&reader, &store, &probe, 2, 0, CompareOp::GreaterEqual, false);
    assert_eq!(ids(cursor), vec![4, 5]);

    let probe = [Value::Integer(1), Value::Integer(2)];
    let cursor = index.find_first_row(&reader, &store, &probe, 2, 0, CompareOp::Smaller, false);
    // The null in b is excluded from the range.
    assert_eq!(ids(cursor), vec![1]);
}

#[test]
fn test_null_probe() {
    let (index, store) = two_column_index();
    let reader = session(5);
    let probe = [Value::Integer(1), Value::Null];

    let mut cursor = index.find_first_row(&reader, &store, &probe, 2, 0, CompareOp::Equal, false);
    assert_eq!(cursor.state(), CursorState::Empty);
    assert!(cursor.next_row().expect("empty").is_none());

    let cursor = index.find_first_row(&reader, &store, &probe, 2, 0, CompareOp::NotDistinct, false);
    assert_eq!(ids(cursor), vec![3]);
}

#[test]
fn test_missing_key_opens_empty_cursor() {
    let (index, store) = two_column_index();
    let reader = session(5);

    let cursor = index.find_first_row(&reader, &store, &[Value::Integer(99)], 1, 0, CompareOp::Equal, false);
    assert_eq!(cursor.state(), CursorState::Empty);
    let cursor = index.find_first_row(&reader, &store, &[Value::Integer(3)], 1, 0, CompareOp::Greater, false);
    assert_eq!(cursor.state(), CursorState::Empty);

    let mut cursor = index.find_first_row(&reader, &store, &[Value::Integer(1)], 1, 0, CompareOp::Equal, false);
    assert_eq!(cursor.state(), CursorState::BeforeFirst);
    assert!(cursor.next_row().expect("scan").is_some());
    assert_eq!(cursor.state(), CursorState::Positioned);

    // Rows another transaction cannot see yet do not count as matches.
    let outsider = crate::Snapshot::new(TxnId(9), TxnId(1));
    assert_eq!(index.first_row(&outsider, &store, &[], 0).state(), CursorState::Empty);
    assert_eq!(index.last_row(&outsider, &store, &[], 0).state(), CursorState::Empty);
    assert_eq!(index.find_first_row_not_null(&outsider, &store).state(), CursorState::Empty);
}

#[test]
fn test_distinct_probe() {
    let (index, store) = two_column_index();
    let reader = session(5);
    let probe = [Value::Integer(2)];
    let cursor = index.find_first_row(&reader, &store, &probe, 1, 1, CompareOp::GreaterEqual, false);
    assert_eq!(ids(cursor), vec![4, 6]);
}

#[test]
fn test_table_row_probe() {
    let (index, store) = two_column_index();
    let reader = session(5);
    let cursor = index.find_first_row_for_table_row(&reader, &store, &[Value::Integer(1), Value::Null]);
    assert_eq!(ids(cursor), vec![3]);
    let cursor = index.find_first_row_for_table_row(&reader, &store, &[Value::Integer(2), Value::Integer(2)]);
    assert_eq!(ids(cursor), vec![5]);
}

#[test]
fn test_descending_text_index() {
    let descriptor = IndexDescriptor::new("ix_name", PersistenceId(3), Uniqueness::Unique, IndexRole::User, 0)
        .with_column(IndexColumn::new(0, SqlType::Text(Collation::CaseInsensitive)).descending());
    let index = TableIndex::new(descriptor);
    let store = IndexStore::new();
    let writer = session(5);

    for (id, name) in [(1, "alice"), (2, "Carol"), (3, "bob")] {
        index.insert(&writer, &store, row(id, vec![Value::from(name)])).expect("insert");
    }
    // Case-insensitive collation makes "BOB" a duplicate of "bob".
    assert!(index.insert(&writer, &store, row(4, vec![Value::from("BOB")])).is_err());

    assert_eq!(ids(index.first_row(&writer, &store, &[], 0)), vec![2, 3, 1]);

    // "Greater" follows index order: names after "bob" in a descending index.
    let probe = [Value::from("BOB")];
    let cursor = index.find_first_row(&writer, &store, &probe, 1, 0, CompareOp::Greater, false);
    assert_eq!(ids(cursor), vec![1]);
}

#[test]
fn test_keyless_index_orders_by_row_id() {
    let descriptor = IndexDescriptor::new("sys_idx", PersistenceId(9), Uniqueness::None, IndexRole::User, 0);
    let index = TableIndex::new(descriptor);
    let store = IndexStore::new();
    let writer = session(5);
    for id in [5, 2, 9, 1] {
        index.insert(&writer, &store, row(id, vec![Value::Integer(0)])).expect("insert");
    }
    assert_eq!(ids(index.first_row(&writer, &store, &[], 0)), vec![1, 2, 5, 9]);
    assert_eq!(ids(index.find_first_row_for_table_row(&writer, &store, &[Value::Null])), vec![1, 2, 5, 9]);
    assert_eq!(index.size_unique(&store).expect("size unique"), 4);
    assert_eq!(index.search_cost(&store).expect("cost").row_estimate, 4.0);
}

#[test]
fn test_empty_cursor_constructor() {
    let mut cursor = TableIndex::empty_cursor();
    assert_eq!(cursor.state(), CursorState::Empty);
    assert!(cursor.next().is_none());
}

#[test]
#[should_panic(expected = "match count")]
fn test_zero_match_count_panics() {
    let (index, store) = two_column_index();
    let reader = session(5);
    let _ = index.find_first_row(&reader, &store, &[], 0, 0, CompareOp::Equal, false);
}

#[test]
#[should_panic(expected = "distinct count")]
fn test_oversized_distinct_count_panics() {
    let (index, store) = two_column_index();
    let reader = session(5);
    let _ = index.first_row(&reader, &store, &[], 3);
}
