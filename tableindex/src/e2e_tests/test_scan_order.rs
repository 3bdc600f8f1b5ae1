//! Forward, reverse and distinct scans over the same entries.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::testing::{int_index, row, session};
use crate::types::{RowId, Value};
use crate::{IndexStore, RangeBound, RangeCondition, TableIndex, Uniqueness};

fn filled(seed: u64, count: u64) -> (TableIndex, IndexStore) {
    let index = int_index("ix", Uniqueness::NonUnique, &[0, 1]);
    let store = IndexStore::new();
    let writer = session(5);
    let mut rng = StdRng::seed_from_u64(seed);
    for id in 0..count {
        let a = if rng.random_range(0..10) == 0 {
            Value::Null
        } else {
            Value::Integer(rng.random_range(0..20))
        };
        let b = Value::Integer(rng.random_range(0..5));
        index.insert(&writer, &store, row(id, vec![a, b])).expect("insert");
    }
    (index, store)
}

fn ids(cursor: crate::RowCursor<'_>) -> Vec<RowId> {
    cursor.collect_rows().expect("scan").iter().map(|r| r.id()).collect()
}

#[test]
fn test_reverse_scan_is_exact_reverse() {
    let (index, store) = filled(11, 300);
    let reader = session(5);

    let forward = ids(index.first_row(&reader, &store, &[], 0));
    let mut reverse = ids(index.last_row(&reader, &store, &[], 0));
    reverse.reverse();

    assert_eq!(forward.len(), 300);
    assert_eq!(forward, reverse);
}

#[test]
fn test_forward_scan_is_sorted() {
    let (index, store) = filled(12, 200);
    let reader = session(5);
    let rows = index.first_row(&reader, &store, &[], 0).collect_rows().expect("scan");
    assert!(rows.windows(2).all(|w| {
        index.comparator().compare_entries(&w[0], &w[1]) == std::cmp::Ordering::Less
    }));
}

#[test]
fn test_distinct_scan_yields_one_row_per_group() {
    let (index, store) = filled(13, 300);
    let reader = session(5);

    let all = index.first_row(&reader, &store, &[], 0).collect_rows().expect("scan");
    let mut expected: Vec<Value> = all.iter().map(|r| r.value(0).clone()).collect();
    expected.dedup();

    let distinct = index.first_row(&reader, &store, &[], 1).collect_rows().expect("scan");
    let firsts: Vec<Value> = distinct.iter().map(|r| r.value(0).clone()).collect();
    assert_eq!(firsts, expected);

    // Each representative is the first entry of its group.
    for representative in &distinct {
        let first_of_group = all
            .iter()
            .find(|r| r.value(0) == representative.value(0))
            .expect("group present");
        assert_eq!(first_of_group.id(), representative.id());
    }
}

#[test]
fn test_reverse_distinct_scan() {
    let (index, store) = filled(14, 100);
    let reader = session(5);
    let forward: Vec<Value> = index
        .first_row(&reader, &store, &[], 1)
        .collect_rows()
        .expect("scan")
        .iter()
        .map(|r| r.value(0).clone())
        .collect();
    let mut reverse: Vec<Value> = index
        .last_row(&reader, &store, &[], 1)
        .collect_rows()
        .expect("scan")
        .iter()
        .map(|r| r.value(0).clone())
        .collect();
    reverse.reverse();
    assert_eq!(forward, reverse);
}

#[test]
fn test_range_conditions() {
    let (index, store) = filled(15, 300);
    let reader = session(5);
    let conditions = [
        RangeCondition::unbounded()
            .with_lower(RangeBound::exclusive(4_i64))
            .with_upper(RangeBound::inclusive(8_i64)),
        RangeCondition::equal(2_i64),
    ];

    let rows = index.first_row(&reader, &store, &conditions, 0).collect_rows().expect("scan");
    let expected: Vec<RowId> = index
        .first_row_unbounded(&store)
        .collect_rows()
        .expect("scan")
        .iter()
        .filter(|r| {
            matches!(r.value(0), Value::Integer(a) if *a > 4 && *a <= 8) && r.value(1) == &Value::Integer(2)
        })
        .map(|r| r.id())
        .collect();
    assert!(!expected.is_empty());
    assert_eq!(rows.iter().map(|r| r.id()).collect::<Vec<_>>(), expected);

    let mut reversed = ids(index.last_row(&reader, &store, &conditions, 0));
    reversed.reverse();
    assert_eq!(reversed, expected);
}

#[test]
fn test_not_null_scan_skips_leading_nulls() {
    let (index, store) = filled(16, 200);
    let reader = session(5);
    let rows = index.find_first_row_not_null(&reader, &store).collect_rows().expect("scan");
    let non_null = index
        .first_row(&reader, &store, &[], 0)
        .collect_rows()
        .expect("scan")
        .iter()
        .filter(|r| !r.value(0).is_null())
        .count();
    assert_eq!(rows.len(), non_null);
    assert!(rows.iter().all(|r| !r.value(0).is_null()));
}

#[test]
fn test_cursor_survives_deletes_behind_it() {
    let (index, store) = filled(17, 50);
    let reader = session(5);
    let mut cursor = index.first_row(&reader, &store, &[], 0);

    let mut seen = Vec::new();
    while let Some(current) = cursor.next_row().expect("scan") {
        // Deleting the row just yielded must not disturb the rest of the scan.
        assert!(index.delete(&reader, &store, &current).expect("delete"));
        seen.push(current.id());
    }
    assert_eq!(seen.len(), 50);
    assert!(index.is_empty(&store).expect("empty"));
}
