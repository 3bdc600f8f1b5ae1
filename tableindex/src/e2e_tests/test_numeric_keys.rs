//! Double columns holding a mix of integer and floating point keys.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::testing::{row, session};
use crate::types::{PersistenceId, SqlType, Value};
use crate::{IndexCheck, IndexColumn, IndexDescriptor, IndexRole, IndexStore, TableIndex, Uniqueness};

fn double_index() -> TableIndex {
    let descriptor = IndexDescriptor::new("ix_amount", PersistenceId(4), Uniqueness::NonUnique, IndexRole::User, 0)
        .with_column(IndexColumn::new(0, SqlType::Double));
    TableIndex::new(descriptor)
}

#[test]
#[allow(clippy::cast_precision_loss)]
fn test_keys_near_f64_precision_limit_are_found() {
    let index = double_index();
    let store = IndexStore::new();
    let writer = session(5);
    let mut rng = StdRng::seed_from_u64(53);
    let base = 1_i64 << 53;

    let mut inserted = Vec::new();
    for id in 0..3000_u64 {
        let offset = rng.random_range(-40_i64..40);
        let key = if rng.random() {
            Value::Integer(base + offset)
        } else {
            Value::Double((base + offset) as f64)
        };
        let entry = row(id, vec![key]);
        index.insert(&writer, &store, entry.clone()).expect("insert");
        inserted.push(entry);
    }

    assert_eq!(index.check_index(&writer, &store).expect("check"), IndexCheck::Ok);
    for entry in &inserted {
        let found = index
            .find_first_row_for_table_row(&writer, &store, entry.data())
            .collect_rows()
            .expect("scan");
        assert!(
            found.iter().any(|r| r.id() == entry.id()),
            "row {} not found by its own key {:?}",
            entry.id(),
            entry.data()
        );
    }
}

#[test]
fn test_integer_sorts_between_neighbouring_doubles() {
    let index = double_index();
    let store = IndexStore::new();
    let writer = session(5);
    let base = 1_i64 << 53;
    #[allow(clippy::cast_precision_loss)]
    let keys = [
        Value::Double((base + 2) as f64),
        Value::Integer(base + 1),
        Value::Double(base as f64),
        Value::Integer(base - 1),
    ];
    for (id, key) in (1_u64..).zip(keys) {
        index.insert(&writer, &store, row(id, vec![key])).expect("insert");
    }
    let ids: Vec<u64> = index
        .first_row(&writer, &store, &[], 0)
        .collect_rows()
        .expect("scan")
        .iter()
        .map(|r| r.id().get())
        .collect();
    assert_eq!(ids, vec![4, 3, 2, 1]);
}
