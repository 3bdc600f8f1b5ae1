//! Key comparison for one index.
//!
//! All orderings inside the index derive from [`KeyComparator`]. It compares
//! table rows on the index's key columns using each column's type handle, and
//! inverts descending columns. Entries with equal keys are ordered by row id
//! ([`KeyComparator::compare_entries`]), which makes the entry order total
//! for every uniqueness kind.
//!
//! # Contract
//!
//! Field counts and column maps come from the caller's plan. A field count
//! beyond the key width or a column map longer than the key is a caller bug
//! and panics.

use std::cmp::Ordering;

use crate::descriptor::{IndexColumn, IndexDescriptor};
use crate::row::Row;
use crate::types::Value;

/// Three-way comparator over an index's key columns.
#[derive(Debug, Clone)]
pub struct KeyComparator {
    columns: Vec<IndexColumn>,
}

impl KeyComparator {
    /// Build the comparator for a descriptor.
    #[must_use]
    pub fn new(descriptor: &IndexDescriptor) -> Self {
        Self {
            columns: descriptor.columns().to_vec(),
        }
    }

    /// Get the number of key columns.
    #[must_use]
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Compare two values of key column `position` in index order.
    #[must_use]
    pub fn compare_column(&self, position: usize, a: &Value, b: &Value) -> Ordering {
        let column = &self.columns[position];
        let ordering = column.sql_type.compare(a, b);
        if column.descending {
            ordering.reverse()
        } else {
            ordering
        }
    }

    /// Returns true if nulls of key column `position` sort before its values.
    #[must_use]
    pub fn nulls_lead(&self, position: usize) -> bool {
        !self.columns[position].descending
    }

    /// Get key column `position` of a full table row.
    #[must_use]
    pub fn key_value<'r>(&self, row: &'r [Value], position: usize) -> &'r Value {
        &row[self.columns[position].ordinal]
    }

    /// Extract the key of a full table row in index column order.
    #[must_use]
    pub fn key_of(&self, row: &[Value]) -> Vec<Value> {
        self.columns.iter().map(|c| row[c.ordinal].clone()).collect()
    }

    /// Returns true if any of the first `field_count` key columns is null.
    #[must_use]
    pub fn has_null(&self, row: &[Value], field_count: usize) -> bool {
        (0..field_count).any(|i| self.key_value(row, i).is_null())
    }

    /// Compare two full table rows on every key column.
    #[must_use]
    pub fn compare_row(&self, a: &[Value], b: &[Value]) -> Ordering {
        self.compare_prefix(a, b, self.columns.len())
    }

    /// Compare two full table rows on the first `field_count` key columns.
    ///
    /// # Panics
    ///
    /// Panics if `field_count` exceeds the number of key columns.
    #[must_use]
    pub fn compare_prefix(&self, a: &[Value], b: &[Value], field_count: usize) -> Ordering {
        self.check_field_count(field_count);
        (0..field_count)
            .map(|i| self.compare_column(i, self.key_value(a, i), self.key_value(b, i)))
            .find(|o| o.is_ne())
            .unwrap_or(Ordering::Equal)
    }

    /// Total entry order: key first, then row id.
    #[must_use]
    pub fn compare_entries(&self, a: &Row, b: &Row) -> Ordering {
        self.compare_row(a.data(), b.data())
            .then_with(|| a.id().cmp(&b.id()))
    }

    /// Compare a row of another table against a full row of this table.
    ///
    /// `row_col_map[i]` names the column of `a` matched against key column
    /// `i`. The map may cover all or only the leading key columns.
    #[must_use]
    pub fn compare_row_non_unique(&self, a: &[Value], b: &[Value], row_col_map: &[usize]) -> Ordering {
        self.compare_row_non_unique_fields(a, b, row_col_map, row_col_map.len())
    }

    /// As [`KeyComparator::compare_row_non_unique`], limited to the first
    /// `field_count` mapped columns.
    ///
    /// # Panics
    ///
    /// Panics if the map is longer than the key or `field_count` exceeds the
    /// map.
    #[must_use]
    pub fn compare_row_non_unique_fields(
        &self,
        a: &[Value],
        b: &[Value],
        row_col_map: &[usize],
        field_count: usize,
    ) -> Ordering {
        self.check_column_map(row_col_map);
        assert!(
            field_count <= row_col_map.len(),
            "field count {field_count} exceeds column map of {} columns",
            row_col_map.len()
        );
        (0..field_count)
            .map(|i| self.compare_column(i, &a[row_col_map[i]], self.key_value(b, i)))
            .find(|o| o.is_ne())
            .unwrap_or(Ordering::Equal)
    }

    /// Compare a tuple already in index column order against a full row of
    /// this table, on the first `field_count` key columns.
    ///
    /// # Panics
    ///
    /// Panics if `field_count` exceeds the key or the tuple.
    #[must_use]
    pub fn compare_key_non_unique(&self, key: &[Value], b: &[Value], field_count: usize) -> Ordering {
        self.check_field_count(field_count);
        assert!(
            field_count <= key.len(),
            "field count {field_count} exceeds probe of {} values",
            key.len()
        );
        (0..field_count)
            .map(|i| self.compare_column(i, &key[i], self.key_value(b, i)))
            .find(|o| o.is_ne())
            .unwrap_or(Ordering::Equal)
    }

    /// Position of the first key column at which two full rows differ.
    #[must_use]
    pub fn compare_row_for_change(&self, a: &[Value], b: &[Value]) -> Option<usize> {
        (0..self.columns.len())
            .find(|&i| self.compare_column(i, self.key_value(a, i), self.key_value(b, i)).is_ne())
    }

    fn check_field_count(&self, field_count: usize) {
        assert!(
            field_count <= self.columns.len(),
            "field count {field_count} exceeds index of {} columns",
            self.columns.len()
        );
    }

    fn check_column_map(&self, row_col_map: &[usize]) {
        assert!(
            row_col_map.len() <= self.columns.len(),
            "column map of {} columns exceeds index of {} columns",
            row_col_map.len(),
            self.columns.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{IndexRole, Uniqueness};
    use crate::types::{PersistenceId, RowId, SqlType, TxnId};

    /// Index on (col 1 asc, col 0 desc).
    fn comparator() -> KeyComparator {
        let d = IndexDescriptor::new("ix", PersistenceId(1), Uniqueness::NonUnique, IndexRole::User, 0)
            .with_column(IndexColumn::new(1, SqlType::Integer))
            .with_column(IndexColumn::new(0, SqlType::Integer).descending());
        KeyComparator::new(&d)
    }

    fn values(a: i64, b: i64) -> Vec<Value> {
        vec![Value::Integer(a), Value::Integer(b)]
    }

    #[test]
    fn test_compare_row_uses_mapped_columns() {
        let cmp = comparator();
        // Key of (5, 1) is (1, 5); key of (0, 2) is (2, 0).
        assert_eq!(cmp.compare_row(&values(5, 1), &values(0, 2)), Ordering::Less);
    }

    #[test]
    fn test_descending_column() {
        let cmp = comparator();
        assert_eq!(cmp.compare_row(&values(9, 1), &values(3, 1)), Ordering::Less);
        assert_eq!(cmp.compare_column(1, &Value::Null, &Value::Integer(0)), Ordering::Greater);
        assert!(cmp.nulls_lead(0));
        assert!(!cmp.nulls_lead(1));
    }

    #[test]
    fn test_prefix_and_field_counts() {
        let cmp = comparator();
        assert_eq!(cmp.compare_prefix(&values(9, 1), &values(3, 1), 1), Ordering::Equal);
        assert_eq!(
            cmp.compare_key_non_unique(&[Value::Integer(1)], &values(3, 1), 1),
            Ordering::Equal
        );
        assert_eq!(
            cmp.compare_key_non_unique(&[Value::Integer(0)], &values(3, 1), 1),
            Ordering::Less
        );
    }

    #[test]
    fn test_non_unique_with_column_map() {
        let cmp = comparator();
        // Other table row: (x, y, z) where z maps to key column 0.
        let other = vec![Value::Null, Value::Null, Value::Integer(1)];
        assert_eq!(cmp.compare_row_non_unique(&other, &values(3, 1), &[2]), Ordering::Equal);
        assert_eq!(
            cmp.compare_row_non_unique_fields(&other, &values(3, 2), &[2], 1),
            Ordering::Less
        );
        assert_eq!(cmp.compare_row_non_unique_fields(&other, &values(3, 2), &[2], 0), Ordering::Equal);
    }

    #[test]
    fn test_entries_tie_break_on_row_id() {
        let cmp = comparator();
        let a = Row::new(RowId(2), values(1, 1), TxnId(1));
        let b = Row::new(RowId(1), values(1, 1), TxnId(1));
        assert_eq!(cmp.compare_entries(&a, &b), Ordering::Greater);
        assert_eq!(cmp.compare_entries(&a, &a), Ordering::Equal);
    }

    #[test]
    fn test_compare_row_for_change() {
        let cmp = comparator();
        assert_eq!(cmp.compare_row_for_change(&values(1, 1), &values(1, 1)), None);
        assert_eq!(cmp.compare_row_for_change(&values(1, 1), &values(2, 1)), Some(1));
        assert_eq!(cmp.compare_row_for_change(&values(1, 1), &values(1, 2)), Some(0));
    }

    #[test]
    fn test_key_extraction() {
        let cmp = comparator();
        let row = vec![Value::Integer(4), Value::Null];
        assert_eq!(cmp.key_of(&row), vec![Value::Null, Value::Integer(4)]);
        assert!(cmp.has_null(&row, 1));
        assert!(!cmp.has_null(&row, 0));
    }

    #[test]
    #[should_panic(expected = "exceeds index")]
    fn test_field_count_out_of_range_panics() {
        let _ = comparator().compare_prefix(&values(1, 1), &values(1, 1), 3);
    }

    #[test]
    #[should_panic(expected = "column map")]
    fn test_oversized_column_map_panics() {
        let _ = comparator().compare_row_non_unique(&values(1, 1), &values(1, 1), &[0, 1, 0]);
    }
}
