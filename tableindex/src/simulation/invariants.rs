//! Invariant checks of an index against the model of its live rows.

use std::cmp::Ordering;
use std::sync::Arc;

use crate::comparator::KeyComparator;
use crate::condition::CompareOp;
use crate::row::Row;
use crate::types::{RowId, Value};

/// A detected disagreement between the index and the model.
#[derive(Debug, Clone)]
pub struct InvariantViolation {
    /// Description of the violation.
    pub description: String,
    /// Operation index where it was detected.
    pub operation_index: usize,
    /// Additional context.
    pub context: String,
}

/// Collects violations and computes the model's expected answers.
#[derive(Debug, Default)]
pub struct InvariantChecker {
    violations: Vec<InvariantViolation>,
}

impl InvariantChecker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all violations recorded so far.
    #[must_use]
    pub fn violations(&self) -> &[InvariantViolation] {
        &self.violations
    }

    pub fn add_violation(&mut self, description: impl Into<String>, operation_index: usize, context: String) {
        self.violations.push(InvariantViolation {
            description: description.into(),
            operation_index,
            context,
        });
    }

    /// Compare two row id sequences.
    pub fn check_rows(&mut self, what: &str, expected: &[RowId], actual: &[RowId], operation_index: usize) {
        if expected != actual {
            self.add_violation(
                format!("{what} returned the wrong rows"),
                operation_index,
                format!("expected {expected:?}, got {actual:?}"),
            );
        }
    }

    /// Compare two values.
    pub fn check_equal<T: PartialEq + std::fmt::Debug>(&mut self, what: &str, expected: &T, actual: &T, operation_index: usize) {
        if expected != actual {
            self.add_violation(
                format!("{what} mismatch"),
                operation_index,
                format!("expected {expected:?}, got {actual:?}"),
            );
        }
    }
}

/// Live rows sorted in entry order.
#[must_use]
pub fn sorted(comparator: &KeyComparator, rows: &[Arc<Row>]) -> Vec<Arc<Row>> {
    let mut sorted = rows.to_vec();
    sorted.sort_by(|a, b| comparator.compare_entries(a, b));
    sorted
}

/// Expected answer of a full scan.
#[must_use]
pub fn expected_scan(comparator: &KeyComparator, rows: &[Arc<Row>], reversed: bool, distinct_count: usize) -> Vec<RowId> {
    let mut rows = sorted(comparator, rows);
    if reversed {
        rows.reverse();
    }
    if distinct_count > 0 {
        rows.dedup_by(|later, earlier| comparator.compare_prefix(later.data(), earlier.data(), distinct_count).is_eq());
    }
    rows.iter().map(|r| r.id()).collect()
}

/// Expected answer of an un-grouped `find_first_row` probe, written as a
/// plain predicate over each row.
#[must_use]
pub fn expected_probe(
    comparator: &KeyComparator,
    rows: &[Arc<Row>],
    key: &[Value],
    match_count: usize,
    op: CompareOp,
    reversed: bool,
) -> Vec<RowId> {
    let matches = |row: &Arc<Row>| {
        let data = row.data();
        let last = match_count - 1;
        let prefix_equal = (0..last).all(|i| {
            let value = comparator.key_value(data, i);
            match op {
                CompareOp::NotDistinct => comparator.compare_column(i, value, &key[i]).is_eq(),
                _ => !value.is_null() && !key[i].is_null() && comparator.compare_column(i, value, &key[i]).is_eq(),
            }
        });
        if !prefix_equal {
            return false;
        }
        let value = comparator.key_value(data, last);
        if op != CompareOp::NotDistinct && (value.is_null() || key[last].is_null()) {
            return false;
        }
        let ordering = comparator.compare_column(last, value, &key[last]);
        match op {
            CompareOp::Equal | CompareOp::NotDistinct => ordering == Ordering::Equal,
            CompareOp::Greater => ordering == Ordering::Greater,
            CompareOp::GreaterEqual => ordering != Ordering::Less,
            CompareOp::Smaller => ordering == Ordering::Less,
            CompareOp::SmallerEqual => ordering != Ordering::Greater,
        }
    };

    let mut ids: Vec<RowId> = sorted(comparator, rows).iter().filter(|r| matches(r)).map(|r| r.id()).collect();
    if reversed {
        ids.reverse();
    }
    ids
}

/// Live row holding an equal, null-free key, if any.
#[must_use]
pub fn conflicting(comparator: &KeyComparator, rows: &[Arc<Row>], data: &[Value]) -> Option<RowId> {
    if comparator.has_null(data, comparator.column_count()) {
        return None;
    }
    rows.iter()
        .find(|r| comparator.compare_row(r.data(), data).is_eq())
        .map(|r| r.id())
}
