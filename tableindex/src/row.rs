//! Row references.
//!
//! A [`Row`] is what the index stores a reference to: the row's locator, its
//! column values and the version stamps a [`Session`](crate::Session) needs to
//! decide visibility. Rows are owned by the table's storage partition and
//! shared with every index on the table through `Arc`.
//!
//! Column values are immutable once the row exists (an SQL update produces a
//! new row version). Only the deletion stamp changes over the row's lifetime.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::types::{RowId, TxnId, Value};

/// A table row as seen by its indexes.
#[derive(Debug)]
pub struct Row {
    id: RowId,
    data: Vec<Value>,
    created_txn: TxnId,
    /// Transaction that deleted the row, 0 if none.
    deleted_txn: AtomicU64,
}

impl Row {
    /// Create a row version written by `created_txn`.
    #[must_use]
    pub const fn new(id: RowId, data: Vec<Value>, created_txn: TxnId) -> Self {
        Self {
            id,
            data,
            created_txn,
            deleted_txn: AtomicU64::new(0),
        }
    }

    /// Get the row locator.
    #[must_use]
    pub const fn id(&self) -> RowId {
        self.id
    }

    /// Get all column values in table column order.
    #[must_use]
    pub fn data(&self) -> &[Value] {
        &self.data
    }

    /// Get a single column value.
    ///
    /// # Panics
    ///
    /// Panics if `column` is outside the row.
    #[must_use]
    pub fn value(&self, column: usize) -> &Value {
        &self.data[column]
    }

    /// Get the transaction that created this row version.
    #[must_use]
    pub const fn created_txn(&self) -> TxnId {
        self.created_txn
    }

    /// Get the transaction that deleted this row version, if any.
    #[must_use]
    pub fn deleted_txn(&self) -> Option<TxnId> {
        match self.deleted_txn.load(Ordering::Acquire) {
            0 => None,
            txn => Some(TxnId(txn)),
        }
    }

    /// Stamp the row as deleted by `txn`.
    pub fn mark_deleted(&self, txn: TxnId) {
        self.deleted_txn.store(txn.get(), Ordering::Release);
    }

    /// Remove the deletion stamp (the deleting transaction rolled back).
    pub fn clear_deleted(&self) {
        self.deleted_txn.store(0, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deletion_stamp() {
        let row = Row::new(RowId(1), vec![Value::Integer(10)], TxnId(4));
        assert_eq!(row.deleted_txn(), None);

        row.mark_deleted(TxnId(9));
        assert_eq!(row.deleted_txn(), Some(TxnId(9)));

        row.clear_deleted();
        assert_eq!(row.deleted_txn(), None);
        assert_eq!(row.created_txn(), TxnId(4));
        assert_eq!(row.value(0), &Value::Integer(10));
    }
}
