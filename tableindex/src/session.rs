//! Visibility capability handed to every index operation.
//!
//! The index is mechanism, not policy: it never decides on its own whether a
//! row exists for a caller. Every searching or mutating operation receives a
//! [`Session`] and asks it two questions about the rows it walks over:
//!
//! - [`Session::can_read`]: may this row be returned to the caller?
//! - [`Session::blocks_unique`]: does this row occupy its key for the purpose
//!   of a uniqueness check?
//!
//! The two differ for rows written by concurrent, still running
//! transactions: those are invisible to readers but still block an equal key.
//!
//! [`Snapshot`] is the snapshot-isolation implementation used by the engine's
//! own tests and by callers without a transaction manager of their own.

use std::collections::BTreeSet;

use crate::row::Row;
use crate::types::TxnId;

/// Row visibility rules of the calling session.
pub trait Session: Send + Sync {
    /// Returns true if `row` is visible to this session.
    fn can_read(&self, row: &Row) -> bool;

    /// Returns true if `row` holds its key against an insert by this session.
    ///
    /// Defaults to [`Session::can_read`].
    fn blocks_unique(&self, row: &Row) -> bool {
        self.can_read(row)
    }
}

/// A snapshot of transaction states taken when a statement starts.
///
/// A transaction counts as committed for this snapshot when its id is below
/// `horizon` and it is neither in flight nor aborted. Transactions at or above
/// the horizon started after the snapshot and are treated as in flight.
///
/// # Invariants
///
/// - The snapshot's own writes are always visible to it.
/// - A row deleted by a committed transaction (or by the snapshot's own
///   transaction) is never visible.
#[derive(Debug, Clone)]
pub struct Snapshot {
    txn_id: TxnId,
    horizon: TxnId,
    in_flight: BTreeSet<TxnId>,
    aborted: BTreeSet<TxnId>,
}

impl Snapshot {
    /// Create a snapshot for `txn_id` seeing every transaction below `horizon`.
    #[must_use]
    pub const fn new(txn_id: TxnId, horizon: TxnId) -> Self {
        Self {
            txn_id,
            horizon,
            in_flight: BTreeSet::new(),
            aborted: BTreeSet::new(),
        }
    }

    /// Snapshot of a transaction that sees everything committed before it.
    #[must_use]
    pub const fn latest(txn_id: TxnId) -> Self {
        Self::new(txn_id, txn_id)
    }

    /// Mark transactions as still running when the snapshot was taken.
    #[must_use]
    pub fn with_in_flight(mut self, txns: impl IntoIterator<Item = TxnId>) -> Self {
        self.in_flight.extend(txns);
        self
    }

    /// Mark transactions as rolled back.
    #[must_use]
    pub fn with_aborted(mut self, txns: impl IntoIterator<Item = TxnId>) -> Self {
        self.aborted.extend(txns);
        self
    }

    /// Get the snapshot's own transaction.
    #[must_use]
    pub const fn txn_id(&self) -> TxnId {
        self.txn_id
    }

    fn is_committed(&self, txn: TxnId) -> bool {
        txn < self.horizon && !self.in_flight.contains(&txn) && !self.aborted.contains(&txn)
    }

    fn is_settled(&self, txn: TxnId) -> bool {
        txn == self.txn_id || self.is_committed(txn)
    }

    fn deletion_settled(&self, row: &Row) -> bool {
        row.deleted_txn().is_some_and(|txn| self.is_settled(txn))
    }
}

impl Session for Snapshot {
    fn can_read(&self, row: &Row) -> bool {
        self.is_settled(row.created_txn()) && !self.deletion_settled(row)
    }

    fn blocks_unique(&self, row: &Row) -> bool {
        !self.aborted.contains(&row.created_txn()) && !self.deletion_settled(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{RowId, Value};

    fn row(created: u64) -> Row {
        Row::new(RowId(1), vec![Value::Integer(1)], TxnId(created))
    }

    #[test]
    fn test_committed_rows_are_visible() {
        let snapshot = Snapshot::latest(TxnId(10));
        assert!(snapshot.can_read(&row(3)));
        assert!(snapshot.blocks_unique(&row(3)));
    }

    #[test]
    fn test_own_writes_are_visible() {
        let snapshot = Snapshot::latest(TxnId(10));
        assert!(snapshot.can_read(&row(10)));
    }

    #[test]
    fn test_in_flight_rows_block_but_are_invisible() {
        let snapshot = Snapshot::latest(TxnId(10)).with_in_flight([TxnId(7)]);
        let r = row(7);
        assert!(!snapshot.can_read(&r));
        assert!(snapshot.blocks_unique(&r));
    }

    #[test]
    fn test_future_transactions_are_invisible() {
        let snapshot = Snapshot::latest(TxnId(10));
        assert!(!snapshot.can_read(&row(12)));
        assert!(snapshot.blocks_unique(&row(12)));
    }

    #[test]
    fn test_aborted_rows_neither_read_nor_block() {
        let snapshot = Snapshot::latest(TxnId(10)).with_aborted([TxnId(5)]);
        let r = row(5);
        assert!(!snapshot.can_read(&r));
        assert!(!snapshot.blocks_unique(&r));
    }

    #[test]
    fn test_deleted_rows() {
        let snapshot = Snapshot::latest(TxnId(10)).with_in_flight([TxnId(8)]);

        let committed_delete = row(2);
        committed_delete.mark_deleted(TxnId(4));
        assert!(!snapshot.can_read(&committed_delete));
        assert!(!snapshot.blocks_unique(&committed_delete));

        let pending_delete = row(2);
        pending_delete.mark_deleted(TxnId(8));
        assert!(snapshot.can_read(&pending_delete));
        assert!(snapshot.blocks_unique(&pending_delete));

        let own_delete = row(2);
        own_delete.mark_deleted(TxnId(10));
        assert!(!snapshot.can_read(&own_delete));
    }
}
