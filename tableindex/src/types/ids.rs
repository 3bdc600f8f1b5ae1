//! Identifier newtypes.
//!
//! Rows, transactions and persisted index structures are all addressed by
//! plain `u64`s on the wire; wrapping them keeps the three from being mixed up
//! in signatures that take several at once.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable locator of a table row inside its storage partition.
///
/// Row ids also serve as the tie-break between entries with equal keys, so
/// equal-key entries keep a deterministic total order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct RowId(pub u64);

impl RowId {
    /// Get the raw locator.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "row#{}", self.0)
    }
}

impl From<u64> for RowId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Transaction identifier.
///
/// Identifiers are handed out in increasing order by the transaction manager.
/// Zero is never a valid transaction and is used as the "no transaction"
/// marker in row version stamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TxnId(pub u64);

impl TxnId {
    /// The "no transaction" marker.
    pub const NONE: Self = Self(0);

    /// Get the raw identifier.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TxnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "txn#{}", self.0)
    }
}

impl From<u64> for TxnId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Catalog identifier of an index, stable across restarts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct PersistenceId(pub u64);

impl fmt::Display for PersistenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(RowId(7).to_string(), "row#7");
        assert_eq!(TxnId(3).to_string(), "txn#3");
        assert_eq!(PersistenceId(42).to_string(), "42");
    }

    #[test]
    fn test_row_id_order() {
        assert!(RowId(1) < RowId(2));
        assert_eq!(RowId::from(5).get(), 5);
        assert_eq!(TxnId::NONE.get(), 0);
    }
}
