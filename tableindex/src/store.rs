//! Storage partition holding one index's entries.
//!
//! The index core never owns entries. Each call is handed an [`IndexStore`],
//! which owns the tree behind a read/write lock: mutations are serialized per
//! store, reads share the lock. A table that materializes its rows per session
//! simply keeps one store per session.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::avl::AvlTree;
use crate::error::IndexError;

/// Where the store's nodes live, as far as cost estimation is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Residency {
    /// Entries are always in memory.
    #[default]
    Memory,
    /// Entries are paged in from disk through a cache.
    Disk,
}

/// Container of one index's ordered structure.
#[derive(Debug, Default)]
pub struct IndexStore {
    tree: RwLock<AvlTree>,
    residency: Residency,
}

impl IndexStore {
    /// Create an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store with the given residency.
    #[must_use]
    pub fn with_residency(residency: Residency) -> Self {
        Self {
            tree: RwLock::new(AvlTree::new()),
            residency,
        }
    }

    /// Get the store's residency.
    #[must_use]
    pub const fn residency(&self) -> Residency {
        self.residency
    }

    /// Get the number of entries, regardless of visibility.
    pub fn len(&self) -> Result<usize, IndexError> {
        Ok(self.read()?.len())
    }

    /// Get the structural modification counter.
    pub fn modifications(&self) -> Result<u64, IndexError> {
        Ok(self.read()?.modifications())
    }

    pub(crate) fn read(&self) -> Result<RwLockReadGuard<'_, AvlTree>, IndexError> {
        self.tree.read().map_err(|_| {
            tracing::warn!("index store read lock poisoned");
            IndexError::LockPoisoned
        })
    }

    pub(crate) fn write(&self) -> Result<RwLockWriteGuard<'_, AvlTree>, IndexError> {
        self.tree.write().map_err(|_| {
            tracing::warn!("index store write lock poisoned");
            IndexError::LockPoisoned
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn test_new_store_is_empty() {
        let store = IndexStore::new();
        assert_eq!(store.len().expect("len"), 0);
        assert_eq!(store.modifications().expect("modifications"), 0);
        assert_eq!(store.residency(), Residency::Memory);
        assert_eq!(IndexStore::with_residency(Residency::Disk).residency(), Residency::Disk);
    }

    #[test]
    fn test_poisoned_lock_is_reported() {
        let store = Arc::new(IndexStore::new());
        let poisoner = Arc::clone(&store);
        let result = std::thread::spawn(move || {
            let _guard = poisoner.tree.write().expect("lock");
            panic!("writer panics while holding the lock");
        })
        .join();
        assert!(result.is_err());

        assert_eq!(store.len(), Err(IndexError::LockPoisoned));
        assert!(matches!(store.write(), Err(IndexError::LockPoisoned)));
    }
}
