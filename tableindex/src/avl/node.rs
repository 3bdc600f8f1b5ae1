//! Arena slots and nodes of the AVL tree.

use std::fmt;
use std::sync::Arc;

use crate::row::Row;

/// Stable address of a node inside its tree's arena.
///
/// An id stays valid until its node is unlinked; the slot may then be reused
/// by a later insert. Holders of an id across a structural change must
/// revalidate it against [`AvlTree::modifications`](super::AvlTree::modifications).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl NodeId {
    /// # Panics
    ///
    /// Panics if the arena has outgrown `u32` slots.
    pub(crate) fn new(index: usize) -> Self {
        match u32::try_from(index) {
            Ok(index) => Self(index),
            Err(_) => panic!("arena slot {index} exceeds the node id range"),
        }
    }

    pub(crate) const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// One index entry: the row reference plus tree linkage.
#[derive(Debug)]
pub struct Node {
    /// Row this entry indexes. The key is read from the row on demand.
    pub row: Arc<Row>,
    pub left: Option<NodeId>,
    pub right: Option<NodeId>,
    pub parent: Option<NodeId>,
    /// Height of the subtree rooted here (a leaf has height 1).
    pub height: u8,
}

impl Node {
    pub(crate) const fn leaf(row: Arc<Row>, parent: Option<NodeId>) -> Self {
        Self {
            row,
            left: None,
            right: None,
            parent,
            height: 1,
        }
    }
}

/// Arena slot: a live node or a link in the free list.
#[derive(Debug)]
pub(crate) enum Slot {
    Occupied(Node),
    Free { next: Option<NodeId> },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_keeps_full_u32_range() {
        let last = NodeId::new(u32::MAX as usize);
        assert_eq!(last.index(), u32::MAX as usize);
    }

    #[test]
    #[should_panic(expected = "exceeds the node id range")]
    fn test_node_id_past_u32_panics() {
        let _ = NodeId::new(u32::MAX as usize + 1);
    }
}
