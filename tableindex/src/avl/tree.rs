//! Arena-backed AVL tree of index entries.
//!
//! Nodes live in a `Vec` of slots and refer to each other by [`NodeId`], so
//! the parent/child links never form reference cycles. Freed slots are chained
//! into a free list and reused by later inserts.
//!
//! The tree does not know how entries are ordered. Callers pass the ordering
//! as a closure to every operation that descends:
//!
//! - [`AvlTree::insert_by`] takes `cmp(existing) = new.cmp(existing)`.
//! - The seek operations take a `locate` closure that classifies an entry as
//!   before (`Less`), inside (`Equal`) or after (`Greater`) a contiguous
//!   region of the entry order.
//!
//! Every insert and remove bumps [`AvlTree::modifications`]. Removing a node
//! with two children moves its successor's row into it, so any `NodeId` held
//! across a modification must be revalidated.

use std::cmp::Ordering;
use std::sync::Arc;

use super::node::{Node, NodeId, Slot};
use crate::error::IndexCheck;
use crate::row::Row;

/// Balanced ordered tree of row references.
#[derive(Debug, Default)]
pub struct AvlTree {
    slots: Vec<Slot>,
    free_head: Option<NodeId>,
    root: Option<NodeId>,
    len: usize,
    modifications: u64,
}

impl AvlTree {
    /// Create an empty tree.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_head: None,
            root: None,
            len: 0,
            modifications: 0,
        }
    }

    /// Get the number of entries.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the tree holds no entries.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Get the structural modification counter.
    #[must_use]
    pub const fn modifications(&self) -> u64 {
        self.modifications
    }

    /// Get the root node.
    #[must_use]
    pub const fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Get a live node.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not address a live node.
    #[must_use]
    pub fn node(&self, id: NodeId) -> &Node {
        match &self.slots[id.index()] {
            Slot::Occupied(node) => node,
            Slot::Free { .. } => panic!("{id} is not a live node"),
        }
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Node {
        match &mut self.slots[id.index()] {
            Slot::Occupied(node) => node,
            Slot::Free { .. } => panic!("{id} is not a live node"),
        }
    }

    /// Get the row of a live node.
    #[must_use]
    pub fn row(&self, id: NodeId) -> &Arc<Row> {
        &self.node(id).row
    }

    /// Get the first entry in order.
    #[must_use]
    pub fn first(&self) -> Option<NodeId> {
        self.root.map(|root| self.leftmost(root))
    }

    /// Get the last entry in order.
    #[must_use]
    pub fn last(&self) -> Option<NodeId> {
        self.root.map(|root| self.rightmost(root))
    }

    /// Get the in-order successor of `id`.
    #[must_use]
    pub fn next(&self, id: NodeId) -> Option<NodeId> {
        if let Some(right) = self.node(id).right {
            return Some(self.leftmost(right));
        }
        let mut child = id;
        let mut parent = self.node(id).parent;
        while let Some(p) = parent {
            if self.node(p).left == Some(child) {
                return Some(p);
            }
            child = p;
            parent = self.node(p).parent;
        }
        None
    }

    /// Get the in-order predecessor of `id`.
    #[must_use]
    pub fn prev(&self, id: NodeId) -> Option<NodeId> {
        if let Some(left) = self.node(id).left {
            return Some(self.rightmost(left));
        }
        let mut child = id;
        let mut parent = self.node(id).parent;
        while let Some(p) = parent {
            if self.node(p).right == Some(child) {
                return Some(p);
            }
            child = p;
            parent = self.node(p).parent;
        }
        None
    }

    fn leftmost(&self, mut id: NodeId) -> NodeId {
        while let Some(left) = self.node(id).left {
            id = left;
        }
        id
    }

    fn rightmost(&self, mut id: NodeId) -> NodeId {
        while let Some(right) = self.node(id).right {
            id = right;
        }
        id
    }

    /// Leftmost entry that `locate` does not place before the region.
    pub fn first_at_or_after<F>(&self, mut locate: F) -> Option<NodeId>
    where
        F: FnMut(&Row) -> Ordering,
    {
        let mut best = None;
        let mut current = self.root;
        while let Some(id) = current {
            let node = self.node(id);
            if locate(&node.row) == Ordering::Less {
                current = node.right;
            } else {
                best = Some(id);
                current = node.left;
            }
        }
        best
    }

    /// Rightmost entry that `locate` does not place after the region.
    pub fn last_at_or_before<F>(&self, mut locate: F) -> Option<NodeId>
    where
        F: FnMut(&Row) -> Ordering,
    {
        let mut best = None;
        let mut current = self.root;
        while let Some(id) = current {
            let node = self.node(id);
            if locate(&node.row) == Ordering::Greater {
                current = node.left;
            } else {
                best = Some(id);
                current = node.right;
            }
        }
        best
    }

    /// Link a new entry at the position chosen by `cmp`.
    ///
    /// `cmp(existing)` must return the ordering of the new row relative to
    /// `existing`. Equal entries are placed after the existing ones.
    pub fn insert_by<F>(&mut self, row: Arc<Row>, mut cmp: F) -> NodeId
    where
        F: FnMut(&Row) -> Ordering,
    {
        let Some(mut current) = self.root else {
            let id = self.allocate(Node::leaf(row, None));
            self.root = Some(id);
            self.len += 1;
            self.modifications += 1;
            return id;
        };

        let (parent, go_left) = loop {
            let node = self.node(current);
            let go_left = cmp(&node.row) == Ordering::Less;
            let next = if go_left { node.left } else { node.right };
            match next {
                Some(child) => current = child,
                None => break (current, go_left),
            }
        };

        let id = self.allocate(Node::leaf(row, Some(parent)));
        if go_left {
            self.node_mut(parent).left = Some(id);
        } else {
            self.node_mut(parent).right = Some(id);
        }
        self.len += 1;
        self.modifications += 1;
        self.retrace(Some(parent));
        id
    }

    /// Unlink an entry and return its row.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not address a live node.
    pub fn remove(&mut self, id: NodeId) -> Arc<Row> {
        let target = match (self.node(id).left, self.node(id).right) {
            (Some(_), Some(right)) => {
                // Move the successor's row up and unlink the successor instead.
                let successor = self.leftmost(right);
                let successor_row = Arc::clone(&self.node(successor).row);
                let removed_row = std::mem::replace(&mut self.node_mut(id).row, successor_row);
                self.node_mut(successor).row = removed_row;
                successor
            }
            _ => id,
        };

        let (child, parent) = {
            let node = self.node(target);
            (node.left.or(node.right), node.parent)
        };
        if let Some(child) = child {
            self.node_mut(child).parent = parent;
        }
        self.replace_child(parent, target, child);

        let row = self.release(target);
        self.len -= 1;
        self.modifications += 1;
        self.retrace(parent);
        row
    }

    /// Height of the tree (0 when empty).
    #[must_use]
    pub fn height(&self) -> usize {
        usize::from(self.height_of(self.root))
    }

    /// Entries whose depth is at most `max_depth`, in key order.
    ///
    /// The root has depth 0, so at most `2^(max_depth + 1) - 1` entries are
    /// returned regardless of the tree size.
    #[must_use]
    pub fn sample(&self, max_depth: usize) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.sample_into(self.root, 0, max_depth, &mut out);
        out
    }

    fn sample_into(&self, id: Option<NodeId>, depth: usize, max_depth: usize, out: &mut Vec<NodeId>) {
        let Some(id) = id else {
            return;
        };
        let node = self.node(id);
        if depth < max_depth {
            self.sample_into(node.left, depth + 1, max_depth, out);
        }
        out.push(id);
        if depth < max_depth {
            self.sample_into(node.right, depth + 1, max_depth, out);
        }
    }

    /// Iterate all entries in order.
    #[must_use]
    pub fn ids(&self) -> Ids<'_> {
        Ids {
            tree: self,
            next: self.first(),
        }
    }

    /// Check parent links, stored heights, balance and the entry count.
    #[must_use]
    pub fn verify_structure(&self) -> IndexCheck {
        let Some(root) = self.root else {
            return if self.len == 0 { IndexCheck::Ok } else { IndexCheck::Count };
        };
        if !self.is_live(root) || self.node(root).parent.is_some() {
            return IndexCheck::Link;
        }

        let mut visited = 0usize;
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            visited += 1;
            if visited > self.len {
                return IndexCheck::Count;
            }

            let node = self.node(id);
            for child in [node.left, node.right].into_iter().flatten() {
                if !self.is_live(child) || self.node(child).parent != Some(id) {
                    return IndexCheck::Link;
                }
                stack.push(child);
            }

            let left = i16::from(self.height_of(node.left));
            let right = i16::from(self.height_of(node.right));
            if i16::from(node.height) != 1 + left.max(right) || (left - right).abs() > 1 {
                return IndexCheck::Balance;
            }
        }

        if visited == self.len {
            IndexCheck::Ok
        } else {
            IndexCheck::Count
        }
    }

    fn is_live(&self, id: NodeId) -> bool {
        matches!(self.slots.get(id.index()), Some(Slot::Occupied(_)))
    }

    fn allocate(&mut self, node: Node) -> NodeId {
        let Some(id) = self.free_head else {
            let id = NodeId::new(self.slots.len());
            self.slots.push(Slot::Occupied(node));
            return id;
        };
        self.free_head = match self.slots[id.index()] {
            Slot::Free { next } => next,
            Slot::Occupied(_) => panic!("free list points at live {id}"),
        };
        self.slots[id.index()] = Slot::Occupied(node);
        id
    }

    fn release(&mut self, id: NodeId) -> Arc<Row> {
        let next = self.free_head;
        let slot = std::mem::replace(&mut self.slots[id.index()], Slot::Free { next });
        self.free_head = Some(id);
        match slot {
            Slot::Occupied(node) => node.row,
            Slot::Free { .. } => panic!("{id} released twice"),
        }
    }

    fn replace_child(&mut self, parent: Option<NodeId>, old: NodeId, new: Option<NodeId>) {
        match parent {
            None => self.root = new,
            Some(p) => {
                let node = self.node_mut(p);
                if node.left == Some(old) {
                    node.left = new;
                } else {
                    node.right = new;
                }
            }
        }
    }

    fn height_of(&self, id: Option<NodeId>) -> u8 {
        id.map_or(0, |id| self.node(id).height)
    }

    fn balance_of(&self, id: NodeId) -> i16 {
        let node = self.node(id);
        i16::from(self.height_of(node.left)) - i16::from(self.height_of(node.right))
    }

    fn update_height(&mut self, id: NodeId) {
        let node = self.node(id);
        let height = 1 + self.height_of(node.left).max(self.height_of(node.right));
        self.node_mut(id).height = height;
    }

    fn rotate_left(&mut self, x: NodeId) -> NodeId {
        let Some(y) = self.node(x).right else {
            return x;
        };
        let inner = self.node(y).left;
        let parent = self.node(x).parent;

        self.node_mut(x).right = inner;
        if let Some(inner) = inner {
            self.node_mut(inner).parent = Some(x);
        }
        self.replace_child(parent, x, Some(y));
        self.node_mut(y).parent = parent;
        self.node_mut(y).left = Some(x);
        self.node_mut(x).parent = Some(y);

        self.update_height(x);
        self.update_height(y);
        y
    }

    fn rotate_right(&mut self, x: NodeId) -> NodeId {
        let Some(y) = self.node(x).left else {
            return x;
        };
        let inner = self.node(y).right;
        let parent = self.node(x).parent;

        self.node_mut(x).left = inner;
        if let Some(inner) = inner {
            self.node_mut(inner).parent = Some(x);
        }
        self.replace_child(parent, x, Some(y));
        self.node_mut(y).parent = parent;
        self.node_mut(y).right = Some(x);
        self.node_mut(x).parent = Some(y);

        self.update_height(x);
        self.update_height(y);
        y
    }

    /// Restore the AVL property at `id`, returning the subtree's new root.
    fn rebalance(&mut self, id: NodeId) -> NodeId {
        self.update_height(id);
        let balance = self.balance_of(id);
        if balance > 1 {
            if let Some(left) = self.node(id).left
                && self.balance_of(left) < 0
            {
                self.rotate_left(left);
            }
            return self.rotate_right(id);
        }
        if balance < -1 {
            if let Some(right) = self.node(id).right
                && self.balance_of(right) > 0
            {
                self.rotate_right(right);
            }
            return self.rotate_left(id);
        }
        id
    }

    /// Rebalance every node from `from` up to the root.
    fn retrace(&mut self, from: Option<NodeId>) {
        let mut current = from;
        while let Some(id) = current {
            let top = self.rebalance(id);
            current = self.node(top).parent;
        }
    }
}

/// In-order iterator over node ids.
pub struct Ids<'a> {
    tree: &'a AvlTree,
    next: Option<NodeId>,
}

impl Iterator for Ids<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.tree.next(current);
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::seq::SliceRandom;
    use rand::{Rng, SeedableRng};

    use super::*;
    use crate::types::{RowId, TxnId, Value};

    fn row(id: u64) -> Arc<Row> {
        Arc::new(Row::new(RowId(id), vec![Value::Integer(0)], TxnId(1)))
    }

    fn insert(tree: &mut AvlTree, id: u64) -> NodeId {
        tree.insert_by(row(id), |existing| RowId(id).cmp(&existing.id()))
    }

    fn find(tree: &AvlTree, id: u64) -> Option<NodeId> {
        tree.first_at_or_after(|r| r.id().cmp(&RowId(id)))
            .filter(|&n| tree.row(n).id() == RowId(id))
    }

    fn in_order(tree: &AvlTree) -> Vec<u64> {
        tree.ids().map(|n| tree.row(n).id().get()).collect()
    }

    #[test]
    fn test_empty_tree() {
        let tree = AvlTree::new();
        assert!(tree.is_empty());
        assert_eq!(tree.first(), None);
        assert_eq!(tree.last(), None);
        assert_eq!(tree.height(), 0);
        assert_eq!(tree.verify_structure(), IndexCheck::Ok);
        assert!(tree.sample(4).is_empty());
    }

    #[test]
    fn test_sequential_inserts_stay_balanced() {
        let mut tree = AvlTree::new();
        for i in 0..1000 {
            insert(&mut tree, i);
        }
        assert_eq!(tree.len(), 1000);
        assert_eq!(tree.verify_structure(), IndexCheck::Ok);
        // An AVL tree of 1000 nodes is at most ~1.44 * log2(1000) high.
        assert!(tree.height() <= 14, "height {}", tree.height());
        assert_eq!(in_order(&tree), (0..1000).collect::<Vec<_>>());
    }

    #[test]
    fn test_prev_walks_backwards() {
        let mut tree = AvlTree::new();
        for i in [5, 1, 9, 3, 7] {
            insert(&mut tree, i);
        }
        let mut seen = Vec::new();
        let mut current = tree.last();
        while let Some(id) = current {
            seen.push(tree.row(id).id().get());
            current = tree.prev(id);
        }
        assert_eq!(seen, vec![9, 7, 5, 3, 1]);
    }

    #[test]
    fn test_random_inserts_and_removes() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut tree = AvlTree::new();
        let mut keys: Vec<u64> = (0..500).collect();
        keys.shuffle(&mut rng);

        for &k in &keys {
            insert(&mut tree, k);
        }
        assert_eq!(tree.verify_structure(), IndexCheck::Ok);

        keys.shuffle(&mut rng);
        let (removed, kept) = keys.split_at(300);
        for &k in removed {
            let id = find(&tree, k).expect("key present");
            let row = tree.remove(id);
            assert_eq!(row.id(), RowId(k));
            assert_eq!(tree.verify_structure(), IndexCheck::Ok);
        }

        let mut expected = kept.to_vec();
        expected.sort_unstable();
        assert_eq!(in_order(&tree), expected);

        // Freed slots are reused.
        let slots_before = tree.slots.len();
        for _ in 0..100 {
            insert(&mut tree, rng.random_range(1000..2000));
        }
        assert_eq!(tree.slots.len(), slots_before);
        assert_eq!(tree.verify_structure(), IndexCheck::Ok);
    }

    #[test]
    fn test_seeks() {
        let mut tree = AvlTree::new();
        for i in (0..20).step_by(2) {
            insert(&mut tree, i);
        }
        let at_or_after = tree.first_at_or_after(|r| r.id().cmp(&RowId(7)));
        assert_eq!(at_or_after.map(|n| tree.row(n).id()), Some(RowId(8)));

        let at_or_before = tree.last_at_or_before(|r| r.id().cmp(&RowId(7)));
        assert_eq!(at_or_before.map(|n| tree.row(n).id()), Some(RowId(6)));

        assert_eq!(tree.first_at_or_after(|r| r.id().cmp(&RowId(100))), None);
        assert_eq!(tree.last_at_or_before(|r| r.id().cmp(&RowId(0))).map(|n| tree.row(n).id()), Some(RowId(0)));
    }

    #[test]
    fn test_sample_is_bounded_and_ordered() {
        let mut tree = AvlTree::new();
        for i in 0..10_000 {
            insert(&mut tree, i);
        }
        let sample = tree.sample(4);
        assert!(sample.len() <= 31);
        assert!(sample.len() >= 16);
        let ids: Vec<u64> = sample.iter().map(|&n| tree.row(n).id().get()).collect();
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_verify_detects_broken_links() {
        let mut tree = AvlTree::new();
        for i in 0..10 {
            insert(&mut tree, i);
        }
        let root = tree.root().expect("root");
        let left = tree.node(root).left.expect("left child");
        tree.node_mut(left).parent = None;
        assert_eq!(tree.verify_structure(), IndexCheck::Link);
    }

    #[test]
    fn test_verify_detects_bad_height() {
        let mut tree = AvlTree::new();
        for i in 0..10 {
            insert(&mut tree, i);
        }
        let root = tree.root().expect("root");
        tree.node_mut(root).height = 9;
        assert_eq!(tree.verify_structure(), IndexCheck::Balance);
    }
}
