//! Balanced ordered structure holding the entries of one index.

mod node;
mod tree;

pub use node::{Node, NodeId};
pub use tree::{AvlTree, Ids};
