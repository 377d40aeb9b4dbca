//! Disk-resident B-tree primary-key index.
//!
//! Nodes are pages viewed through [`BTreeNode`]; [`BTreeIndex`] drives
//! search and insert through the buffer pool. Leaf splits promote their
//! separator key upward; only a single root split is supported (internal
//! node splits fail with `SplitUnsupported`).

mod index;
mod node;

pub use index::{BTreeIndex, MIN_KEY_SENTINEL};
pub use node::{BTreeNode, NodeType, INTERNAL_PAIR_SIZE, LEAF_PAIR_SIZE, NODE_HEADER_SIZE};
