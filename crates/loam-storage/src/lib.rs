//! Storage core for LoamDB.
//!
//! This crate provides:
//! - Disk manager for page allocation and positional I/O on one file
//! - Buffer pool with pin counting and write-back eviction
//! - Slotted pages and the linked-list table heap
//! - B-tree primary-key index whose nodes are pages

pub mod btree;
pub mod buffer;
pub mod disk;
pub mod heap;

pub use btree::{BTreeIndex, BTreeNode, NodeType, MIN_KEY_SENTINEL};
pub use buffer::BufferPool;
pub use disk::DiskManager;
pub use heap::{SlottedPage, TableHeap, TableIter};
