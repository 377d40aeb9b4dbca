//! B-tree primary-key index over buffer-pool pages.

use crate::btree::node::{BTreeNode, NodeType};
use crate::buffer::BufferPool;
use loam_common::{LoamError, PageId, Result, Rid};
use std::sync::Arc;

/// Key used as the first entry of a freshly grown internal root, so that
/// every probe key has a separator at or below it.
pub const MIN_KEY_SENTINEL: i64 = i64::MIN;

/// Disk-resident B-tree mapping `i64` keys to RIDs.
///
/// Nodes are pages; leaf splits promote their separator into the parent,
/// and a root split grows the tree by one level. Internal-node splits are
/// out of scope: once the root's child table overflows, inserts fail with
/// `SplitUnsupported`.
pub struct BTreeIndex {
    /// Buffer pool all node access goes through.
    pool: Arc<BufferPool>,
    /// Current root page.
    root_page_id: PageId,
}

enum Descent {
    Leaf(Option<Rid>),
    Child(PageId),
}

impl BTreeIndex {
    /// Creates a new index or adopts an existing root.
    ///
    /// Pass `PageId::INVALID` to allocate a fresh leaf root.
    pub fn new(pool: Arc<BufferPool>, root_page_id: PageId) -> Result<Self> {
        if root_page_id != PageId::INVALID {
            return Ok(Self {
                pool,
                root_page_id,
            });
        }

        let page = pool.new_page()?;
        let id = page.id();
        {
            let mut data = page.data_mut();
            let mut node = BTreeNode::new(&mut data);
            node.init(NodeType::Leaf);
        }
        pool.unpin_page(id, true);

        Ok(Self {
            pool,
            root_page_id: id,
        })
    }

    /// Returns the current root page id.
    pub fn root_page_id(&self) -> PageId {
        self.root_page_id
    }

    /// Picks the child to descend into: the one with the greatest
    /// separator <= key, falling back to child 0. The fallback is only
    /// reachable if the sentinel convention is violated.
    fn descend_child(node: &BTreeNode<'_>, key: i64) -> PageId {
        let num = node.num_keys() as usize;
        if num == 0 {
            return PageId::INVALID;
        }
        for i in (0..num).rev() {
            if key >= node.key(i) {
                return node.child(i);
            }
        }
        node.child(0)
    }

    /// Looks up the RID for a key.
    ///
    /// Each step unpins the current node before following the child
    /// pointer; misses surface as `KeyNotFound`.
    pub fn search(&self, key: i64) -> Result<Rid> {
        let mut curr = self.root_page_id;

        loop {
            let page = self.pool.fetch_page(curr)?;
            let step = {
                let mut data = page.data_mut();
                let node = BTreeNode::new(&mut data);
                if node.is_leaf() {
                    let num = node.num_keys() as usize;
                    let mut found = None;
                    for i in 0..num {
                        if node.key(i) == key {
                            found = Some(node.rid(i));
                            break;
                        }
                    }
                    Descent::Leaf(found)
                } else {
                    Descent::Child(Self::descend_child(&node, key))
                }
            };
            self.pool.unpin_page(curr, false);

            match step {
                Descent::Leaf(Some(rid)) => return Ok(rid),
                Descent::Leaf(None) => return Err(LoamError::KeyNotFound(key)),
                Descent::Child(child) if child.is_valid() => curr = child,
                Descent::Child(_) => {
                    return Err(LoamError::Corrupted(format!(
                        "empty internal node at page {curr}"
                    )));
                }
            }
        }
    }

    /// Inserts a `(key, RID)` pair.
    ///
    /// Descends to the covering leaf recording the page-id path, splits
    /// the leaf on overflow, and promotes the separator upward.
    pub fn insert(&mut self, key: i64, rid: Rid) -> Result<()> {
        let mut path: Vec<PageId> = Vec::new();
        let mut curr = self.root_page_id;

        // Traverse to the leaf, keeping only the leaf pinned at the end.
        let leaf_page = loop {
            path.push(curr);
            let page = self.pool.fetch_page(curr)?;
            let next = {
                let mut data = page.data_mut();
                let node = BTreeNode::new(&mut data);
                if node.is_leaf() {
                    None
                } else {
                    Some(Self::descend_child(&node, key))
                }
            };
            match next {
                None => break page,
                Some(child) => {
                    self.pool.unpin_page(curr, false);
                    if !child.is_valid() {
                        return Err(LoamError::Corrupted(format!(
                            "empty internal node at page {curr}"
                        )));
                    }
                    curr = child;
                }
            }
        };
        let leaf_id = curr;

        let inserted = {
            let mut data = leaf_page.data_mut();
            let mut node = BTreeNode::new(&mut data);
            node.insert_leaf(key, rid)
        };
        if inserted {
            self.pool.unpin_page(leaf_id, true);
            return Ok(());
        }

        // Leaf overflow: split, place the pending pair, promote.
        let new_page = match self.pool.new_page() {
            Ok(p) => p,
            Err(e) => {
                self.pool.unpin_page(leaf_id, false);
                return Err(e);
            }
        };
        let new_id = new_page.id();

        let separator = {
            let mut leaf_data = leaf_page.data_mut();
            let mut new_data = new_page.data_mut();
            let mut leaf = BTreeNode::new(&mut leaf_data);
            let mut recipient = BTreeNode::new(&mut new_data);

            let separator = leaf.split_leaf(&mut recipient, new_id);
            if key >= separator {
                recipient.insert_leaf(key, rid);
            } else {
                leaf.insert_leaf(key, rid);
            }
            separator
        };

        self.pool.unpin_page(leaf_id, true);
        self.pool.unpin_page(new_id, true);

        self.insert_into_parent(&path, separator, new_id)
    }

    /// Promotes a separator into the parent of the split node.
    ///
    /// When the split node was the root, a new internal root is allocated
    /// with the sentinel entry for the old root and the separator for the
    /// new sibling. Parent overflow fails with `SplitUnsupported`.
    fn insert_into_parent(&mut self, path: &[PageId], key: i64, child_id: PageId) -> Result<()> {
        if path.len() == 1 {
            let old_root_id = path[0];

            let root_page = self.pool.new_page()?;
            let root_id = root_page.id();
            {
                let mut data = root_page.data_mut();
                let mut node = BTreeNode::new(&mut data);
                node.init(NodeType::Internal);
                node.insert_internal(MIN_KEY_SENTINEL, old_root_id);
                node.insert_internal(key, child_id);
            }
            self.root_page_id = root_id;
            self.pool.unpin_page(root_id, true);
            return Ok(());
        }

        let parent_id = path[path.len() - 2];
        let page = self.pool.fetch_page(parent_id)?;
        let inserted = {
            let mut data = page.data_mut();
            let mut node = BTreeNode::new(&mut data);
            node.insert_internal(key, child_id)
        };

        if inserted {
            self.pool.unpin_page(parent_id, true);
            Ok(())
        } else {
            self.pool.unpin_page(parent_id, false);
            Err(LoamError::SplitUnsupported)
        }
    }
}
