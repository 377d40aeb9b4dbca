//! Table heap: a linked list of slotted pages holding unordered tuples.

use crate::buffer::BufferPool;
use crate::heap::page::SlottedPage;
use bytes::Bytes;
use loam_common::{LoamError, Page, PageId, Result, Rid};
use std::sync::Arc;

/// A singly linked list of slotted pages rooted at `first_page_id`.
///
/// Inserts append into the last non-full page, allocating and linking a
/// new page when the chain tail is full. Deletes tombstone; live tuples
/// never move, so RIDs stay valid for the lifetime of the file.
pub struct TableHeap {
    /// Buffer pool all page access goes through.
    pool: Arc<BufferPool>,
    /// Root of the page chain.
    first_page_id: PageId,
}

impl TableHeap {
    /// Creates a new heap or adopts an existing one.
    ///
    /// Pass `PageId::INVALID` to allocate a fresh first page with an
    /// invalid next pointer.
    pub fn new(pool: Arc<BufferPool>, first_page_id: PageId) -> Result<Self> {
        if first_page_id != PageId::INVALID {
            return Ok(Self {
                pool,
                first_page_id,
            });
        }

        let page = pool.new_page()?;
        let id = page.id();
        {
            let mut data = page.data_mut();
            let mut sp = SlottedPage::new(&mut data);
            sp.set_next_page_id(PageId::INVALID);
        }
        pool.unpin_page(id, true);

        Ok(Self {
            pool,
            first_page_id: id,
        })
    }

    /// Returns the id of the first page in the chain.
    pub fn first_page_id(&self) -> PageId {
        self.first_page_id
    }

    /// Inserts a tuple and returns its RID.
    ///
    /// Walks the chain from the first page; on `PageFull` advances to the
    /// next page, and at the tail allocates a new page and links it in.
    pub fn insert_tuple(&self, tuple: &[u8]) -> Result<Rid> {
        enum Attempt {
            Inserted(u32),
            Advance(PageId),
            GrowTail,
        }

        let mut curr = self.first_page_id;

        loop {
            let page = self.pool.fetch_page(curr)?;
            let attempt = {
                let mut data = page.data_mut();
                let mut sp = SlottedPage::new(&mut data);
                match sp.insert_tuple(tuple) {
                    Ok(slot) => Attempt::Inserted(slot),
                    Err(LoamError::PageFull) => {
                        let next = sp.next_page_id();
                        if next != PageId::INVALID {
                            Attempt::Advance(next)
                        } else {
                            Attempt::GrowTail
                        }
                    }
                    Err(e) => {
                        drop(data);
                        self.pool.unpin_page(curr, false);
                        return Err(e);
                    }
                }
            };

            match attempt {
                Attempt::Inserted(slot) => {
                    self.pool.unpin_page(curr, true);
                    return Ok(Rid::new(curr, slot));
                }
                Attempt::GrowTail => {
                    return self.insert_into_new_tail(curr, &page, tuple);
                }
                Attempt::Advance(next) => {
                    self.pool.unpin_page(curr, false);
                    curr = next;
                }
            }
        }
    }

    /// Allocates a new page, links it after `tail_id`, and inserts there.
    fn insert_into_new_tail(&self, tail_id: PageId, tail: &Page, tuple: &[u8]) -> Result<Rid> {
        let new_page = match self.pool.new_page() {
            Ok(p) => p,
            Err(e) => {
                self.pool.unpin_page(tail_id, false);
                return Err(e);
            }
        };
        let new_id = new_page.id();

        {
            let mut data = new_page.data_mut();
            let mut sp = SlottedPage::new(&mut data);
            sp.set_next_page_id(PageId::INVALID);
        }
        {
            let mut data = tail.data_mut();
            let mut sp = SlottedPage::new(&mut data);
            sp.set_next_page_id(new_id);
        }
        self.pool.unpin_page(tail_id, true);

        let inserted = {
            let mut data = new_page.data_mut();
            let mut sp = SlottedPage::new(&mut data);
            sp.insert_tuple(tuple)
        };
        match inserted {
            Ok(slot) => {
                self.pool.unpin_page(new_id, true);
                Ok(Rid::new(new_id, slot))
            }
            Err(e) => {
                self.pool.unpin_page(new_id, false);
                Err(e)
            }
        }
    }

    /// Returns an owned copy of the tuple at `rid`.
    ///
    /// Fails with `TupleNotFound` for a tombstoned or out-of-range slot.
    /// The copy lets the caller release the page pin immediately.
    pub fn get_tuple(&self, rid: Rid) -> Result<Bytes> {
        let page = self.pool.fetch_page(rid.page_id)?;
        let tuple = {
            let mut data = page.data_mut();
            let sp = SlottedPage::new(&mut data);
            sp.get_tuple(rid.slot_id).map(Bytes::copy_from_slice)
        };
        self.pool.unpin_page(rid.page_id, false);

        tuple.ok_or(LoamError::TupleNotFound { rid })
    }

    /// Tombstones the tuple at `rid`. Returns true if the slot existed.
    pub fn delete_tuple(&self, rid: Rid) -> Result<bool> {
        let page = self.pool.fetch_page(rid.page_id)?;
        let deleted = {
            let mut data = page.data_mut();
            let mut sp = SlottedPage::new(&mut data);
            sp.delete_tuple(rid.slot_id)
        };
        self.pool.unpin_page(rid.page_id, deleted);
        Ok(deleted)
    }

    /// Returns a one-shot iterator over all live tuples in page order then
    /// slot order. The iterator owns no pin between calls.
    pub fn iter(&self) -> TableIter<'_> {
        TableIter {
            heap: self,
            curr_page_id: self.first_page_id,
            curr_slot: 0,
        }
    }
}

/// Iterator over the live tuples of a table heap.
///
/// Skips tombstones and terminates when the chain's next pointer is
/// invalid. Each step fetches the current page, emits at most one tuple,
/// and unpins before returning.
pub struct TableIter<'a> {
    heap: &'a TableHeap,
    curr_page_id: PageId,
    curr_slot: u32,
}

enum Step {
    Emit(Bytes, Rid),
    Skip,
    NextPage(PageId),
}

impl Iterator for TableIter<'_> {
    type Item = Result<(Bytes, Rid)>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.curr_page_id == PageId::INVALID {
                return None;
            }

            let page = match self.heap.pool.fetch_page(self.curr_page_id) {
                Ok(p) => p,
                Err(e) => {
                    self.curr_page_id = PageId::INVALID;
                    return Some(Err(e));
                }
            };

            let step = {
                let mut data = page.data_mut();
                let sp = SlottedPage::new(&mut data);
                if self.curr_slot < sp.num_slots() as u32 {
                    let rid = Rid::new(self.curr_page_id, self.curr_slot);
                    match sp.get_tuple(self.curr_slot) {
                        Some(tuple) => Step::Emit(Bytes::copy_from_slice(tuple), rid),
                        None => Step::Skip,
                    }
                } else {
                    Step::NextPage(sp.next_page_id())
                }
            };
            self.heap.pool.unpin_page(self.curr_page_id, false);

            match step {
                Step::Emit(tuple, rid) => {
                    self.curr_slot += 1;
                    return Some(Ok((tuple, rid)));
                }
                Step::Skip => {
                    self.curr_slot += 1;
                }
                Step::NextPage(next) => {
                    self.curr_page_id = next;
                    self.curr_slot = 0;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disk::DiskManager;
    use tempfile::tempdir;

    fn create_test_heap(capacity: usize) -> (TableHeap, Arc<BufferPool>, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let disk = Arc::new(DiskManager::open(dir.path().join("test.db")).unwrap());
        let pool = Arc::new(BufferPool::new(capacity, disk));
        let heap = TableHeap::new(Arc::clone(&pool), PageId::INVALID).unwrap();
        (heap, pool, dir)
    }

    #[test]
    fn test_new_heap_allocates_first_page() {
        let (heap, pool, _dir) = create_test_heap(10);
        assert_eq!(heap.first_page_id(), PageId(0));
        // The first page is unpinned after creation.
        let page = pool.fetch_page(PageId(0)).unwrap();
        assert_eq!(page.pin_count(), 1);
        pool.unpin_page(PageId(0), false);
    }

    #[test]
    fn test_insert_get_roundtrip() {
        let (heap, _pool, _dir) = create_test_heap(10);

        let rid = heap.insert_tuple(b"hello heap").unwrap();
        assert_eq!(rid, Rid::new(PageId(0), 0));
        assert_eq!(heap.get_tuple(rid).unwrap(), Bytes::from_static(b"hello heap"));
    }

    #[test]
    fn test_get_missing_tuple() {
        let (heap, _pool, _dir) = create_test_heap(10);

        let rid = Rid::new(PageId(0), 5);
        let result = heap.get_tuple(rid);
        assert!(matches!(result, Err(LoamError::TupleNotFound { .. })));
    }

    #[test]
    fn test_delete_then_get() {
        let (heap, _pool, _dir) = create_test_heap(10);

        let rid = heap.insert_tuple(b"doomed").unwrap();
        assert!(heap.delete_tuple(rid).unwrap());
        assert!(matches!(
            heap.get_tuple(rid),
            Err(LoamError::TupleNotFound { .. })
        ));
        // Deleting again reports success: the slot still exists.
        assert!(heap.delete_tuple(rid).unwrap());
    }

    #[test]
    fn test_delete_out_of_range() {
        let (heap, _pool, _dir) = create_test_heap(10);
        assert!(!heap.delete_tuple(Rid::new(PageId(0), 9)).unwrap());
    }

    #[test]
    fn test_insert_spills_to_new_page() {
        let (heap, _pool, _dir) = create_test_heap(10);

        // ~1 KB tuples: three fit on a page, the fourth spills.
        let big = vec![0xAB; 1300];
        let mut rids = Vec::new();
        for _ in 0..4 {
            rids.push(heap.insert_tuple(&big).unwrap());
        }
        assert_eq!(rids[0].page_id, PageId(0));
        assert_ne!(rids[3].page_id, PageId(0));

        for rid in rids {
            assert_eq!(heap.get_tuple(rid).unwrap().len(), 1300);
        }
    }

    #[test]
    fn test_rids_stable_under_delete() {
        let (heap, _pool, _dir) = create_test_heap(10);

        let a = heap.insert_tuple(b"aa").unwrap();
        let b = heap.insert_tuple(b"bb").unwrap();
        heap.delete_tuple(a).unwrap();
        let c = heap.insert_tuple(b"cc").unwrap();

        // The deleted slot is not reused and b is untouched.
        assert_ne!(c.slot_id, a.slot_id);
        assert_eq!(heap.get_tuple(b).unwrap(), Bytes::from_static(b"bb"));
    }

    #[test]
    fn test_iterator_in_insert_order() {
        let (heap, _pool, _dir) = create_test_heap(10);

        for i in 0..10 {
            heap.insert_tuple(format!("row-{i}").as_bytes()).unwrap();
        }

        let rows: Vec<_> = heap.iter().collect::<Result<Vec<_>>>().unwrap();
        assert_eq!(rows.len(), 10);
        for (i, (tuple, _)) in rows.iter().enumerate() {
            assert_eq!(tuple.as_ref(), format!("row-{i}").as_bytes());
        }
    }

    #[test]
    fn test_iterator_skips_tombstones() {
        let (heap, _pool, _dir) = create_test_heap(10);

        let mut rids = Vec::new();
        for i in 0..6 {
            rids.push(heap.insert_tuple(format!("row-{i}").as_bytes()).unwrap());
        }
        heap.delete_tuple(rids[1]).unwrap();
        heap.delete_tuple(rids[4]).unwrap();

        let rows: Vec<_> = heap.iter().collect::<Result<Vec<_>>>().unwrap();
        assert_eq!(rows.len(), 4);
        let emitted: Vec<_> = rows.iter().map(|(_, rid)| *rid).collect();
        assert!(!emitted.contains(&rids[1]));
        assert!(!emitted.contains(&rids[4]));
    }

    #[test]
    fn test_iterator_holds_no_pin_between_calls() {
        let (heap, pool, _dir) = create_test_heap(10);
        heap.insert_tuple(b"one").unwrap();
        heap.insert_tuple(b"two").unwrap();

        let mut iter = heap.iter();
        iter.next().unwrap().unwrap();

        let page = pool.fetch_page(heap.first_page_id()).unwrap();
        assert_eq!(page.pin_count(), 1);
        pool.unpin_page(heap.first_page_id(), false);
    }

    #[test]
    fn test_iterator_with_small_pool() {
        // A pool of two frames still supports a multi-page scan because
        // the iterator never holds a pin across calls.
        let (heap, _pool, _dir) = create_test_heap(2);

        let big = vec![1u8; 1300];
        for _ in 0..9 {
            heap.insert_tuple(&big).unwrap();
        }

        let rows: Vec<_> = heap.iter().collect::<Result<Vec<_>>>().unwrap();
        assert_eq!(rows.len(), 9);
    }

    #[test]
    fn test_adopt_existing_heap() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");
        let first;

        {
            let disk = Arc::new(DiskManager::open(&path).unwrap());
            let pool = Arc::new(BufferPool::new(10, disk));
            let heap = TableHeap::new(Arc::clone(&pool), PageId::INVALID).unwrap();
            first = heap.first_page_id();
            heap.insert_tuple(b"durable row").unwrap();
            pool.flush_all().unwrap();
        }

        {
            let disk = Arc::new(DiskManager::open(&path).unwrap());
            let pool = Arc::new(BufferPool::new(10, disk));
            let heap = TableHeap::new(pool, first).unwrap();
            let rows: Vec<_> = heap.iter().collect::<Result<Vec<_>>>().unwrap();
            assert_eq!(rows.len(), 1);
            assert_eq!(rows[0].0.as_ref(), b"durable row");
        }
    }
}
