//! Buffer pool: a bounded in-memory cache of pages with pin counting and
//! write-back eviction.

use crate::disk::DiskManager;
use loam_common::{LoamError, Page, PageId, Result};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Bounded map from page id to resident page frame.
///
/// All page access goes through the pool: fetch, mutate, unpin(dirty?).
/// A page with a positive pin count is ineligible for eviction; callers
/// must pair every fetch with exactly one unpin, marking dirty on any
/// mutation. Writes are buffered until `flush_page` / `flush_all`.
pub struct BufferPool {
    /// Disk manager owning the backing file.
    disk: Arc<DiskManager>,
    /// Maximum number of resident pages.
    capacity: usize,
    /// Resident pages, keyed by id.
    pages: Mutex<HashMap<PageId, Arc<Page>>>,
}

impl BufferPool {
    /// Creates a buffer pool with the given capacity in pages.
    pub fn new(capacity: usize, disk: Arc<DiskManager>) -> Self {
        Self {
            disk,
            capacity,
            pages: Mutex::new(HashMap::with_capacity(capacity)),
        }
    }

    /// Returns the pool capacity in pages.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of resident pages.
    pub fn resident_count(&self) -> usize {
        self.pages.lock().len()
    }

    /// Returns true if the page is resident.
    pub fn contains(&self, page_id: PageId) -> bool {
        self.pages.lock().contains_key(&page_id)
    }

    /// Fetches a page, reading it from disk if not resident.
    ///
    /// The returned page is pinned. Fails with `PoolExhausted` if the pool
    /// is full and every resident page is pinned.
    pub fn fetch_page(&self, page_id: PageId) -> Result<Arc<Page>> {
        let mut pages = self.pages.lock();

        if let Some(page) = pages.get(&page_id) {
            page.pin();
            return Ok(Arc::clone(page));
        }

        if pages.len() >= self.capacity {
            self.evict(&mut pages)?;
        }

        let page = Arc::new(Page::new(page_id));
        self.disk.read_page(page_id, &page)?;
        page.pin();
        pages.insert(page_id, Arc::clone(&page));
        Ok(page)
    }

    /// Allocates a fresh page on disk and returns its pinned, zeroed frame.
    pub fn new_page(&self) -> Result<Arc<Page>> {
        let mut pages = self.pages.lock();

        if pages.len() >= self.capacity {
            self.evict(&mut pages)?;
        }

        let page_id = self.disk.allocate_page()?;
        let page = Arc::new(Page::new(page_id));
        page.pin();
        pages.insert(page_id, Arc::clone(&page));
        Ok(page)
    }

    /// Releases one pin on a page, ORing in the dirty flag.
    ///
    /// A no-op for non-resident pages; an extra unpin saturates at zero.
    pub fn unpin_page(&self, page_id: PageId, is_dirty: bool) {
        let pages = self.pages.lock();
        if let Some(page) = pages.get(&page_id) {
            page.unpin();
            if is_dirty {
                page.set_dirty(true);
            }
        }
    }

    /// Writes a resident dirty page to disk and clears its dirty flag.
    pub fn flush_page(&self, page_id: PageId) -> Result<()> {
        let pages = self.pages.lock();
        if let Some(page) = pages.get(&page_id) {
            Self::flush_frame(&self.disk, page)?;
        }
        Ok(())
    }

    /// Flushes every resident dirty page.
    pub fn flush_all(&self) -> Result<()> {
        let pages = self.pages.lock();
        for page in pages.values() {
            Self::flush_frame(&self.disk, page)?;
        }
        Ok(())
    }

    fn flush_frame(disk: &DiskManager, page: &Arc<Page>) -> Result<()> {
        if page.is_dirty() {
            disk.write_page(page)?;
            page.set_dirty(false);
        }
        Ok(())
    }

    /// Evicts one unpinned page, writing it back first if dirty.
    ///
    /// The victim is the first unpinned resident found; fails with
    /// `PoolExhausted` when every page is pinned.
    fn evict(&self, pages: &mut HashMap<PageId, Arc<Page>>) -> Result<()> {
        let victim = pages
            .iter()
            .find(|(_, page)| !page.is_pinned())
            .map(|(id, _)| *id);

        match victim {
            Some(id) => {
                let page = &pages[&id];
                Self::flush_frame(&self.disk, page)?;
                pages.remove(&id);
                Ok(())
            }
            None => Err(LoamError::PoolExhausted),
        }
    }
}
