//! Page and record-identifier types for LoamDB storage.

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicI64, Ordering};

/// Page size in bytes (4 KB).
pub const PAGE_SIZE: usize = 4096;

/// Unique identifier for a page: its index into the database file.
///
/// A page with id `n` occupies bytes `[n * 4096, (n + 1) * 4096)` on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PageId(pub i64);

impl PageId {
    /// Sentinel denoting "no such page". Never stored for a present page.
    pub const INVALID: PageId = PageId(-1);

    /// Returns true if this is a valid page ID.
    pub fn is_valid(&self) -> bool {
        self.0 >= 0
    }

    /// Byte offset of this page within the database file.
    pub fn offset(&self) -> u64 {
        self.0 as u64 * PAGE_SIZE as u64
    }
}

impl std::fmt::Display for PageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Record identifier: a specific slot on a specific page.
///
/// Stable under inserts and tombstone deletes (slots are never reused or
/// compacted); not stable under page reorganization, which the heap never
/// performs for live tuples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rid {
    /// Page containing the tuple.
    pub page_id: PageId,
    /// Slot index within the page.
    pub slot_id: u32,
}

impl Rid {
    /// Wire size: 8-byte page id followed by 4-byte slot id, big-endian.
    pub const SIZE: usize = 12;

    /// Creates a new record identifier.
    pub fn new(page_id: PageId, slot_id: u32) -> Self {
        Self { page_id, slot_id }
    }

    /// Serializes to the 12-byte big-endian wire form used by index leaves.
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];
        buf[0..8].copy_from_slice(&self.page_id.0.to_be_bytes());
        buf[8..12].copy_from_slice(&self.slot_id.to_be_bytes());
        buf
    }

    /// Deserializes from the 12-byte big-endian wire form.
    pub fn from_bytes(buf: &[u8]) -> Self {
        let page_id = i64::from_be_bytes(buf[0..8].try_into().unwrap());
        let slot_id = u32::from_be_bytes(buf[8..12].try_into().unwrap());
        Self {
            page_id: PageId(page_id),
            slot_id,
        }
    }
}

impl std::fmt::Display for Rid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.page_id, self.slot_id)
    }
}

/// A fixed-size page frame.
///
/// The on-disk representation is exactly the 4096 data bytes; the id, pin
/// count and dirty flag live only in memory while the page is cached. Pin
/// and dirty metadata sit outside the data lock so the buffer pool can
/// manage frames without touching page contents.
pub struct Page {
    /// Identity of the page currently held in this frame.
    id: AtomicI64,
    /// Number of holders currently using this page.
    pin_count: AtomicI32,
    /// Whether the page has been modified since it was last written.
    is_dirty: AtomicBool,
    /// Page data buffer.
    data: RwLock<Box<[u8; PAGE_SIZE]>>,
}

impl Page {
    /// Creates a new zeroed page with the given id.
    pub fn new(id: PageId) -> Self {
        Self {
            id: AtomicI64::new(id.0),
            pin_count: AtomicI32::new(0),
            is_dirty: AtomicBool::new(false),
            data: RwLock::new(Box::new([0u8; PAGE_SIZE])),
        }
    }

    /// Returns the page id.
    pub fn id(&self) -> PageId {
        PageId(self.id.load(Ordering::Acquire))
    }

    /// Updates the page id (set by the disk manager on read).
    pub fn set_id(&self, id: PageId) {
        self.id.store(id.0, Ordering::Release);
    }

    /// Returns the current pin count.
    pub fn pin_count(&self) -> i32 {
        self.pin_count.load(Ordering::Acquire)
    }

    /// Increments the pin count.
    pub fn pin(&self) {
        self.pin_count.fetch_add(1, Ordering::AcqRel);
    }

    /// Decrements the pin count, saturating at zero.
    ///
    /// An extra unpin is tolerated, not an error.
    pub fn unpin(&self) {
        let prev = self.pin_count.fetch_sub(1, Ordering::AcqRel);
        if prev <= 0 {
            self.pin_count.store(0, Ordering::Release);
        }
    }

    /// Returns true if any holder has this page pinned.
    pub fn is_pinned(&self) -> bool {
        self.pin_count() > 0
    }

    /// Returns true if the page has unwritten modifications.
    pub fn is_dirty(&self) -> bool {
        self.is_dirty.load(Ordering::Acquire)
    }

    /// Sets or clears the dirty flag.
    pub fn set_dirty(&self, dirty: bool) {
        self.is_dirty.store(dirty, Ordering::Release);
    }

    /// Read access to the page bytes.
    pub fn data(&self) -> RwLockReadGuard<'_, Box<[u8; PAGE_SIZE]>> {
        self.data.read()
    }

    /// Write access to the page bytes.
    pub fn data_mut(&self) -> RwLockWriteGuard<'_, Box<[u8; PAGE_SIZE]>> {
        self.data.write()
    }

    /// Copies bytes into the page, truncating at the page boundary.
    pub fn copy_from(&self, src: &[u8]) {
        let mut data = self.data.write();
        let len = src.len().min(PAGE_SIZE);
        data[..len].copy_from_slice(&src[..len]);
    }

    /// Zeroes the page data.
    pub fn clear(&self) {
        self.data.write().fill(0);
    }
}

impl std::fmt::Debug for Page {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Page")
            .field("id", &self.id())
            .field("pin_count", &self.pin_count())
            .field("is_dirty", &self.is_dirty())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_id_validity() {
        assert!(PageId(0).is_valid());
        assert!(PageId(17).is_valid());
        assert!(!PageId::INVALID.is_valid());
    }

    #[test]
    fn test_page_id_offset() {
        assert_eq!(PageId(0).offset(), 0);
        assert_eq!(PageId(1).offset(), 4096);
        assert_eq!(PageId(10).offset(), 40960);
    }

    #[test]
    fn test_page_id_display() {
        assert_eq!(PageId(5).to_string(), "5");
        assert_eq!(PageId::INVALID.to_string(), "-1");
    }

    #[test]
    fn test_rid_roundtrip() {
        let rid = Rid::new(PageId(42), 7);
        let bytes = rid.to_bytes();
        assert_eq!(bytes.len(), Rid::SIZE);
        assert_eq!(Rid::from_bytes(&bytes), rid);
    }

    #[test]
    fn test_rid_wire_form_is_big_endian() {
        let rid = Rid::new(PageId(1), 2);
        let bytes = rid.to_bytes();
        assert_eq!(&bytes[0..8], &[0, 0, 0, 0, 0, 0, 0, 1]);
        assert_eq!(&bytes[8..12], &[0, 0, 0, 2]);
    }

    #[test]
    fn test_rid_display() {
        assert_eq!(Rid::new(PageId(3), 9).to_string(), "3:9");
    }

    #[test]
    fn test_rid_serde_roundtrip() {
        let original = Rid::new(PageId(10), 500);
        let serialized = serde_json::to_string(&original).unwrap();
        let deserialized: Rid = serde_json::from_str(&serialized).unwrap();
        assert_eq!(original, deserialized);
    }

    #[test]
    fn test_page_new() {
        let page = Page::new(PageId(3));
        assert_eq!(page.id(), PageId(3));
        assert_eq!(page.pin_count(), 0);
        assert!(!page.is_pinned());
        assert!(!page.is_dirty());
        assert!(page.data().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_page_pin_unpin() {
        let page = Page::new(PageId(0));

        page.pin();
        page.pin();
        assert_eq!(page.pin_count(), 2);

        page.unpin();
        assert_eq!(page.pin_count(), 1);
        assert!(page.is_pinned());

        page.unpin();
        assert_eq!(page.pin_count(), 0);
        assert!(!page.is_pinned());
    }

    #[test]
    fn test_page_unpin_saturates_at_zero() {
        let page = Page::new(PageId(0));
        page.unpin();
        page.unpin();
        assert_eq!(page.pin_count(), 0);
    }

    #[test]
    fn test_page_dirty_flag() {
        let page = Page::new(PageId(0));
        assert!(!page.is_dirty());
        page.set_dirty(true);
        assert!(page.is_dirty());
        page.set_dirty(false);
        assert!(!page.is_dirty());
    }

    #[test]
    fn test_page_data_access() {
        let page = Page::new(PageId(0));
        {
            let mut data = page.data_mut();
            data[0] = 0xAB;
            data[PAGE_SIZE - 1] = 0xCD;
        }
        let data = page.data();
        assert_eq!(data[0], 0xAB);
        assert_eq!(data[PAGE_SIZE - 1], 0xCD);
    }

    #[test]
    fn test_page_copy_from() {
        let page = Page::new(PageId(0));
        page.copy_from(b"hello");
        assert_eq!(&page.data()[..5], b"hello");
    }

    #[test]
    fn test_page_clear() {
        let page = Page::new(PageId(0));
        page.copy_from(&[0xFF; 64]);
        page.clear();
        assert!(page.data().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_page_set_id() {
        let page = Page::new(PageId::INVALID);
        page.set_id(PageId(12));
        assert_eq!(page.id(), PageId(12));
    }
}
