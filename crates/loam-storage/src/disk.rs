//! Disk manager for page-level file I/O.

use loam_common::{Page, PageId, Result, PAGE_SIZE};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Manages page allocation and positional I/O on one database file.
///
/// The file is append-only at page granularity: `allocate_page` extends it
/// by one zeroed page, and reads and writes address pages by their offset
/// `page_id * 4096`. A single mutex serializes all file operations; the
/// disk manager never interprets page contents.
pub struct DiskManager {
    /// The open database file.
    file: Mutex<File>,
    /// Path of the database file.
    path: PathBuf,
}

impl DiskManager {
    /// Opens the database file, creating it if absent.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut options = OpenOptions::new();
        options.read(true).write(true).create(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let file = options.open(&path)?;

        Ok(Self {
            file: Mutex::new(file),
            path,
        })
    }

    /// Returns the path of the database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Allocates a new page at the end of the file.
    ///
    /// The new page id is `file_size / 4096`; the file is extended with
    /// 4096 zero bytes so the page exists on disk immediately.
    pub fn allocate_page(&self) -> Result<PageId> {
        let mut file = self.file.lock();

        let file_size = file.metadata()?.len();
        let next = PageId(file_size as i64 / PAGE_SIZE as i64);

        file.seek(SeekFrom::Start(next.offset()))?;
        file.write_all(&[0u8; PAGE_SIZE])?;

        Ok(next)
    }

    /// Writes a page's 4096 bytes at its offset.
    pub fn write_page(&self, page: &Page) -> Result<()> {
        let mut file = self.file.lock();
        let data = page.data();

        file.seek(SeekFrom::Start(page.id().offset()))?;
        file.write_all(&data[..])?;

        Ok(())
    }

    /// Reads a page's 4096 bytes into the given frame.
    ///
    /// A short read (including one caused by trailing EOF) zero-fills the
    /// remainder, so a freshly allocated page that was never written reads
    /// back as all zeros. Updates the frame's id to `page_id`.
    pub fn read_page(&self, page_id: PageId, page: &Page) -> Result<()> {
        let mut file = self.file.lock();
        let mut data = page.data_mut();

        data.fill(0);
        file.seek(SeekFrom::Start(page_id.offset()))?;

        let mut total = 0;
        while total < PAGE_SIZE {
            match file.read(&mut data[total..]) {
                Ok(0) => break,
                Ok(n) => total += n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }

        drop(data);
        page.set_id(page_id);
        Ok(())
    }

    /// Returns the number of pages currently in the file.
    pub fn num_pages(&self) -> Result<i64> {
        let file = self.file.lock();
        let file_size = file.metadata()?.len();
        Ok(file_size as i64 / PAGE_SIZE as i64)
    }
}
