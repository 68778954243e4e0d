//! A table stored as a sequence of slotted pages in a single file. The file
//! only ever performs raw page I/O on its own; every tuple-level operation
//! routes page access through the buffer pool so that locking, caching and
//! dirty tracking stay in one place.

use std::collections::VecDeque;
use std::fs::{File, OpenOptions};
use std::os::unix::prelude::FileExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::buffer::buffer_pool::{BufferPool, PageRef};
use crate::common::{PageId, PageNo, TableId, PAGE_SIZE};
use crate::concurrency::{Permissions, TransactionId};
use crate::error::{DbError, Result};
use crate::storage::heap_page::HeapPage;
use crate::tuple::schema::TupleDesc;
use crate::tuple::Tuple;

/// Derives a stable table id from the file path (32-bit FNV-1a).
fn table_id_for_path(path: &Path) -> TableId {
    let mut hash: u32 = 0x811c_9dc5;
    for byte in path.to_string_lossy().as_bytes() {
        hash ^= *byte as u32;
        hash = hash.wrapping_mul(0x0100_0193);
    }
    hash
}

pub struct HeapFile {
    file: File,
    path: PathBuf,
    table_id: TableId,
    desc: TupleDesc,
}

impl HeapFile {
    /// Opens (or creates) the backing file. The table id is derived from the
    /// absolute path, so reopening the same file yields the same id.
    pub fn new(path: impl Into<PathBuf>, desc: TupleDesc) -> Result<Self> {
        let path = path.into();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&path)?;
        let path = path.canonicalize()?;
        let table_id = table_id_for_path(&path);
        Ok(Self {
            file,
            path,
            table_id,
            desc,
        })
    }

    pub fn table_id(&self) -> TableId {
        self.table_id
    }

    pub fn desc(&self) -> &TupleDesc {
        &self.desc
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of pages in the file, a short last page counting as a full one.
    pub fn num_pages(&self) -> Result<PageNo> {
        let len = self.file.metadata()?.len();
        Ok(((len + PAGE_SIZE as u64 - 1) / PAGE_SIZE as u64) as PageNo)
    }

    /// Reads one page directly from disk. Bytes past the end of the file read
    /// as zero, so a short last page (and the empty page one past the end,
    /// used when appending) parse cleanly.
    pub fn read_page(&self, pid: PageId) -> Result<HeapPage> {
        if pid.0 != self.table_id {
            return Err(DbError::Invalid(format!(
                "page {:?} does not belong to table {}",
                pid, self.table_id
            )));
        }
        let offset = pid.1 as u64 * PAGE_SIZE as u64;
        let len = self.file.metadata()?.len();
        let mut data = vec![0u8; PAGE_SIZE];
        if offset < len {
            let available = ((len - offset) as usize).min(PAGE_SIZE);
            self.file.read_exact_at(&mut data[..available], offset)?;
        }
        HeapPage::parse(pid, self.desc.clone(), &data)
    }

    /// Writes one full page at its offset and syncs the file.
    pub fn write_page(&self, page: &HeapPage) -> Result<()> {
        let offset = page.pid().1 as u64 * PAGE_SIZE as u64;
        self.file.write_all_at(&page.serialize(), offset)?;
        self.file.sync_all()?;
        Ok(())
    }

    /// Inserts the tuple into the first page with a free slot, appending a new
    /// page if every existing one is full. Returns the pages that were
    /// modified.
    pub fn insert_tuple(
        &self,
        tid: TransactionId,
        tuple: Tuple,
        pool: &BufferPool,
    ) -> Result<Vec<PageRef>> {
        for page_no in 0..self.num_pages()? {
            let pid = (self.table_id, page_no);
            let page = pool.get_page(tid, pid, Permissions::ReadOnly)?;
            let has_space = page.read().unwrap().num_empty_slots() > 0;
            if has_space {
                let page = pool.get_page(tid, pid, Permissions::ReadWrite)?;
                page.write().unwrap().insert_tuple(tuple)?;
                return Ok(vec![page]);
            }
        }

        // every page is full, append a fresh one and write it through
        let pid = (self.table_id, self.num_pages()?);
        let page = pool.get_page(tid, pid, Permissions::ReadWrite)?;
        {
            let mut locked = page.write().unwrap();
            locked.insert_tuple(tuple)?;
            self.write_page(&locked)?;
        }
        Ok(vec![page])
    }

    /// Deletes the tuple from the page its record id points at. Returns the
    /// modified page.
    pub fn delete_tuple(
        &self,
        tid: TransactionId,
        tuple: &Tuple,
        pool: &BufferPool,
    ) -> Result<PageRef> {
        let (pid, _) = tuple
            .record_id()
            .ok_or_else(|| DbError::Invalid("cannot delete a tuple without a record id".to_owned()))?;
        let page = pool.get_page(tid, pid, Permissions::ReadWrite)?;
        page.write().unwrap().delete_tuple(tuple)?;
        Ok(page)
    }
}

/// Cursor over every tuple of a heap file, in page-then-slot order. Each page
/// is fetched with a shared lock through the buffer pool; pages without
/// occupied slots are skipped.
pub struct HeapFileIterator<'a> {
    file: Arc<HeapFile>,
    pool: &'a BufferPool,
    tid: TransactionId,
    next_page: PageNo,
    buffered: VecDeque<Tuple>,
}

impl<'a> HeapFileIterator<'a> {
    pub fn new(file: Arc<HeapFile>, tid: TransactionId, pool: &'a BufferPool) -> Self {
        Self {
            file,
            pool,
            tid,
            next_page: 0,
            buffered: VecDeque::new(),
        }
    }

    /// Restarts the cursor from the first page.
    pub fn rewind(&mut self) {
        self.next_page = 0;
        self.buffered.clear();
    }

    fn fetch_next_tuple(&mut self) -> Result<Option<Tuple>> {
        loop {
            if let Some(tuple) = self.buffered.pop_front() {
                return Ok(Some(tuple));
            }
            if self.next_page >= self.file.num_pages()? {
                return Ok(None);
            }
            let pid = (self.file.table_id(), self.next_page);
            let page = self.pool.get_page(self.tid, pid, Permissions::ReadOnly)?;
            self.buffered
                .extend(page.read().unwrap().iter().cloned());
            self.next_page += 1;
        }
    }
}

impl<'a> std::iter::Iterator for HeapFileIterator<'a> {
    type Item = Result<Tuple>;

    fn next(&mut self) -> Option<Self::Item> {
        self.fetch_next_tuple().transpose()
    }
}
