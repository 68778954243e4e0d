//! Minimal write-ahead log: fixed-size records carrying the before- and
//! after-image of one page change. The buffer pool appends a record and
//! forces the log before any page reaches the data file, so replaying the
//! after-images of a committed transaction reconstructs its writes.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::PathBuf;
use std::sync::Mutex;

use crate::common::{PageId, PAGE_SIZE};
use crate::concurrency::TransactionId;
use crate::error::Result;

const RECORD_SIZE: usize = 8 + 4 + 4 + 2 * PAGE_SIZE;

pub struct LogRecord {
    pub tid: TransactionId,
    pub pid: PageId,
    pub before: Vec<u8>,
    pub after: Vec<u8>,
}

pub struct LogFile {
    file: Mutex<File>,
}

impl LogFile {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path.into())?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }

    /// Appends one record describing a page change. The record is not durable
    /// until the next `force`.
    pub fn log_write(
        &self,
        tid: TransactionId,
        pid: PageId,
        before: &[u8],
        after: &[u8],
    ) -> Result<()> {
        debug_assert_eq!(before.len(), PAGE_SIZE);
        debug_assert_eq!(after.len(), PAGE_SIZE);

        let mut file = self.file.lock().unwrap();
        file.seek(SeekFrom::End(0))?;
        file.write_all(&tid.id().to_be_bytes())?;
        file.write_all(&pid.0.to_be_bytes())?;
        file.write_all(&pid.1.to_be_bytes())?;
        file.write_all(before)?;
        file.write_all(after)?;
        Ok(())
    }

    /// Flushes every appended record to disk.
    pub fn force(&self) -> Result<()> {
        self.file.lock().unwrap().sync_all()?;
        Ok(())
    }

    /// Reads back every complete record, oldest first. A trailing partial
    /// record (torn append) is ignored.
    pub fn records(&self) -> Result<Vec<LogRecord>> {
        let mut file = self.file.lock().unwrap();
        file.seek(SeekFrom::Start(0))?;
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)?;

        let mut records = Vec::with_capacity(bytes.len() / RECORD_SIZE);
        for frame in bytes.chunks_exact(RECORD_SIZE) {
            let tid = u64::from_be_bytes(frame[..8].try_into().unwrap());
            let table_id = u32::from_be_bytes(frame[8..12].try_into().unwrap());
            let page_no = u32::from_be_bytes(frame[12..16].try_into().unwrap());
            records.push(LogRecord {
                tid: TransactionId::from_id(tid),
                pid: (table_id, page_no),
                before: frame[16..16 + PAGE_SIZE].to_vec(),
                after: frame[16 + PAGE_SIZE..].to_vec(),
            });
        }
        Ok(records)
    }
}
