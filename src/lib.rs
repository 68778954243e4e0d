//! A small embeddable relational storage engine. Tables live in heap files of
//! fixed-size slotted pages; every page access goes through a bounded buffer
//! pool that enforces strict two-phase page locking with deadlock detection
//! and write-ahead logging. Queries run as trees of pull-based executors
//! (scan, filter, join, aggregate, insert, delete).
//!
//! There is no SQL surface; embedders register tables in the [`Catalog`],
//! build executor trees by hand and drive transactions through the
//! [`buffer::buffer_pool::BufferPool`].

pub mod buffer;
pub mod catalog;
pub mod common;
pub mod concurrency;
pub mod error;
pub mod executors;
pub mod storage;
pub mod tuple;

use std::path::PathBuf;
use std::sync::Arc;

use buffer::buffer_pool::BufferPool;
use catalog::Catalog;
use error::Result;
use storage::log::LogFile;

/// The engine context: catalog, write-ahead log and buffer pool, constructed
/// once at startup and handed down to executors and embedding code. Tests
/// reset the engine by simply building a fresh `Database` over a scratch
/// directory.
pub struct Database {
    catalog: Arc<Catalog>,
    log_file: Arc<LogFile>,
    buffer_pool: BufferPool,
}

impl Database {
    /// Creates an engine whose write-ahead log lives at `log_path` and whose
    /// buffer pool caches up to `pool_capacity` pages.
    pub fn new(log_path: impl Into<PathBuf>, pool_capacity: usize) -> Result<Self> {
        let catalog = Arc::new(Catalog::new());
        let log_file = Arc::new(LogFile::new(log_path)?);
        let buffer_pool = BufferPool::new(pool_capacity, catalog.clone(), log_file.clone());
        Ok(Self {
            catalog,
            log_file,
            buffer_pool,
        })
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn log_file(&self) -> &LogFile {
        &self.log_file
    }

    pub fn buffer_pool(&self) -> &BufferPool {
        &self.buffer_pool
    }
}
