use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    /// The transaction was chosen as a deadlock victim or aborted externally.
    /// The caller must stop the transaction and release its resources.
    #[error("transaction was aborted")]
    TransactionAborted,

    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("no such element: {0}")]
    NoSuchElement(String),

    /// The page has no free slot left. Handled internally by the heap file,
    /// which appends a fresh page instead.
    #[error("page is full")]
    PageFull,

    /// Every cached page is dirty, so nothing can be evicted.
    #[error("buffer pool is full and no clean page can be evicted")]
    BufferFull,

    #[error("{0}")]
    Invalid(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = DbError> = std::result::Result<T, E>;
