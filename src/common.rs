pub type TableId = u32;
pub type PageNo = u32;
pub type SlotId = u16;

/// (table id, page number). Identifies a page across all tables of the engine.
pub type PageId = (TableId, PageNo);

/// (page id, slot). Identifies a tuple once it has been stored on a page.
pub type RecordId = (PageId, SlotId);

pub const PAGE_SIZE: usize = 4096;

/// Serialized size of a text field: a 4 byte length prefix plus the payload area.
pub const TEXT_SIZE: usize = 128;
pub const TEXT_MAX_LEN: usize = TEXT_SIZE - 4;
