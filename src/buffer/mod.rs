pub mod buffer_pool;
mod lru_replacer;
