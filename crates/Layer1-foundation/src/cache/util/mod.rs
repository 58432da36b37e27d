//! Cache utilities
//!
//! - `LruCache`: Simple LRU cache

mod lru;

pub use lru::LruCache;
