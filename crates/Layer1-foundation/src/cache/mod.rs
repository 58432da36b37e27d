//! # Plexus Cache
//!
//! 플러그인 컨텍스트 간에 공유되는 캐시.
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │  PluginRuntime (reload)                       │
//! │     │  clear() - 컨텍스트 재생성 전에 호출     │
//! │     ▼                                         │
//! │  ClearableCache ──▶ SharedCache<V>            │
//! │                        └── LruCache<String,V> │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! - [`shared`] - 리로드 훅이 있는 공유 캐시
//! - [`util`] - LRU 캐시

pub mod shared;
pub mod util;

pub use shared::{ClearableCache, SharedCache};
pub use util::LruCache;
