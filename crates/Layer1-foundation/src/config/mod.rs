//! Config - 설정 관리
//!
//! - `host.rs` - HostConfig 호스트 설정

mod host;

pub use host::{HostConfig, DEFAULT_CACHE_CAPACITY, DEFAULT_PORT, DEFAULT_RELOAD_DEBOUNCE_MS};
