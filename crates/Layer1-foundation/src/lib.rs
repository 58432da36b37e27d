//! # plexus-foundation
//!
//! Foundation layer for Plexus:
//! - Error: 공통 에러 타입 (Parse, UnresolvedArtifact, ContextCreation, Listener ...)
//! - Config: 호스트 설정 (글로벌 + 프로젝트 병합)
//! - Storage: JsonStore (설정 파일)
//! - Cache: 리로드 시 비워지는 공유 캐시

pub mod cache;
pub mod config;
pub mod error;
pub mod storage;

// ============================================================================
// Error
// ============================================================================
pub use error::{Error, Result};

// ============================================================================
// Config (설정)
// ============================================================================
pub use config::HostConfig;

// ============================================================================
// Storage (저장소)
// ============================================================================
pub use storage::{JsonStore, PLEXUS_CONFIG_FILE};

// ============================================================================
// Cache (공유 캐시)
// ============================================================================
pub use cache::{ClearableCache, LruCache, SharedCache};
