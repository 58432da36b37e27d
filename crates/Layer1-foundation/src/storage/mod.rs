//! Storage module for Plexus
//!
//! - `json`: 설정 파일 읽기/쓰기

mod json;

pub use json::{JsonStore, PLEXUS_CONFIG_FILE, PLEXUS_DIR, PROJECT_DIR};
