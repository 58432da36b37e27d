//! Host Config - 호스트 프로세스 설정
//!
//! 글로벌 설정(<config_dir>/plexus/config.json)과 프로젝트 설정(.plexus/config.json)을
//! 병합해서 사용한다. 프로젝트 설정이 우선.

use crate::storage::JsonStore;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_RELOAD_DEBOUNCE_MS: u64 = 200;
pub const DEFAULT_CACHE_CAPACITY: usize = 256;

/// 호스트 설정
///
/// 모든 필드는 선택적이며, 값이 없으면 기본값을 사용한다.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostConfig {
    /// 로컬 아티팩트 저장소 루트 (기본: ~/.m2/repository)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<PathBuf>,

    /// 바인딩을 시도할 첫 포트
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// 매니페스트 변경 이벤트를 모으는 시간 (ms)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reload_debounce_ms: Option<u64>,

    /// 변경된 플러그인의 구조적 자식까지 다시 빌드할지 여부
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cascade_reload: Option<bool>,

    /// 공유 정의 캐시 용량
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_capacity: Option<usize>,

    /// 호스트 임시 디렉토리
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temp_directory: Option<PathBuf>,
}

impl HostConfig {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Load / Save
    // ========================================================================

    /// 글로벌 + 프로젝트 병합 로드
    pub fn load() -> Result<Self> {
        let mut config = Self::new();

        // 글로벌 → 프로젝트 순서로 덮어쓴다
        for store in [JsonStore::global(), JsonStore::current_project()] {
            let Ok(store) = store else { continue };
            if let Some(found) = store.read::<HostConfig>()? {
                debug!("Loaded config from {}", store.path().display());
                config.merge(found);
            }
        }

        Ok(config)
    }

    /// 지정한 파일에서만 로드
    pub fn load_from(store: &JsonStore) -> Result<Self> {
        Ok(store.read::<HostConfig>()?.unwrap_or_default())
    }

    pub fn save_to(&self, store: &JsonStore) -> Result<()> {
        store.write(self)
    }

    /// 다른 설정 병합 (값이 있는 필드만 덮어씀)
    pub fn merge(&mut self, other: HostConfig) {
        if other.repository.is_some() {
            self.repository = other.repository;
        }
        if other.port.is_some() {
            self.port = other.port;
        }
        if other.reload_debounce_ms.is_some() {
            self.reload_debounce_ms = other.reload_debounce_ms;
        }
        if other.cascade_reload.is_some() {
            self.cascade_reload = other.cascade_reload;
        }
        if other.cache_capacity.is_some() {
            self.cache_capacity = other.cache_capacity;
        }
        if other.temp_directory.is_some() {
            self.temp_directory = other.temp_directory;
        }
    }

    // ========================================================================
    // 유효값 (기본값 적용)
    // ========================================================================

    pub fn repository(&self) -> PathBuf {
        self.repository.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".m2")
                .join("repository")
        })
    }

    pub fn port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_PORT)
    }

    pub fn reload_debounce(&self) -> Duration {
        Duration::from_millis(self.reload_debounce_ms.unwrap_or(DEFAULT_RELOAD_DEBOUNCE_MS))
    }

    pub fn cascade_reload(&self) -> bool {
        self.cascade_reload.unwrap_or(false)
    }

    pub fn cache_capacity(&self) -> usize {
        self.cache_capacity.unwrap_or(DEFAULT_CACHE_CAPACITY)
    }

    pub fn temp_directory(&self) -> PathBuf {
        self.temp_directory
            .clone()
            .unwrap_or_else(|| PathBuf::from("target").join("plexus").join("temp"))
    }

    // ========================================================================
    // Builder
    // ========================================================================

    pub fn with_repository(mut self, repository: impl Into<PathBuf>) -> Self {
        self.repository = Some(repository.into());
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_cascade_reload(mut self, cascade: bool) -> Self {
        self.cascade_reload = Some(cascade);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = HostConfig::new();
        assert_eq!(config.port(), DEFAULT_PORT);
        assert_eq!(config.reload_debounce(), Duration::from_millis(200));
        assert!(!config.cascade_reload());
        assert_eq!(config.cache_capacity(), DEFAULT_CACHE_CAPACITY);
        assert!(config.repository().ends_with("repository"));
    }

    #[test]
    fn test_merge_overrides_only_present_fields() {
        let mut base = HostConfig::new().with_port(9000).with_repository("/repo");
        let project = HostConfig {
            port: Some(9100),
            cascade_reload: Some(true),
            ..Default::default()
        };

        base.merge(project);

        assert_eq!(base.port(), 9100);
        assert!(base.cascade_reload());
        assert_eq!(base.repository(), PathBuf::from("/repo"));
    }

    #[test]
    fn test_camel_case_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::in_dir(dir.path());
        std::fs::write(
            store.path(),
            r#"{ "reloadDebounceMs": 50, "cascadeReload": true }"#,
        )
        .unwrap();

        let config = HostConfig::load_from(&store).unwrap();
        assert_eq!(config.reload_debounce(), Duration::from_millis(50));
        assert!(config.cascade_reload());
        assert_eq!(config.port, None);
    }

    #[test]
    fn test_save_round_trip_skips_unset() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::project(dir.path());
        HostConfig::new().with_port(8181).save_to(&store).unwrap();

        let raw = std::fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains("\"port\": 8181"));
        assert!(!raw.contains("repository"));
    }
}
