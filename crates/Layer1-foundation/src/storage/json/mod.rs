//! JSON 설정 파일
//!
//! 저장소 하나는 파일 하나를 가리킨다. 위치는 두 곳:
//! - 글로벌: `<config_dir>/plexus/config.json`
//! - 프로젝트: `<root>/.plexus/config.json`

use crate::{Error, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// 글로벌 설정 디렉토리 이름
pub const PLEXUS_DIR: &str = "plexus";

/// 프로젝트 로컬 설정 디렉토리 이름
pub const PROJECT_DIR: &str = ".plexus";

/// 설정 파일명
pub const PLEXUS_CONFIG_FILE: &str = "config.json";

/// JSON 설정 파일 하나
#[derive(Debug, Clone)]
pub struct JsonStore {
    path: PathBuf,
}

impl JsonStore {
    /// 디렉토리 안의 `config.json`
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(PLEXUS_CONFIG_FILE),
        }
    }

    pub fn global() -> Result<Self> {
        let dir = dirs::config_dir()
            .ok_or_else(|| Error::Config("Cannot find config directory".to_string()))?;
        Ok(Self::in_dir(dir.join(PLEXUS_DIR)))
    }

    pub fn project(root: impl AsRef<Path>) -> Self {
        Self::in_dir(root.as_ref().join(PROJECT_DIR))
    }

    pub fn current_project() -> Result<Self> {
        Ok(Self::project(std::env::current_dir()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 파일이 없으면 `None`
    pub fn read<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| Error::Config(format!("{}: {}", self.path.display(), e)))
    }

    /// 상위 디렉토리를 만들고 pretty JSON 으로 기록
    pub fn write<T: Serialize>(&self, data: &T) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(data)?)?;
        Ok(())
    }
}
