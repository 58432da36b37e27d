//! Error types for Plexus
//!
//! 모든 에러를 중앙에서 관리

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Plexus 에러 타입
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // 매니페스트 관련
    // ========================================================================
    #[error("Manifest parse error: {0}")]
    Parse(String),

    // ========================================================================
    // 플러그인 로드 관련 (플러그인 단위로 skip 됨)
    // ========================================================================
    #[error("Unresolved artifact {artifact} for plugin {plugin}")]
    UnresolvedArtifact { plugin: String, artifact: String },

    #[error("Failed to create context for plugin {plugin}: {message}")]
    ContextCreation { plugin: String, message: String },

    // ========================================================================
    // 리스너 관련
    // ========================================================================
    #[error("Listener {listener} failed: {message}")]
    Listener { listener: String, message: String },

    // ========================================================================
    // 설정 관련
    // ========================================================================
    #[error("Configuration error: {0}")]
    Config(String),

    // ========================================================================
    // 일반
    // ========================================================================
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // ========================================================================
    // 외부 에러 변환
    // ========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ========================================================================
    // 기타
    // ========================================================================
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// 플러그인 하나만 건너뛰고 나머지 로드를 계속할 수 있는 에러인지 확인
    pub fn is_plugin_scoped(&self) -> bool {
        matches!(
            self,
            Error::UnresolvedArtifact { .. } | Error::ContextCreation { .. }
        )
    }

    /// 해석 실패 에러 생성 헬퍼
    pub fn unresolved(plugin: impl Into<String>, artifact: impl Into<String>) -> Self {
        Error::UnresolvedArtifact {
            plugin: plugin.into(),
            artifact: artifact.into(),
        }
    }

    /// 컨텍스트 생성 실패 에러 생성 헬퍼
    pub fn context_creation(plugin: impl Into<String>, message: impl Into<String>) -> Self {
        Error::ContextCreation {
            plugin: plugin.into(),
            message: message.into(),
        }
    }

    /// 리스너 실패 에러 생성 헬퍼
    pub fn listener(listener: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Listener {
            listener: listener.into(),
            message: message.into(),
        }
    }
}

// ============================================================================
// From 구현 (추가 변환)
// ============================================================================

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Internal(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Internal(s.to_string())
    }
}
