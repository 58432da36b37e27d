//! Artifact - 아티팩트 좌표와 해석
//!
//! 그래프/중복 판정에서 아티팩트의 identity 는 `groupId:artifactId` 뿐이다.
//! 버전은 identity 에 포함되지 않는다.

mod resolver;

pub use resolver::{ArtifactResolver, LocalRepositoryResolver};

#[cfg(test)]
pub(crate) use resolver::AnyPath;

use plexus_foundation::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::str::FromStr;

// ============================================================================
// ArtifactKey - identity (groupId:artifactId)
// ============================================================================

/// 아티팩트 identity
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactKey {
    pub group_id: String,
    pub artifact_id: String,
}

impl ArtifactKey {
    pub fn new(group_id: impl Into<String>, artifact_id: impl Into<String>) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
        }
    }
}

impl fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group_id, self.artifact_id)
    }
}

impl FromStr for ArtifactKey {
    type Err = Error;

    /// `groupId:artifactId` (뒤에 `:version` 이 붙어 있으면 무시)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, ':');
        match (parts.next(), parts.next()) {
            (Some(group), Some(artifact)) if !group.is_empty() && !artifact.is_empty() => {
                Ok(Self::new(group, artifact))
            }
            _ => Err(Error::InvalidInput(format!(
                "Expected groupId:artifactId, got '{}'",
                s
            ))),
        }
    }
}

// ============================================================================
// ArtifactRef - 좌표 + (선택) 파일
// ============================================================================

/// 아티팩트 참조
///
/// 생성 후 변경되지 않는 값 객체. `PartialEq`/`Hash` 는 identity 기준이므로
/// 버전만 다른 두 참조는 같다고 판정된다. 전체 좌표 비교가 필요하면
/// [`ArtifactRef::same_coordinates`] 를 사용한다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactRef {
    group_id: String,
    artifact_id: String,
    version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    file: Option<PathBuf>,
}

impl ArtifactRef {
    pub fn new(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            version: version.into(),
            file: None,
        }
    }

    /// 빌더 패턴: 해석된 파일 설정
    pub fn with_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.file = Some(file.into());
        self
    }

    pub fn group_id(&self) -> &str {
        &self.group_id
    }

    pub fn artifact_id(&self) -> &str {
        &self.artifact_id
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn file(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    /// identity 키
    pub fn key(&self) -> ArtifactKey {
        ArtifactKey::new(&self.group_id, &self.artifact_id)
    }

    /// `groupId:artifactId:version`
    pub fn coordinates(&self) -> String {
        format!("{}:{}:{}", self.group_id, self.artifact_id, self.version)
    }

    /// 버전과 파일까지 포함한 전체 비교
    pub fn same_coordinates(&self, other: &ArtifactRef) -> bool {
        self.group_id == other.group_id
            && self.artifact_id == other.artifact_id
            && self.version == other.version
            && self.file == other.file
    }
}

impl PartialEq for ArtifactRef {
    fn eq(&self, other: &Self) -> bool {
        self.group_id == other.group_id && self.artifact_id == other.artifact_id
    }
}

impl Eq for ArtifactRef {}

impl Hash for ArtifactRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.group_id.hash(state);
        self.artifact_id.hash(state);
    }
}

impl fmt::Display for ArtifactRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.coordinates())
    }
}

/// 두 목록이 순서와 전체 좌표까지 같은지 비교
pub(crate) fn same_refs(a: &[ArtifactRef], b: &[ArtifactRef]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.same_coordinates(y))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_identity_ignores_version() {
        let a = ArtifactRef::new("org.example", "hello", "1.0");
        let b = ArtifactRef::new("org.example", "hello", "2.0").with_file("/tmp/hello-2.0.jar");

        assert_eq!(a, b);
        assert_eq!(a.key(), b.key());
        assert!(!a.same_coordinates(&b));

        let set: HashSet<_> = [a, b].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_identity_differs_on_artifact() {
        let a = ArtifactRef::new("org.example", "hello", "1.0");
        let b = ArtifactRef::new("org.example", "world", "1.0");
        assert_ne!(a, b);
    }

    #[test]
    fn test_coordinates() {
        let a = ArtifactRef::new("org.example", "hello", "1.0");
        assert_eq!(a.coordinates(), "org.example:hello:1.0");
        assert_eq!(a.key().to_string(), "org.example:hello");
        assert_eq!(a.to_string(), "org.example:hello:1.0");
    }

    #[test]
    fn test_key_parse() {
        let key: ArtifactKey = "org.example:hello".parse().unwrap();
        assert_eq!(key, ArtifactKey::new("org.example", "hello"));

        let with_version: ArtifactKey = "org.example:hello:1.0".parse().unwrap();
        assert_eq!(with_version, key);

        assert!("hello".parse::<ArtifactKey>().is_err());
        assert!(":hello".parse::<ArtifactKey>().is_err());
    }
}
