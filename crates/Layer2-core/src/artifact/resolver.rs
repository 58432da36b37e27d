//! Artifact resolver - 좌표를 로컬 파일로 해석

use super::ArtifactRef;
use plexus_foundation::{Error, Result};
use std::path::PathBuf;
use tracing::debug;

/// 좌표 → 로컬 파일
///
/// 찾지 못하면 `UnresolvedArtifact` 를 반환한다. `plugin` 필드는 비워 두고
/// 컨텍스트 빌더가 채운다. 그 밖의 에러(I/O 등)는 로드 전체를 중단시킨다.
pub trait ArtifactResolver: Send + Sync {
    fn resolve(&self, artifact: &ArtifactRef) -> Result<PathBuf>;
}

/// 로컬 저장소 해석기
///
/// 1. 선언된 파일이 존재하면 그대로 사용
/// 2. 아니면 `<repo>/<group/as/path>/<artifactId>/<version>/<artifactId>-<version>.jar`
#[derive(Debug, Clone)]
pub struct LocalRepositoryResolver {
    repository: PathBuf,
}

impl LocalRepositoryResolver {
    pub fn new(repository: impl Into<PathBuf>) -> Self {
        Self {
            repository: repository.into(),
        }
    }

    pub fn repository(&self) -> &std::path::Path {
        &self.repository
    }

    /// 저장소 레이아웃상의 경로
    pub fn layout_path(&self, artifact: &ArtifactRef) -> PathBuf {
        let mut path = self.repository.clone();
        for segment in artifact.group_id().split('.').filter(|s| !s.is_empty()) {
            path.push(segment);
        }
        path.push(artifact.artifact_id());
        path.push(artifact.version());
        path.push(format!(
            "{}-{}.jar",
            artifact.artifact_id(),
            artifact.version()
        ));
        path
    }
}

impl ArtifactResolver for LocalRepositoryResolver {
    fn resolve(&self, artifact: &ArtifactRef) -> Result<PathBuf> {
        if let Some(file) = artifact.file() {
            if file.is_file() {
                return Ok(file.to_path_buf());
            }
            debug!(
                "Declared file {} for {} does not exist, trying repository",
                file.display(),
                artifact
            );
        }

        if artifact.group_id().is_empty()
            || artifact.artifact_id().is_empty()
            || artifact.version().is_empty()
        {
            return Err(Error::unresolved(
                "",
                format!("{} (incomplete coordinates)", artifact.coordinates()),
            ));
        }

        let path = self.layout_path(artifact);
        if path.is_file() {
            Ok(path)
        } else {
            Err(Error::unresolved(
                "",
                format!("{} (looked in {})", artifact.coordinates(), path.display()),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declared_file_wins() {
        let dir = tempfile::tempdir().unwrap();
        let jar = dir.path().join("hello.jar");
        std::fs::write(&jar, b"PK").unwrap();

        let resolver = LocalRepositoryResolver::new(dir.path().join("repo"));
        let artifact = ArtifactRef::new("org.example", "hello", "1.0").with_file(&jar);

        assert_eq!(resolver.resolve(&artifact).unwrap(), jar);
    }

    #[test]
    fn test_repository_layout() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = LocalRepositoryResolver::new(dir.path());
        let artifact = ArtifactRef::new("org.example.web", "hello", "1.0");

        let expected = dir
            .path()
            .join("org/example/web/hello/1.0/hello-1.0.jar");
        assert_eq!(resolver.layout_path(&artifact), expected);

        std::fs::create_dir_all(expected.parent().unwrap()).unwrap();
        std::fs::write(&expected, b"PK").unwrap();
        assert_eq!(resolver.resolve(&artifact).unwrap(), expected);
    }

    #[test]
    fn test_missing_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = LocalRepositoryResolver::new(dir.path());
        let artifact = ArtifactRef::new("org.example", "missing", "1.0")
            .with_file(dir.path().join("nope.jar"));

        let err = resolver.resolve(&artifact).unwrap_err();
        assert!(err.is_plugin_scoped());
        assert!(matches!(
            err,
            Error::UnresolvedArtifact { ref artifact, .. }
                if artifact.starts_with("org.example:missing:1.0 (looked in ")
        ));
    }

    #[test]
    fn test_incomplete_coordinates() {
        let resolver = LocalRepositoryResolver::new("/repo");
        let artifact = ArtifactRef::new("org.example", "", "");
        assert!(matches!(
            resolver.resolve(&artifact),
            Err(Error::UnresolvedArtifact { .. })
        ));
    }
}

/// 파일 시스템 없이 좌표 문자열을 경로로 돌려주는 테스트용 해석기
#[cfg(test)]
pub(crate) struct AnyPath;

#[cfg(test)]
impl ArtifactResolver for AnyPath {
    fn resolve(&self, artifact: &ArtifactRef) -> Result<PathBuf> {
        Ok(PathBuf::from(artifact.coordinates()))
    }
}
