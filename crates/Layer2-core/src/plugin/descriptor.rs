//! Plugin Descriptor - 매니페스트에서 읽은 플러그인 메타데이터

use crate::artifact::{same_refs, ArtifactKey, ArtifactRef};
use plexus_foundation::Error;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// 개발용 플러그인 identity (소스 디렉토리 기반 리로드를 담당)
pub const DEVELOPMENT_PLUGIN_GROUP: &str = "org.plexus";
pub const DEVELOPMENT_PLUGIN_ARTIFACT: &str = "plexus-development-plugin";

// ============================================================================
// Scope - 클래스패스 범위
// ============================================================================

/// 클래스패스 범위
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Test,
    Runtime,
    Compile,
}

impl Scope {
    /// 매니페스트에서 읽는 순서
    pub const ALL: [Scope; 3] = [Scope::Test, Scope::Runtime, Scope::Compile];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Test => "test",
            Self::Runtime => "runtime",
            Self::Compile => "compile",
        }
    }
}

impl AsRef<str> for Scope {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scope {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "test" => Ok(Self::Test),
            "runtime" => Ok(Self::Runtime),
            "compile" => Ok(Self::Compile),
            other => Err(Error::InvalidInput(format!("Unknown scope: {}", other))),
        }
    }
}

// ============================================================================
// PluginDescriptor
// ============================================================================

/// 플러그인 디스크립터
///
/// 파싱 시 한 번 만들어진 뒤에는 값 객체로 취급된다. 리로드는 기존
/// 디스크립터를 수정하지 않고 새 인스턴스를 만든다.
///
/// identity(`PartialEq`/`Hash`)는 [`ArtifactRef`] 와 같이 `groupId:artifactId`
/// 기준이다. 내용 비교는 [`PluginDescriptor::same_content`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginDescriptor {
    #[serde(flatten)]
    artifact: ArtifactRef,

    /// scope 이름 → 아티팩트 목록
    classpaths: BTreeMap<String, Vec<ArtifactRef>>,

    /// 배포 순서 계산에만 쓰이는 명시적 의존성
    depends_on: Vec<ArtifactRef>,

    #[serde(skip_serializing_if = "Option::is_none")]
    source_directory: Option<PathBuf>,

    direct_deploy: bool,

    config: HashMap<String, String>,
}

impl PluginDescriptor {
    pub fn new(artifact: ArtifactRef) -> Self {
        Self {
            artifact,
            classpaths: BTreeMap::new(),
            depends_on: Vec::new(),
            source_directory: None,
            direct_deploy: true,
            config: HashMap::new(),
        }
    }

    // ========================================================================
    // Identity
    // ========================================================================

    pub fn artifact(&self) -> &ArtifactRef {
        &self.artifact
    }

    pub fn group_id(&self) -> &str {
        self.artifact.group_id()
    }

    pub fn artifact_id(&self) -> &str {
        self.artifact.artifact_id()
    }

    pub fn version(&self) -> &str {
        self.artifact.version()
    }

    /// 패키징된 플러그인 파일
    pub fn file(&self) -> Option<&Path> {
        self.artifact.file()
    }

    pub fn key(&self) -> ArtifactKey {
        self.artifact.key()
    }

    pub fn coordinates(&self) -> String {
        self.artifact.coordinates()
    }

    pub fn is_development_plugin(&self) -> bool {
        self.group_id() == DEVELOPMENT_PLUGIN_GROUP
            && self.artifact_id() == DEVELOPMENT_PLUGIN_ARTIFACT
    }

    // ========================================================================
    // Classpath
    // ========================================================================

    /// scope 의 클래스패스. 선언되지 않은 scope 는 빈 목록.
    pub fn classpath(&self, scope: impl AsRef<str>) -> &[ArtifactRef] {
        self.classpaths
            .get(scope.as_ref())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// 수정용 접근. 없으면 빈 목록을 만들어 반환.
    pub fn classpath_mut(&mut self, scope: impl AsRef<str>) -> &mut Vec<ArtifactRef> {
        self.classpaths
            .entry(scope.as_ref().to_string())
            .or_default()
    }

    pub fn add_classpath_entry(&mut self, scope: impl AsRef<str>, artifact: ArtifactRef) {
        self.classpath_mut(scope).push(artifact);
    }

    /// scope 의 아티팩트 중 파일이 있는 것들
    pub fn classpath_files(&self, scope: impl AsRef<str>) -> Vec<PathBuf> {
        self.classpath(scope)
            .iter()
            .filter_map(|a| a.file().map(Path::to_path_buf))
            .collect()
    }

    /// 선언된 scope 이름들
    pub fn scopes(&self) -> impl Iterator<Item = &str> {
        self.classpaths.keys().map(String::as_str)
    }

    // ========================================================================
    // Dependencies
    // ========================================================================

    pub fn depends_on(&self) -> &[ArtifactRef] {
        &self.depends_on
    }

    pub fn add_depends_on(&mut self, artifact: ArtifactRef) {
        self.depends_on.push(artifact);
    }

    // ========================================================================
    // 배포 옵션
    // ========================================================================

    pub fn source_directory(&self) -> Option<&Path> {
        self.source_directory.as_deref()
    }

    pub fn set_source_directory(&mut self, dir: Option<PathBuf>) {
        self.source_directory = dir;
    }

    /// 소스 디렉토리가 있으면 개발 모드 (패키지 대신 파일에서 로드)
    pub fn is_development_mode(&self) -> bool {
        self.source_directory.is_some()
    }

    pub fn is_direct_deploy(&self) -> bool {
        self.direct_deploy
    }

    pub fn set_direct_deploy(&mut self, direct_deploy: bool) {
        self.direct_deploy = direct_deploy;
    }

    // ========================================================================
    // Config (항상 복사본으로 주고받음)
    // ========================================================================

    pub fn config(&self) -> HashMap<String, String> {
        self.config.clone()
    }

    pub fn set_config(&mut self, config: &HashMap<String, String>) {
        self.config = config.clone();
    }

    pub fn config_value(&self, key: &str) -> Option<&str> {
        self.config.get(key).map(String::as_str)
    }

    // ========================================================================
    // 비교
    // ========================================================================

    /// 버전, 파일, 클래스패스, 설정까지 모두 같은지 (리로드 시 변경 감지용)
    pub fn same_content(&self, other: &PluginDescriptor) -> bool {
        if !self.artifact.same_coordinates(&other.artifact)
            || self.source_directory != other.source_directory
            || self.direct_deploy != other.direct_deploy
            || self.config != other.config
            || !same_refs(&self.depends_on, &other.depends_on)
        {
            return false;
        }

        // 빈 scope 와 선언되지 않은 scope 는 같은 것으로 본다
        self.scopes()
            .chain(other.scopes())
            .all(|scope| same_refs(self.classpath(scope), other.classpath(scope)))
    }
}

impl PartialEq for PluginDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.artifact == other.artifact
    }
}

impl Eq for PluginDescriptor {}

impl Hash for PluginDescriptor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.artifact.hash(state);
    }
}

impl fmt::Display for PluginDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Plugin {}", self.coordinates())
    }
}
