//! Plugin Context - 플러그인 하나에 대한 격리된 로딩 컨텍스트
//!
//! 컨텍스트는 플러그인 자신의 `compile` + `runtime` 클래스패스만 본다.
//! `test` scope 는 포함되지 않는다. 생성 후에는 변경되지 않으며 마지막
//! `Arc` 가 사라질 때 해제된다.

use super::descriptor::{PluginDescriptor, Scope};
use crate::artifact::{ArtifactKey, ArtifactRef, ArtifactResolver};
use chrono::{DateTime, Utc};
use plexus_foundation::{Error, Result};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

/// 컨텍스트 고유 ID (리로드로 재생성되면 바뀐다)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(Uuid);

impl ContextId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ContextId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 격리된 플러그인 컨텍스트
#[derive(Debug)]
pub struct PluginContext {
    id: ContextId,
    descriptor: PluginDescriptor,
    classpath: Vec<PathBuf>,
    config: HashMap<String, String>,
    created_at: DateTime<Utc>,
}

impl PluginContext {
    pub fn id(&self) -> ContextId {
        self.id
    }

    pub fn descriptor(&self) -> &PluginDescriptor {
        &self.descriptor
    }

    pub fn key(&self) -> ArtifactKey {
        self.descriptor.key()
    }

    pub fn coordinates(&self) -> String {
        self.descriptor.coordinates()
    }

    /// 해석된 클래스패스 (소스 디렉토리 → compile → runtime, 경로 중복 제거)
    pub fn classpath(&self) -> &[PathBuf] {
        &self.classpath
    }

    pub fn config(&self) -> &HashMap<String, String> {
        &self.config
    }

    pub fn config_value(&self, key: &str) -> Option<&str> {
        self.config.get(key).map(String::as_str)
    }

    pub fn source_directory(&self) -> Option<&Path> {
        self.descriptor.source_directory()
    }

    pub fn is_development_mode(&self) -> bool {
        self.descriptor.is_development_mode()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl fmt::Display for PluginContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "context {} [{}]", self.coordinates(), self.id)
    }
}

// ============================================================================
// ContextBuilder
// ============================================================================

/// 디스크립터 → 격리된 컨텍스트
pub struct ContextBuilder<'a> {
    resolver: &'a dyn ArtifactResolver,
}

impl<'a> ContextBuilder<'a> {
    pub fn new(resolver: &'a dyn ArtifactResolver) -> Self {
        Self { resolver }
    }

    /// 컨텍스트 생성
    ///
    /// 클래스패스 순서: 플러그인 자신(개발 모드면 소스 디렉토리), compile, runtime.
    /// 해석 실패는 `UnresolvedArtifact`, 소스 디렉토리가 없으면
    /// `ContextCreation` 으로 보고된다. 둘 다 플러그인 단위 에러다.
    /// 해석기의 다른 에러는 그대로 전파된다.
    pub fn build(&self, descriptor: &PluginDescriptor) -> Result<PluginContext> {
        let plugin = descriptor.coordinates();
        let mut classpath = Vec::new();
        let mut seen = HashSet::new();

        match descriptor.source_directory() {
            Some(source_dir) if !source_dir.is_dir() => {
                return Err(Error::context_creation(
                    &plugin,
                    format!("source directory {} does not exist", source_dir.display()),
                ));
            }
            Some(source_dir) => push_unique(&mut classpath, &mut seen, source_dir.to_path_buf()),
            None => {
                let own = self.resolve(&plugin, descriptor.artifact())?;
                push_unique(&mut classpath, &mut seen, own);
            }
        }

        for scope in [Scope::Compile, Scope::Runtime] {
            for artifact in descriptor.classpath(scope) {
                let path = self.resolve(&plugin, artifact)?;
                push_unique(&mut classpath, &mut seen, path);
            }
        }

        let context = PluginContext {
            id: ContextId::new(),
            descriptor: descriptor.clone(),
            classpath,
            config: descriptor.config(),
            created_at: Utc::now(),
        };

        debug!(
            "Built {} with {} classpath entries",
            context,
            context.classpath.len()
        );
        Ok(context)
    }
}

impl ContextBuilder<'_> {
    fn resolve(&self, plugin: &str, artifact: &ArtifactRef) -> Result<PathBuf> {
        self.resolver.resolve(artifact).map_err(|e| match e {
            Error::UnresolvedArtifact { artifact, .. } => Error::unresolved(plugin, artifact),
            other => other,
        })
    }
}

fn push_unique(classpath: &mut Vec<PathBuf>, seen: &mut HashSet<PathBuf>, path: PathBuf) {
    if seen.insert(path.clone()) {
        classpath.push(path);
    }
}
