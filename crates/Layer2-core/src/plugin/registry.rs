//! Plugin Registry - 로드된 플러그인 토폴로지
//!
//! [`Topology`] 는 특정 시점의 불변 스냅샷이다. 런타임은 리로드마다 새
//! 스냅샷을 만들어 원자적으로 교체하므로 조회 쪽은 락 없이 일관된 집합을 본다.

use super::context::PluginContext;
use super::descriptor::PluginDescriptor;
use super::traits::{Capabilities, Plugin};
use crate::artifact::ArtifactKey;
use plexus_foundation::{Error, Result};
use std::collections::HashMap;
use std::sync::Arc;

/// 로드된 플러그인 하나
pub struct LoadedPlugin {
    pub descriptor: PluginDescriptor,
    pub context: Arc<PluginContext>,
    pub instance: Arc<dyn Plugin>,
    pub capabilities: Capabilities,
}

impl LoadedPlugin {
    pub fn key(&self) -> ArtifactKey {
        self.descriptor.key()
    }
}

impl std::fmt::Debug for LoadedPlugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedPlugin")
            .field("plugin", &self.descriptor.coordinates())
            .field("context", &self.context.id())
            .field("capabilities", &self.capabilities)
            .finish()
    }
}

/// 배포 순서대로 정렬된 로드된 플러그인 집합
#[derive(Debug, Default)]
pub struct Topology {
    plugins: Vec<Arc<LoadedPlugin>>,
    index: HashMap<ArtifactKey, usize>,
    generation: u64,
}

impl Topology {
    pub(crate) fn new(plugins: Vec<Arc<LoadedPlugin>>, generation: u64) -> Self {
        let index = plugins
            .iter()
            .enumerate()
            .map(|(i, p)| (p.key(), i))
            .collect();
        Self {
            plugins,
            index,
            generation,
        }
    }

    /// 로드/리로드 횟수. 아무것도 로드되지 않았으면 0.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// 배포 순서의 identity 목록
    pub fn keys(&self) -> Vec<ArtifactKey> {
        self.plugins.iter().map(|p| p.key()).collect()
    }

    pub fn contains(&self, key: &ArtifactKey) -> bool {
        self.index.contains_key(key)
    }

    pub fn get(&self, key: &ArtifactKey) -> Option<&Arc<LoadedPlugin>> {
        self.index.get(key).map(|&i| &self.plugins[i])
    }

    /// 플러그인의 격리된 컨텍스트
    pub fn context(&self, key: &ArtifactKey) -> Result<Arc<PluginContext>> {
        self.get(key)
            .map(|p| Arc::clone(&p.context))
            .ok_or_else(|| Error::NotFound(format!("Plugin {} is not loaded", key)))
    }

    /// 배포 순서. 해제는 `.rev()` 로 역순
    pub fn iter(&self) -> std::slice::Iter<'_, Arc<LoadedPlugin>> {
        self.plugins.iter()
    }

    /// 해당 capability 를 제공하는 모든 플러그인의 구현, 배포 순서
    pub fn query<T>(&self) -> Vec<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.plugins
            .iter()
            .flat_map(|p| p.capabilities.get::<T>())
            .collect()
    }

    /// [`query`](Self::query) + 제공한 플러그인의 컨텍스트
    pub fn query_with_context<T>(&self) -> Vec<(Arc<PluginContext>, Arc<T>)>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.plugins
            .iter()
            .flat_map(|p| {
                p.capabilities
                    .get::<T>()
                    .into_iter()
                    .map(move |cap| (Arc::clone(&p.context), cap))
            })
            .collect()
    }
}
