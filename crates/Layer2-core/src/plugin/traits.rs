//! Plugin traits - 핵심 플러그인 인터페이스
//!
//! - [`Plugin`]: 격리된 컨텍스트 안에서 만들어지는 플러그인 인스턴스
//! - [`Capabilities`]: 플러그인이 노출하는 타입별 capability 모음
//! - [`PluginLoader`]: 컨텍스트 → 플러그인 인스턴스

use super::context::PluginContext;
use crate::artifact::ArtifactKey;
use parking_lot::RwLock;
use plexus_foundation::{Error, Result};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

// ============================================================================
// Capabilities - 타입별 capability 저장소
// ============================================================================

/// 플러그인 하나가 제공하는 capability 모음
///
/// `dyn Trait` 단위로 저장되며 같은 타입을 여러 개 제공할 수 있다.
///
/// ```ignore
/// caps.provide::<dyn EndpointProvider>(self.clone());
/// let providers: Vec<Arc<dyn EndpointProvider>> = caps.get::<dyn EndpointProvider>();
/// ```
#[derive(Default)]
pub struct Capabilities {
    entries: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
    names: Vec<&'static str>,
}

impl Capabilities {
    pub fn new() -> Self {
        Self::default()
    }

    /// capability 등록
    pub fn provide<T>(&mut self, capability: Arc<T>)
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let slot = self
            .entries
            .entry(TypeId::of::<Vec<Arc<T>>>())
            .or_insert_with(|| Box::new(Vec::<Arc<T>>::new()));

        if let Some(list) = slot.downcast_mut::<Vec<Arc<T>>>() {
            list.push(capability);
        }

        let name = std::any::type_name::<T>();
        if !self.names.contains(&name) {
            self.names.push(name);
        }
    }

    /// 등록된 순서대로 해당 타입의 capability 반환
    pub fn get<T>(&self) -> Vec<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.entries
            .get(&TypeId::of::<Vec<Arc<T>>>())
            .and_then(|slot| slot.downcast_ref::<Vec<Arc<T>>>())
            .cloned()
            .unwrap_or_default()
    }

    pub fn has<T>(&self) -> bool
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.entries.contains_key(&TypeId::of::<Vec<Arc<T>>>())
    }

    /// 제공된 capability 타입 이름 (진단용)
    pub fn names(&self) -> &[&'static str] {
        &self.names
    }

    /// 제공된 capability 타입 수
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names.iter()).finish()
    }
}

// ============================================================================
// Plugin Trait
// ============================================================================

/// 플러그인 트레이트
///
/// 인스턴스는 [`PluginLoader`] 가 플러그인 자신의 컨텍스트 안에서 만든다.
pub trait Plugin: Send + Sync {
    /// 플러그인이 노출하는 capability 등록
    ///
    /// 자기 자신을 capability 로 노출할 수 있도록 `Arc<Self>` 로 받는다.
    fn capabilities(self: Arc<Self>, _caps: &mut Capabilities) {}

    /// 컨텍스트가 해제되기 직전에 호출
    fn on_unload(&self, _ctx: &PluginContext) -> Result<()> {
        Ok(())
    }
}

// ============================================================================
// PluginLoader
// ============================================================================

/// 컨텍스트 안에서 플러그인 진입점을 인스턴스화
pub trait PluginLoader: Send + Sync {
    fn instantiate(&self, ctx: &Arc<PluginContext>) -> Result<Arc<dyn Plugin>>;
}

/// 플러그인 생성 함수
pub type EntryPoint = Arc<dyn Fn(&Arc<PluginContext>) -> Result<Arc<dyn Plugin>> + Send + Sync>;

/// 정적으로 링크된 플러그인 진입점 레지스트리
///
/// identity 로 생성 함수를 찾는다. 등록되지 않은 identity 는 fallback 이
/// 있으면 fallback 으로, 없으면 `ContextCreation` 에러.
#[derive(Default)]
pub struct EntryPointRegistry {
    entries: RwLock<HashMap<ArtifactKey, EntryPoint>>,
    fallback: Option<EntryPoint>,
}

impl EntryPointRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 빌더 패턴: 등록되지 않은 identity 에 쓸 진입점
    pub fn with_fallback<F>(mut self, entry: F) -> Self
    where
        F: Fn(&Arc<PluginContext>) -> Result<Arc<dyn Plugin>> + Send + Sync + 'static,
    {
        self.fallback = Some(Arc::new(entry));
        self
    }

    /// 진입점 등록 (같은 identity 는 교체)
    pub fn register<F>(&self, key: ArtifactKey, entry: F)
    where
        F: Fn(&Arc<PluginContext>) -> Result<Arc<dyn Plugin>> + Send + Sync + 'static,
    {
        debug!("Registered entry point for {}", key);
        self.entries.write().insert(key, Arc::new(entry));
    }

    pub fn unregister(&self, key: &ArtifactKey) -> bool {
        self.entries.write().remove(key).is_some()
    }

    pub fn contains(&self, key: &ArtifactKey) -> bool {
        self.entries.read().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl PluginLoader for EntryPointRegistry {
    fn instantiate(&self, ctx: &Arc<PluginContext>) -> Result<Arc<dyn Plugin>> {
        let entry = self
            .entries
            .read()
            .get(&ctx.key())
            .cloned()
            .or_else(|| self.fallback.clone())
            .ok_or_else(|| {
                Error::context_creation(ctx.coordinates(), "no entry point registered")
            })?;

        entry(ctx).map_err(|e| {
            if e.is_plugin_scoped() {
                e
            } else {
                Error::context_creation(ctx.coordinates(), e.to_string())
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::{AnyPath, ArtifactRef};
    use crate::plugin::context::ContextBuilder;
    use crate::plugin::descriptor::PluginDescriptor;

    trait Greeter: Send + Sync {
        fn greet(&self) -> String;
    }

    struct Hello;

    impl Greeter for Hello {
        fn greet(&self) -> String {
            "hello".to_string()
        }
    }

    impl Plugin for Hello {
        fn capabilities(self: Arc<Self>, caps: &mut Capabilities) {
            caps.provide::<dyn Greeter>(self);
        }
    }

    fn context(artifact: &str) -> Arc<PluginContext> {
        let resolver = AnyPath;
        let descriptor = PluginDescriptor::new(ArtifactRef::new("org.example", artifact, "1.0"));
        Arc::new(ContextBuilder::new(&resolver).build(&descriptor).unwrap())
    }

    #[test]
    fn test_capabilities_by_type() {
        let mut caps = Capabilities::new();
        Arc::new(Hello).capabilities(&mut caps);
        caps.provide::<dyn Greeter>(Arc::new(Hello));

        let greeters = caps.get::<dyn Greeter>();
        assert_eq!(greeters.len(), 2);
        assert_eq!(greeters[0].greet(), "hello");
        assert!(caps.has::<dyn Greeter>());
        assert!(!caps.has::<dyn Plugin>());
        assert!(caps.get::<dyn Plugin>().is_empty());
        assert_eq!(caps.len(), 1);
    }

    #[test]
    fn test_entry_point_lookup() {
        let registry = EntryPointRegistry::new();
        registry.register(ArtifactKey::new("org.example", "hello"), |_ctx| {
            Ok(Arc::new(Hello) as Arc<dyn Plugin>)
        });

        assert!(registry.instantiate(&context("hello")).is_ok());

        let err = registry.instantiate(&context("unknown")).err().unwrap();
        assert!(matches!(err, Error::ContextCreation { .. }));
    }

    #[test]
    fn test_fallback_entry_point() {
        let registry = EntryPointRegistry::new()
            .with_fallback(|_ctx| Ok(Arc::new(Hello) as Arc<dyn Plugin>));
        assert!(registry.instantiate(&context("anything")).is_ok());
    }

    #[test]
    fn test_constructor_error_becomes_context_creation() {
        let registry = EntryPointRegistry::new();
        registry.register(ArtifactKey::new("org.example", "broken"), |_ctx| {
            Err(Error::Internal("corrupt entry point".into()))
        });

        let err = registry.instantiate(&context("broken")).err().unwrap();
        assert!(err.is_plugin_scoped());
        assert!(err.to_string().contains("corrupt entry point"));
    }
}
