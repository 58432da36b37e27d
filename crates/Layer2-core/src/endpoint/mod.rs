//! Endpoint - 플러그인이 선언한 서비스 엔드포인트 게시
//!
//! [`EndpointPublisher`] 는 런타임 리스너다. 이벤트마다 이전에 게시한
//! 엔드포인트를 모두 내리고, 정의 캐시를 비운 뒤, 현재 토폴로지의
//! [`EndpointProvider`] 들을 배포 순서대로 다시 게시한다.
//!
//! 게시할 때는 제공한 플러그인의 컨텍스트를 [`EndpointHost::publish`] 에
//! 명시적으로 넘긴다.

use crate::artifact::ArtifactKey;
use crate::plugin::{ContextId, PluginContext, RuntimeListener, Topology};
use parking_lot::Mutex;
use plexus_foundation::{ClearableCache, Error, Result, SharedCache};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

// ============================================================================
// Capabilities
// ============================================================================

/// 게시할 엔드포인트 하나
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EndpointConfiguration {
    pub path: String,
    pub implementor: String,
}

impl EndpointConfiguration {
    pub fn new(path: impl Into<String>, implementor: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            implementor: implementor.into(),
        }
    }
}

/// 엔드포인트를 선언하는 플러그인 capability
pub trait EndpointProvider: Send + Sync {
    fn endpoint_configurations(&self) -> Vec<EndpointConfiguration>;
}

/// 게시된 엔드포인트를 수정하는 플러그인 capability
pub trait EndpointCustomizer: Send + Sync {
    fn customize(&self, endpoint: &mut PublishedEndpoint);
}

/// 게시된 엔드포인트
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishedEndpoint {
    pub path: String,
    pub implementor: String,
    /// 제공한 플러그인
    pub plugin: ArtifactKey,
    #[serde(skip)]
    pub context_id: ContextId,
    /// 커스터마이저가 붙인 기능
    pub features: Vec<String>,
}

// ============================================================================
// EndpointHost
// ============================================================================

/// 실제 프로토콜 프레임워크와의 경계
pub trait EndpointHost: Send + Sync {
    fn publish(&self, ctx: &PluginContext, config: &EndpointConfiguration) -> Result<PublishedEndpoint>;

    fn stop(&self, endpoint: &PublishedEndpoint) -> Result<()>;
}

/// 게시 기록만 하는 호스트
#[derive(Debug, Default)]
pub struct InMemoryEndpointHost {
    active: Mutex<Vec<PublishedEndpoint>>,
}

impl InMemoryEndpointHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// 현재 게시 중인 엔드포인트
    pub fn active(&self) -> Vec<PublishedEndpoint> {
        self.active.lock().clone()
    }
}

impl EndpointHost for InMemoryEndpointHost {
    fn publish(&self, ctx: &PluginContext, config: &EndpointConfiguration) -> Result<PublishedEndpoint> {
        if config.path.is_empty() {
            return Err(Error::InvalidInput(format!(
                "Endpoint without path from {}",
                ctx.coordinates()
            )));
        }

        let mut active = self.active.lock();
        if let Some(existing) = active.iter().find(|e| e.path == config.path) {
            return Err(Error::InvalidInput(format!(
                "Path {} is already published by {}",
                config.path, existing.plugin
            )));
        }

        let endpoint = PublishedEndpoint {
            path: config.path.clone(),
            implementor: config.implementor.clone(),
            plugin: ctx.key(),
            context_id: ctx.id(),
            features: Vec::new(),
        };
        active.push(endpoint.clone());
        Ok(endpoint)
    }

    fn stop(&self, endpoint: &PublishedEndpoint) -> Result<()> {
        let mut active = self.active.lock();
        let before = active.len();
        active.retain(|e| !(e.path == endpoint.path && e.context_id == endpoint.context_id));
        if active.len() == before {
            return Err(Error::NotFound(format!("Endpoint {}", endpoint.path)));
        }
        Ok(())
    }
}

// ============================================================================
// EndpointPublisher
// ============================================================================

/// 게시된 엔드포인트의 정의 (경로 → 제공 플러그인 컨텍스트)
///
/// 컨텍스트를 붙잡고 있으므로 리로드 때마다 비워져야 한다.
#[derive(Debug)]
pub struct EndpointDefinition {
    pub path: String,
    pub implementor: String,
    pub context: Arc<PluginContext>,
}

/// 토폴로지가 바뀔 때마다 엔드포인트를 다시 게시하는 리스너
pub struct EndpointPublisher {
    host: Arc<dyn EndpointHost>,
    definitions: Arc<SharedCache<Arc<EndpointDefinition>>>,
    published: Mutex<Vec<PublishedEndpoint>>,
}

impl EndpointPublisher {
    pub fn new(host: Arc<dyn EndpointHost>, cache_capacity: usize) -> Self {
        Self {
            host,
            definitions: SharedCache::shared("endpoint-definitions", cache_capacity),
            published: Mutex::new(Vec::new()),
        }
    }

    /// 런타임에 등록할 정의 캐시
    pub fn definitions(&self) -> Arc<SharedCache<Arc<EndpointDefinition>>> {
        Arc::clone(&self.definitions)
    }

    pub fn definition(&self, path: &str) -> Option<Arc<EndpointDefinition>> {
        self.definitions.get(path)
    }

    pub fn published(&self) -> Vec<PublishedEndpoint> {
        self.published.lock().clone()
    }

    fn deploy(&self, topology: &Topology) -> Result<()> {
        let mut published = self.published.lock();
        let mut errors = Vec::new();

        for endpoint in published.drain(..) {
            if let Err(e) = self.host.stop(&endpoint) {
                warn!("Failed to stop endpoint {}: {}", endpoint.path, e);
                errors.push(format!("stop {}: {}", endpoint.path, e));
            }
        }
        self.definitions.clear();

        let customizers = topology.query::<dyn EndpointCustomizer>();

        for (ctx, provider) in topology.query_with_context::<dyn EndpointProvider>() {
            for config in provider.endpoint_configurations() {
                match self.host.publish(&ctx, &config) {
                    Ok(mut endpoint) => {
                        for customizer in &customizers {
                            customizer.customize(&mut endpoint);
                        }
                        self.definitions.insert(
                            config.path.clone(),
                            Arc::new(EndpointDefinition {
                                path: config.path.clone(),
                                implementor: config.implementor.clone(),
                                context: Arc::clone(&ctx),
                            }),
                        );
                        debug!("Published {} from {}", endpoint.path, ctx.coordinates());
                        published.push(endpoint);
                    }
                    Err(e) => {
                        warn!("Failed to publish {} from {}: {}", config.path, ctx.coordinates(), e);
                        errors.push(format!("publish {}: {}", config.path, e));
                    }
                }
            }
        }

        info!(
            "Published {} endpoints (generation {})",
            published.len(),
            topology.generation()
        );

        if errors.is_empty() {
            Ok(())
        } else {
            Err(Error::listener(self.name(), errors.join("; ")))
        }
    }
}

impl RuntimeListener for EndpointPublisher {
    fn name(&self) -> &str {
        "endpoint-publisher"
    }

    fn runtime_started(&self, topology: &Topology) -> Result<()> {
        self.deploy(topology)
    }

    fn topology_changed(&self, topology: &Topology) -> Result<()> {
        self.deploy(topology)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::{AnyPath, ArtifactRef};
    use crate::plugin::{
        Capabilities, EntryPointRegistry, Plugin, PluginDescriptor, PluginRuntime, RuntimeConfig,
    };

    struct Service {
        paths: Vec<String>,
    }

    impl EndpointProvider for Service {
        fn endpoint_configurations(&self) -> Vec<EndpointConfiguration> {
            self.paths
                .iter()
                .map(|p| EndpointConfiguration::new(p.clone(), "HelloService"))
                .collect()
        }
    }

    impl Plugin for Service {
        fn capabilities(self: Arc<Self>, caps: &mut Capabilities) {
            caps.provide::<dyn EndpointProvider>(self);
        }
    }

    struct Logging;

    impl EndpointCustomizer for Logging {
        fn customize(&self, endpoint: &mut PublishedEndpoint) {
            endpoint.features.push("logging".to_string());
        }
    }

    impl Plugin for Logging {
        fn capabilities(self: Arc<Self>, caps: &mut Capabilities) {
            caps.provide::<dyn EndpointCustomizer>(self);
        }
    }

    /// `paths` config 값(콤마 구분)으로 Service 를 만들고, "logging" 은 Logging
    fn runtime() -> PluginRuntime {
        let loader = EntryPointRegistry::new().with_fallback(|ctx| {
            if ctx.descriptor().artifact_id() == "logging" {
                return Ok(Arc::new(Logging) as Arc<dyn Plugin>);
            }
            let paths = ctx
                .config_value("paths")
                .unwrap_or("")
                .split(',')
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect();
            Ok(Arc::new(Service { paths }) as Arc<dyn Plugin>)
        });
        PluginRuntime::new(
            Arc::new(AnyPath),
            Arc::new(loader),
            RuntimeConfig::default(),
        )
    }

    fn service(name: &str, paths: &str) -> PluginDescriptor {
        let mut d = PluginDescriptor::new(ArtifactRef::new("org.example", name, "1.0"));
        d.set_config(&[("paths".to_string(), paths.to_string())].into_iter().collect());
        d
    }

    fn logging() -> PluginDescriptor {
        PluginDescriptor::new(ArtifactRef::new("org.example", "logging", "1.0"))
    }

    #[test]
    fn test_publish_with_provider_context_and_customizers() {
        let host = Arc::new(InMemoryEndpointHost::new());
        let publisher = Arc::new(EndpointPublisher::new(host.clone(), 16));
        let rt = runtime();
        rt.add_listener(publisher.clone());

        let report = rt.load(&[service("hello", "/ws/hello"), logging()]).unwrap();
        assert!(report.is_clean());

        let published = publisher.published();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].plugin, ArtifactKey::new("org.example", "hello"));
        assert_eq!(published[0].features, vec!["logging"]);

        let hello_ctx = rt.context(&ArtifactKey::new("org.example", "hello")).unwrap();
        assert_eq!(published[0].context_id, hello_ctx.id());
        let definition = publisher.definition("/ws/hello").unwrap();
        assert!(Arc::ptr_eq(&definition.context, &hello_ctx));
    }

    #[test]
    fn test_republish_is_idempotent() {
        let host = Arc::new(InMemoryEndpointHost::new());
        let publisher = Arc::new(EndpointPublisher::new(host.clone(), 16));
        let rt = runtime();
        rt.add_listener(publisher.clone());

        let plugins = [service("hello", "/ws/hello,/ws/echo"), logging()];
        rt.load(&plugins).unwrap();
        let first = host.active();

        let report = rt.reload(&plugins).unwrap();
        assert!(report.listener_failures.is_empty());

        let paths = |list: Vec<PublishedEndpoint>| list.into_iter().map(|e| e.path).collect::<Vec<_>>();
        assert_eq!(paths(host.active()), paths(first));
        assert_eq!(publisher.definitions().len(), 2);
    }

    #[test]
    fn test_duplicate_path_is_reported_as_listener_failure() {
        let host = Arc::new(InMemoryEndpointHost::new());
        let publisher = Arc::new(EndpointPublisher::new(host.clone(), 16));
        let rt = runtime();
        rt.add_listener(publisher.clone());

        let report = rt
            .load(&[service("a", "/ws/same"), service("b", "/ws/same")])
            .unwrap();

        assert_eq!(report.listener_failures.len(), 1);
        assert_eq!(report.listener_failures[0].listener, "endpoint-publisher");
        assert_eq!(host.active().len(), 1);
        assert_eq!(host.active()[0].plugin, ArtifactKey::new("org.example", "a"));
    }

    #[test]
    fn test_in_memory_host_stop() {
        let host = InMemoryEndpointHost::new();
        let resolver = AnyPath;
        let ctx = crate::plugin::ContextBuilder::new(&resolver)
            .build(&service("hello", ""))
            .unwrap();

        let endpoint = host
            .publish(&ctx, &EndpointConfiguration::new("/ws/hello", "Hello"))
            .unwrap();
        assert!(host.stop(&endpoint).is_ok());
        assert!(matches!(host.stop(&endpoint), Err(Error::NotFound(_))));
        assert!(host
            .publish(&ctx, &EndpointConfiguration::new("", "Hello"))
            .is_err());
    }
}
