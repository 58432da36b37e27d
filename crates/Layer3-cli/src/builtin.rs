//! Built-in plugin loader for the `run` host
//!
//! 호스트 바이너리에는 네이티브 플러그인이 링크되어 있지 않으므로 모든
//! 플러그인은 설정만으로 동작하는 [`ConfiguredPlugin`] 으로 만들어진다.
//!
//! ```xml
//! <config>
//!   <prop name="endpoint./ws/hello" value="HelloService"/>
//! </config>
//! ```

use plexus_core::{
    Capabilities, EndpointConfiguration, EndpointProvider, EntryPointRegistry, Plugin,
    PluginContext, Result,
};
use std::sync::Arc;
use tracing::debug;

/// `endpoint.<path>` = `<implementor>`
pub const ENDPOINT_PREFIX: &str = "endpoint.";

/// 설정 기반 플러그인
pub struct ConfiguredPlugin {
    coordinates: String,
    endpoints: Vec<EndpointConfiguration>,
}

impl ConfiguredPlugin {
    pub fn from_context(ctx: &PluginContext) -> Self {
        let mut endpoints: Vec<_> = ctx
            .config()
            .iter()
            .filter_map(|(key, value)| {
                key.strip_prefix(ENDPOINT_PREFIX)
                    .filter(|path| !path.is_empty())
                    .map(|path| EndpointConfiguration::new(path, value.clone()))
            })
            .collect();
        endpoints.sort_by(|a, b| a.path.cmp(&b.path));

        Self {
            coordinates: ctx.coordinates(),
            endpoints,
        }
    }
}

impl EndpointProvider for ConfiguredPlugin {
    fn endpoint_configurations(&self) -> Vec<EndpointConfiguration> {
        self.endpoints.clone()
    }
}

impl Plugin for ConfiguredPlugin {
    fn capabilities(self: Arc<Self>, caps: &mut Capabilities) {
        if !self.endpoints.is_empty() {
            caps.provide::<dyn EndpointProvider>(self);
        }
    }

    fn on_unload(&self, ctx: &PluginContext) -> Result<()> {
        debug!("Unloading {} ({})", self.coordinates, ctx.id());
        Ok(())
    }
}

/// 모든 identity 를 [`ConfiguredPlugin`] 으로 만드는 로더
pub fn loader() -> EntryPointRegistry {
    EntryPointRegistry::new().with_fallback(|ctx| {
        Ok(Arc::new(ConfiguredPlugin::from_context(ctx)) as Arc<dyn Plugin>)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use plexus_core::{
        ArtifactRef, ContextBuilder, LocalRepositoryResolver, PluginDescriptor, PluginLoader,
    };
    use std::collections::HashMap;

    fn context(config: &[(&str, &str)]) -> Arc<PluginContext> {
        let dir = tempfile::tempdir().unwrap();
        let jar = dir.path().join("hello-1.0.jar");
        std::fs::write(&jar, b"jar").unwrap();

        let mut descriptor = PluginDescriptor::new(
            ArtifactRef::new("org.example", "hello", "1.0").with_file(jar),
        );
        let config: HashMap<String, String> = config
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        descriptor.set_config(&config);

        let resolver = LocalRepositoryResolver::new(dir.path().join("repo"));
        Arc::new(ContextBuilder::new(&resolver).build(&descriptor).unwrap())
    }

    #[test]
    fn test_endpoints_from_config() {
        let ctx = context(&[
            ("endpoint./ws/b", "B"),
            ("endpoint./ws/a", "A"),
            ("endpoint.", "ignored"),
            ("greeting", "hello"),
        ]);
        let plugin = ConfiguredPlugin::from_context(&ctx);

        let paths: Vec<_> = plugin
            .endpoint_configurations()
            .into_iter()
            .map(|e| (e.path, e.implementor))
            .collect();
        assert_eq!(
            paths,
            vec![
                ("/ws/a".to_string(), "A".to_string()),
                ("/ws/b".to_string(), "B".to_string())
            ]
        );
    }

    #[test]
    fn test_capability_only_with_endpoints() {
        let loader = loader();

        let with = loader.instantiate(&context(&[("endpoint./ws", "Svc")])).ok().unwrap();
        let mut caps = Capabilities::new();
        with.capabilities(&mut caps);
        assert!(caps.has::<dyn EndpointProvider>());

        let without = loader.instantiate(&context(&[])).ok().unwrap();
        let mut caps = Capabilities::new();
        without.capabilities(&mut caps);
        assert!(caps.is_empty());
    }
}
