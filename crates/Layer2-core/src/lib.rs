//! plexus-core: Core Runtime for Plexus
//!
//! Layer2 - 플러그인 런타임 레이어
//!
//! # 주요 모듈
//!
//! - `artifact`: 아티팩트 좌표, identity, 로컬 저장소 해석
//! - `plugin`: 매니페스트 파싱, 배포 순서, 격리된 컨텍스트, 핫 리로드
//! - `endpoint`: 토폴로지 변경 시 엔드포인트를 다시 게시하는 리스너
//!
//! # 사용 예시
//!
//! ```ignore
//! use plexus_core::{DependencySorter, ManifestParser, PluginRuntime};
//!
//! let descriptors = ManifestParser::parse_file(Path::new("plugins.xml"))?;
//! let ordered = DependencySorter::sort(&descriptors);
//!
//! let runtime = PluginRuntime::new(resolver, loader, RuntimeConfig::default());
//! runtime.load(&ordered)?;
//!
//! // 매니페스트가 바뀌면
//! runtime.reload(&ManifestParser::parse_file(Path::new("plugins.xml"))?)?;
//! ```

pub mod artifact;
pub mod endpoint;
pub mod plugin;

// Re-exports: Artifact
pub use artifact::{ArtifactKey, ArtifactRef, ArtifactResolver, LocalRepositoryResolver};

// Re-exports: Plugin
pub use plugin::{
    Capabilities, ContextBuilder, ContextId, DependencySorter, EntryPoint, EntryPointRegistry,
    ListenerFailure, LoadReport, LoadedPlugin, ManifestParser, Plugin, PluginContext,
    PluginDescriptor, PluginFailure, PluginLoader, PluginRuntime, RuntimeConfig,
    RuntimeEventKind, RuntimeListener, Scope, SortOutcome, Topology,
};

// Re-exports: Endpoint
pub use endpoint::{
    EndpointConfiguration, EndpointCustomizer, EndpointDefinition, EndpointHost,
    EndpointProvider, EndpointPublisher, InMemoryEndpointHost, PublishedEndpoint,
};

// Re-exports: Foundation
pub use plexus_foundation::{Error, Result};
