//! # Plugin System
//!
//! 매니페스트로 선언된 플러그인을 의존성 순서대로 격리된 컨텍스트에
//! 로드하고, 매니페스트가 바뀌면 바뀐 부분만 다시 만든다.
//!
//! ## 아키텍처
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       PluginRuntime                          │
//! │                                                              │
//! │  ManifestParser ─▶ DependencySorter ─▶ ContextBuilder        │
//! │   (XML → Descriptor)  (depends-on DFS)   (ArtifactResolver)  │
//! │                                              │               │
//! │                                              ▼               │
//! │                                        PluginLoader          │
//! │                                              │               │
//! │  ┌───────────────────────────────────────────┴────────────┐  │
//! │  │ Arc<Topology> (배포 순서, generation)                    │  │
//! │  │  ┌────────────┬────────────┬────────────┐              │  │
//! │  │  │ Plugin A   │ Plugin B   │ Plugin C   │  ...         │  │
//! │  │  │ context #1 │ context #2 │ context #3 │              │  │
//! │  │  └────────────┴────────────┴────────────┘              │  │
//! │  └────────────────────────────────────────────────────────┘  │
//! │                          │                                   │
//! │          ListenerRegistry (runtime_started / topology_changed)│
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## 예시
//!
//! ```ignore
//! let descriptors = ManifestParser::parse_file(Path::new("plugins.xml"))?;
//! let ordered = DependencySorter::sort(&descriptors);
//!
//! let runtime = PluginRuntime::new(resolver, loader, RuntimeConfig::default());
//! runtime.add_listener(publisher);
//! runtime.load(&ordered)?;
//!
//! for provider in runtime.query::<dyn EndpointProvider>() { ... }
//! ```

mod context;
mod descriptor;
mod events;
mod manifest;
mod registry;
mod runtime;
mod sorter;
mod traits;

pub use context::{ContextBuilder, ContextId, PluginContext};
pub use descriptor::{PluginDescriptor, Scope, DEVELOPMENT_PLUGIN_ARTIFACT, DEVELOPMENT_PLUGIN_GROUP};
pub use events::{ListenerFailure, ListenerRegistry, RuntimeEventKind, RuntimeListener};
pub use manifest::ManifestParser;
pub use registry::{LoadedPlugin, Topology};
pub use runtime::{LoadReport, PluginFailure, PluginRuntime, RuntimeConfig};
pub use sorter::{dedupe_last_wins, DependencySorter, SortOutcome};
pub use traits::{Capabilities, EntryPoint, EntryPointRegistry, Plugin, PluginLoader};
