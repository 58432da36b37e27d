//! Plugin Runtime - 로드, 리로드, 조회
//!
//! ## 리로드 순서
//!
//! ```text
//! sort ─▶ diff ─▶ clear caches ─▶ tear down (역순) ─▶ build ─▶ publish ─▶ topology_changed
//!                                  removed + changed      new + changed
//! ```
//!
//! 변경되지 않은 플러그인은 같은 `Arc<LoadedPlugin>` 을 그대로 재사용하므로
//! 컨텍스트 ID 도 유지된다.

use super::context::{ContextBuilder, PluginContext};
use super::descriptor::PluginDescriptor;
use super::events::{ListenerFailure, ListenerRegistry, RuntimeEventKind, RuntimeListener};
use super::registry::{LoadedPlugin, Topology};
use super::sorter::{dedupe_last_wins, DependencySorter};
use super::traits::{Capabilities, PluginLoader};
use crate::artifact::{ArtifactKey, ArtifactResolver};
use parking_lot::{Mutex, MutexGuard, RwLock};
use plexus_foundation::{ClearableCache, Error, HostConfig, Result};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, ThreadId};
use tracing::{debug, error, info, warn};

// ============================================================================
// 설정 / 보고
// ============================================================================

/// 런타임 설정
#[derive(Debug, Clone, Default)]
pub struct RuntimeConfig {
    /// 변경된 플러그인의 구조적 자식(compile 클래스패스로 참조하는 쪽)도
    /// 변경된 것으로 보고 다시 만든다
    pub cascade_reload: bool,
}

impl From<&HostConfig> for RuntimeConfig {
    fn from(config: &HostConfig) -> Self {
        Self {
            cascade_reload: config.cascade_reload(),
        }
    }
}

/// 플러그인 단위로 건너뛴 실패
#[derive(Debug, Clone, Serialize)]
pub struct PluginFailure {
    pub plugin: ArtifactKey,
    pub coordinates: String,
    pub message: String,
}

/// 마지막 로드/리로드 결과
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadReport {
    pub generation: u64,
    /// 새로 만든 컨텍스트
    pub loaded: Vec<ArtifactKey>,
    /// 그대로 재사용한 컨텍스트
    pub reused: Vec<ArtifactKey>,
    /// 해제한 컨텍스트 (해제 순서)
    pub torn_down: Vec<ArtifactKey>,
    pub failures: Vec<PluginFailure>,
    pub listener_failures: Vec<ListenerFailure>,
    pub cycles: Vec<(ArtifactKey, ArtifactKey)>,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.listener_failures.is_empty()
    }
}

// ============================================================================
// PluginRuntime
// ============================================================================

/// 플러그인 런타임
pub struct PluginRuntime {
    resolver: Arc<dyn ArtifactResolver>,
    loader: Arc<dyn PluginLoader>,
    config: RuntimeConfig,

    /// 현재 스냅샷. 교체만 하고 내부는 수정하지 않는다.
    topology: RwLock<Arc<Topology>>,

    listeners: ListenerRegistry,
    caches: RwLock<Vec<Arc<dyn ClearableCache>>>,

    /// 로드/리로드/종료 직렬화
    reload_lock: Mutex<()>,
    /// 리스너를 호출 중인 스레드 (재진입 감지)
    dispatching: Mutex<Option<ThreadId>>,

    /// 현재 로드된 상태인지
    started: AtomicBool,
    /// `runtime_started` 를 이미 보냈는지. shutdown 후에도 유지된다.
    announced: AtomicBool,
    last_report: RwLock<Option<LoadReport>>,
}

impl PluginRuntime {
    pub fn new(
        resolver: Arc<dyn ArtifactResolver>,
        loader: Arc<dyn PluginLoader>,
        config: RuntimeConfig,
    ) -> Self {
        Self {
            resolver,
            loader,
            config,
            topology: RwLock::new(Arc::new(Topology::default())),
            listeners: ListenerRegistry::new(),
            caches: RwLock::new(Vec::new()),
            reload_lock: Mutex::new(()),
            dispatching: Mutex::new(None),
            started: AtomicBool::new(false),
            announced: AtomicBool::new(false),
            last_report: RwLock::new(None),
        }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    // ========================================================================
    // 등록
    // ========================================================================

    /// 리스너 등록 (등록 순서대로 호출됨)
    pub fn add_listener(&self, listener: Arc<dyn RuntimeListener>) {
        self.listeners.add(listener);
    }

    /// 리로드마다 비워질 공유 캐시 등록
    pub fn register_cache(&self, cache: Arc<dyn ClearableCache>) {
        debug!("Registered shared cache: {}", cache.name());
        self.caches.write().push(cache);
    }

    // ========================================================================
    // 로드 / 리로드
    // ========================================================================

    /// 배포 순서대로 정렬된 디스크립터 로드
    ///
    /// 이미 시작된 런타임에서는 [`reload`](Self::reload) 와 같다.
    pub fn load(&self, ordered: &[PluginDescriptor]) -> Result<LoadReport> {
        let _guard = self.lock_reload()?;
        if self.is_started() {
            debug!("Runtime already started, treating load as reload");
            return self.reload_locked(ordered);
        }
        let ordered = dedupe_last_wins(ordered);
        self.initial_load(&ordered, Vec::new())
    }

    /// 새 디스크립터 집합으로 리로드
    pub fn reload(&self, descriptors: &[PluginDescriptor]) -> Result<LoadReport> {
        let _guard = self.lock_reload()?;
        self.reload_locked(descriptors)
    }

    fn lock_reload(&self) -> Result<MutexGuard<'_, ()>> {
        if *self.dispatching.lock() == Some(thread::current().id()) {
            return Err(Error::InvalidInput(
                "runtime cannot be reloaded from inside a listener callback".to_string(),
            ));
        }
        Ok(self.reload_lock.lock())
    }

    fn dispatch(&self, event: RuntimeEventKind, topology: &Topology) -> Vec<ListenerFailure> {
        let _mark = DispatchMark::enter(&self.dispatching);
        self.listeners.dispatch(event, topology)
    }

    fn initial_load(
        &self,
        ordered: &[PluginDescriptor],
        cycles: Vec<(ArtifactKey, ArtifactKey)>,
    ) -> Result<LoadReport> {
        let generation = self.topology.read().generation() + 1;
        info!("Loading {} plugins", ordered.len());

        let mut report = LoadReport {
            generation,
            cycles,
            ..Default::default()
        };
        let mut plugins: Vec<Arc<LoadedPlugin>> = Vec::with_capacity(ordered.len());

        for descriptor in ordered {
            match self.build_plugin(descriptor) {
                Ok(plugin) => {
                    report.loaded.push(plugin.key());
                    plugins.push(Arc::new(plugin));
                }
                Err(e) if e.is_plugin_scoped() => record_skip(&mut report, descriptor, &e),
                Err(e) => {
                    error!("Failed to load {}: {}", descriptor.coordinates(), e);
                    for plugin in plugins.iter().rev() {
                        teardown(plugin);
                    }
                    return Err(e);
                }
            }
        }

        let topology = Arc::new(Topology::new(plugins, generation));
        *self.topology.write() = Arc::clone(&topology);
        self.started.store(true, Ordering::SeqCst);

        info!(
            "Runtime started: {} plugins loaded, {} skipped",
            report.loaded.len(),
            report.failures.len()
        );

        // shutdown 뒤의 재시작은 새 runtime_started 가 아니라 변경으로 알린다
        let event = if self.announced.swap(true, Ordering::SeqCst) {
            RuntimeEventKind::TopologyChanged
        } else {
            RuntimeEventKind::RuntimeStarted
        };
        report.listener_failures = self.dispatch(event, &topology);
        *self.last_report.write() = Some(report.clone());
        Ok(report)
    }

    fn reload_locked(&self, descriptors: &[PluginDescriptor]) -> Result<LoadReport> {
        let outcome = DependencySorter::sort_with_report(descriptors);
        if !self.is_started() {
            return self.initial_load(&outcome.order, outcome.cycles);
        }

        let current = self.topology();
        let generation = current.generation() + 1;
        let changed = self.changed_keys(&current, &outcome.order);
        let wanted: HashSet<ArtifactKey> = outcome.order.iter().map(|d| d.key()).collect();

        info!(
            "Reloading: {} plugins ({} changed)",
            outcome.order.len(),
            changed.len()
        );

        let mut report = LoadReport {
            generation,
            cycles: outcome.cycles,
            ..Default::default()
        };

        // 플러그인에서 파생된 값이 해제될 컨텍스트를 붙잡지 않도록 먼저 비운다
        self.clear_caches();

        for plugin in current.iter().rev() {
            let key = plugin.key();
            if !wanted.contains(&key) || changed.contains(&key) {
                teardown(plugin);
                report.torn_down.push(key);
            }
        }

        let mut plugins: Vec<Arc<LoadedPlugin>> = Vec::with_capacity(outcome.order.len());
        let mut fatal = None;

        for descriptor in &outcome.order {
            let key = descriptor.key();
            if !changed.contains(&key) {
                if let Some(existing) = current.get(&key) {
                    plugins.push(Arc::clone(existing));
                    report.reused.push(key);
                    continue;
                }
            }

            if fatal.is_some() {
                continue;
            }

            match self.build_plugin(descriptor) {
                Ok(plugin) => {
                    report.loaded.push(key);
                    plugins.push(Arc::new(plugin));
                }
                Err(e) if e.is_plugin_scoped() => record_skip(&mut report, descriptor, &e),
                Err(e) => {
                    error!("Failed to load {}: {}", descriptor.coordinates(), e);
                    fatal = Some(e);
                }
            }
        }
        drop(current);

        // 실패해도 지금까지 만든 집합은 게시하고 리스너에게 알린다
        let topology = Arc::new(Topology::new(plugins, generation));
        *self.topology.write() = Arc::clone(&topology);

        info!(
            "Reload complete (generation {}): {} loaded, {} reused, {} torn down, {} skipped",
            generation,
            report.loaded.len(),
            report.reused.len(),
            report.torn_down.len(),
            report.failures.len()
        );

        report.listener_failures = self.dispatch(RuntimeEventKind::TopologyChanged, &topology);
        *self.last_report.write() = Some(report.clone());

        match fatal {
            Some(e) => Err(e),
            None => Ok(report),
        }
    }

    /// 이미 로드된 것 중 내용이 바뀐 플러그인 (+ cascade 시 구조적 자식)
    fn changed_keys(&self, current: &Topology, ordered: &[PluginDescriptor]) -> HashSet<ArtifactKey> {
        let direct: Vec<&PluginDescriptor> = ordered
            .iter()
            .filter(|d| {
                current
                    .get(&d.key())
                    .is_some_and(|loaded| !loaded.descriptor.same_content(d))
            })
            .collect();

        let mut changed: HashSet<ArtifactKey> = direct.iter().map(|d| d.key()).collect();

        if self.config.cascade_reload {
            for descriptor in &direct {
                for impacted in DependencySorter::impacted_by(descriptor, ordered) {
                    if current.contains(&impacted.key()) && changed.insert(impacted.key()) {
                        debug!(
                            "{} reloads because {} changed",
                            impacted.coordinates(),
                            descriptor.coordinates()
                        );
                    }
                }
            }
        }

        changed
    }

    fn build_plugin(&self, descriptor: &PluginDescriptor) -> Result<LoadedPlugin> {
        let context = Arc::new(ContextBuilder::new(self.resolver.as_ref()).build(descriptor)?);
        let instance = self.loader.instantiate(&context)?;

        let mut capabilities = Capabilities::new();
        Arc::clone(&instance).capabilities(&mut capabilities);

        debug!(
            "Loaded {} with capabilities {:?}",
            descriptor.coordinates(),
            capabilities
        );

        Ok(LoadedPlugin {
            descriptor: descriptor.clone(),
            context,
            instance,
            capabilities,
        })
    }

    fn clear_caches(&self) {
        let caches: Vec<_> = self.caches.read().clone();
        for cache in caches {
            cache.clear();
        }
    }

    /// 모든 컨텍스트를 배포 역순으로 해제
    pub fn shutdown(&self) -> Vec<ArtifactKey> {
        let Ok(_guard) = self.lock_reload() else {
            warn!("Ignoring shutdown requested from a listener callback");
            return Vec::new();
        };
        let current = {
            let mut topology = self.topology.write();
            let empty = Arc::new(Topology::new(Vec::new(), topology.generation()));
            std::mem::replace(&mut *topology, empty)
        };

        let mut torn_down = Vec::with_capacity(current.len());
        for plugin in current.iter().rev() {
            teardown(plugin);
            torn_down.push(plugin.key());
        }
        self.clear_caches();
        self.started.store(false, Ordering::SeqCst);

        info!("Runtime shut down ({} contexts released)", torn_down.len());
        torn_down
    }

    // ========================================================================
    // 조회
    // ========================================================================

    /// 현재 토폴로지 스냅샷
    pub fn topology(&self) -> Arc<Topology> {
        Arc::clone(&self.topology.read())
    }

    pub fn context(&self, key: &ArtifactKey) -> Result<Arc<PluginContext>> {
        self.topology().context(key)
    }

    /// capability 를 제공하는 모든 구현 (배포 순서)
    pub fn query<T>(&self) -> Vec<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.topology().query::<T>()
    }

    pub fn active_keys(&self) -> Vec<ArtifactKey> {
        self.topology().keys()
    }

    pub fn last_report(&self) -> Option<LoadReport> {
        self.last_report.read().clone()
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }
}

/// 리스너 호출 구간 표시. panic 으로 빠져나가도 지워진다.
struct DispatchMark<'a>(&'a Mutex<Option<ThreadId>>);

impl<'a> DispatchMark<'a> {
    fn enter(slot: &'a Mutex<Option<ThreadId>>) -> Self {
        *slot.lock() = Some(thread::current().id());
        Self(slot)
    }
}

impl Drop for DispatchMark<'_> {
    fn drop(&mut self) {
        *self.0.lock() = None;
    }
}

fn record_skip(report: &mut LoadReport, descriptor: &PluginDescriptor, e: &Error) {
    warn!("Skipping plugin {}: {}", descriptor.coordinates(), e);
    report.failures.push(PluginFailure {
        plugin: descriptor.key(),
        coordinates: descriptor.coordinates(),
        message: e.to_string(),
    });
}

fn teardown(plugin: &LoadedPlugin) {
    if let Err(e) = plugin.instance.on_unload(&plugin.context) {
        warn!("on_unload failed for {}: {}", plugin.context.coordinates(), e);
    }
    debug!("Tore down {}", plugin.context);
}
