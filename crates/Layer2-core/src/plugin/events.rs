//! Plugin Events - 런타임 리스너
//!
//! 리스너는 등록 순서대로 동기적으로 호출된다. 한 리스너의 실패는 기록만
//! 되고 다음 리스너 호출이나 리로드를 막지 않는다.

use super::registry::Topology;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use plexus_foundation::Result;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

/// 런타임 이벤트 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeEventKind {
    /// 첫 로드 성공 후 한 번
    RuntimeStarted,

    /// 이후 리로드마다
    TopologyChanged,
}

impl std::fmt::Display for RuntimeEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RuntimeStarted => write!(f, "runtime_started"),
            Self::TopologyChanged => write!(f, "topology_changed"),
        }
    }
}

/// 런타임 리스너 트레이트
///
/// 두 콜백 모두 항상 현재 전체 플러그인 집합을 받는다.
///
/// 콜백은 런타임의 리로드 락을 잡은 채로 호출된다. 콜백 안에서 `load` 나
/// `reload` 를 부르면 기다리지 않고 `InvalidInput` 에러가 반환되고,
/// `shutdown` 은 아무것도 하지 않는다. 콜백이 panic 하면 남은 리스너는
/// 호출되지 않는다.
pub trait RuntimeListener: Send + Sync {
    /// 리스너 이름 (로그/보고용)
    fn name(&self) -> &str;

    fn runtime_started(&self, _topology: &Topology) -> Result<()> {
        Ok(())
    }

    fn topology_changed(&self, _topology: &Topology) -> Result<()> {
        Ok(())
    }
}

/// 리스너 실패 기록
#[derive(Debug, Clone, Serialize)]
pub struct ListenerFailure {
    pub listener: String,
    pub event: RuntimeEventKind,
    pub message: String,
    pub at: DateTime<Utc>,
}

/// 등록 순서를 유지하는 리스너 목록
#[derive(Default)]
pub struct ListenerRegistry {
    listeners: RwLock<Vec<Arc<dyn RuntimeListener>>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, listener: Arc<dyn RuntimeListener>) {
        debug!("Added runtime listener: {}", listener.name());
        self.listeners.write().push(listener);
    }

    pub fn len(&self) -> usize {
        self.listeners.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.read().is_empty()
    }

    /// 스냅샷에 대해 이벤트 전달, 실패 목록 반환
    pub fn dispatch(&self, event: RuntimeEventKind, topology: &Topology) -> Vec<ListenerFailure> {
        // 콜백 안에서 리스너를 추가해도 데드락이 나지 않도록 복사본에 대해 호출
        let listeners: Vec<_> = self.listeners.read().clone();
        let mut failures = Vec::new();

        for listener in listeners {
            let result = match event {
                RuntimeEventKind::RuntimeStarted => listener.runtime_started(topology),
                RuntimeEventKind::TopologyChanged => listener.topology_changed(topology),
            };

            if let Err(e) = result {
                warn!("Listener {} failed on {}: {}", listener.name(), event, e);
                failures.push(ListenerFailure {
                    listener: listener.name().to_string(),
                    event,
                    message: e.to_string(),
                    at: Utc::now(),
                });
            }
        }

        debug!(
            "Dispatched {} (generation {}, {} failures)",
            event,
            topology.generation(),
            failures.len()
        );
        failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use plexus_foundation::Error;

    struct Recorder {
        name: &'static str,
        fail: bool,
        seen: Arc<Mutex<Vec<String>>>,
    }

    impl RuntimeListener for Recorder {
        fn name(&self) -> &str {
            self.name
        }

        fn topology_changed(&self, _topology: &Topology) -> Result<()> {
            self.seen.lock().push(self.name.to_string());
            if self.fail {
                Err(Error::Internal("boom".into()))
            } else {
                Ok(())
            }
        }
    }

    #[test]
    fn test_failure_does_not_block_later_listeners() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let registry = ListenerRegistry::new();
        for (name, fail) in [("first", false), ("broken", true), ("last", false)] {
            registry.add(Arc::new(Recorder {
                name,
                fail,
                seen: seen.clone(),
            }));
        }

        let failures = registry.dispatch(RuntimeEventKind::TopologyChanged, &Topology::default());

        assert_eq!(*seen.lock(), vec!["first", "broken", "last"]);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].listener, "broken");
        assert_eq!(failures[0].event, RuntimeEventKind::TopologyChanged);
    }

    #[test]
    fn test_default_callbacks_are_noops() {
        struct Quiet;
        impl RuntimeListener for Quiet {
            fn name(&self) -> &str {
                "quiet"
            }
        }

        let registry = ListenerRegistry::new();
        registry.add(Arc::new(Quiet));
        assert!(registry
            .dispatch(RuntimeEventKind::RuntimeStarted, &Topology::default())
            .is_empty());
    }
}
