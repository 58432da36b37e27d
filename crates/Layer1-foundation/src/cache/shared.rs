//! Shared caches consulted from inside plugin contexts.
//!
//! 플러그인 컨텍스트 안에서 조회되는 공유 캐시는 플러그인에서 파생된 값을
//! 붙잡고 있을 수 있다. 리로드 때마다 `clear()`가 호출되어야 언로드된
//! 컨텍스트가 해제된다.

use super::util::LruCache;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

/// 리로드 시 비워져야 하는 캐시
pub trait ClearableCache: Send + Sync {
    /// 캐시 이름 (로그용)
    fn name(&self) -> &str;

    /// 모든 항목 제거
    fn clear(&self);

    /// 현재 항목 수
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// 문자열 키 기반 공유 LRU 캐시
pub struct SharedCache<V> {
    name: String,
    inner: Mutex<LruCache<String, V>>,
}

impl<V: Clone + Send> SharedCache<V> {
    pub fn new(name: impl Into<String>, capacity: usize) -> Self {
        Self {
            name: name.into(),
            inner: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// `Arc`로 감싸서 생성 (런타임에 등록할 때 사용)
    pub fn shared(name: impl Into<String>, capacity: usize) -> Arc<Self> {
        Arc::new(Self::new(name, capacity))
    }

    pub fn get(&self, key: &str) -> Option<V> {
        self.inner.lock().get(&key.to_string()).cloned()
    }

    pub fn insert(&self, key: impl Into<String>, value: V) -> Option<V> {
        self.inner.lock().insert(key.into(), value)
    }

    /// 없으면 생성해서 넣고, 있으면 기존 값을 반환
    pub fn get_or_insert_with<F>(&self, key: &str, make: F) -> V
    where
        F: FnOnce() -> V,
    {
        let mut inner = self.inner.lock();
        let key = key.to_string();
        if let Some(existing) = inner.get(&key) {
            return existing.clone();
        }
        let value = make();
        inner.insert(key, value.clone());
        value
    }
}

impl<V: Clone + Send> ClearableCache for SharedCache<V> {
    fn name(&self) -> &str {
        &self.name
    }

    fn clear(&self) {
        let mut inner = self.inner.lock();
        let dropped = inner.len();
        inner.clear();
        debug!("Cleared cache {} ({} entries)", self.name, dropped);
    }

    fn len(&self) -> usize {
        self.inner.lock().len()
    }
}
