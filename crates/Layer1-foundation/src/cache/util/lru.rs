//! LRU 캐시
//!
//! 스스로는 동기화하지 않는다. 공유할 때는 [`crate::cache::SharedCache`] 로 감싼다.

use std::collections::HashMap;
use std::hash::Hash;

/// 용량 제한이 있는 LRU 맵
///
/// 항목마다 마지막 접근 tick 을 기록하고, 가득 차면 tick 이 가장 작은
/// 항목을 내보낸다.
#[derive(Debug)]
pub struct LruCache<K, V> {
    slots: HashMap<K, (V, u64)>,
    limit: usize,
    tick: u64,
}

impl<K: Eq + Hash + Clone, V> LruCache<K, V> {
    /// 용량 0 은 1 로 올린다
    pub fn new(capacity: usize) -> Self {
        let limit = capacity.max(1);
        Self {
            slots: HashMap::with_capacity(limit),
            limit,
            tick: 0,
        }
    }

    fn touch(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    pub fn get(&mut self, key: &K) -> Option<&V> {
        let now = self.touch();
        let (value, seen) = self.slots.get_mut(key)?;
        *seen = now;
        Some(&*value)
    }

    /// 기존 값이 있으면 교체하고 이전 값을 돌려준다
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        let now = self.touch();
        if let Some((slot, seen)) = self.slots.get_mut(&key) {
            *seen = now;
            return Some(std::mem::replace(slot, value));
        }

        if self.slots.len() >= self.limit {
            let stalest = self
                .slots
                .iter()
                .min_by_key(|(_, (_, seen))| *seen)
                .map(|(k, _)| k.clone());
            if let Some(stalest) = stalest {
                self.slots.remove(&stalest);
            }
        }

        self.slots.insert(key, (value, now));
        None
    }

    /// 모든 값을 drop 한다
    pub fn clear(&mut self) {
        self.slots.clear();
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
