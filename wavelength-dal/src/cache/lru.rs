//! Recency ordering for cache keys.

use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

/// Tracks use order of keys with a monotonically increasing tick.
///
/// `touch` and `remove` are `O(log n)`; the least recently used key is the
/// one with the smallest tick.
#[derive(Debug, Clone)]
pub struct LruTracker<K> {
    ticks: HashMap<K, u64>,
    order: BTreeMap<u64, K>,
    next_tick: u64,
}

impl<K: Clone + Eq + Hash> LruTracker<K> {
    pub fn new() -> Self {
        Self {
            ticks: HashMap::new(),
            order: BTreeMap::new(),
            next_tick: 0,
        }
    }

    /// Mark `key` as most recently used, inserting it if unknown.
    pub fn touch(&mut self, key: &K) {
        if let Some(old) = self.ticks.get(key) {
            self.order.remove(old);
        }
        let tick = self.next_tick;
        self.next_tick += 1;
        self.ticks.insert(key.clone(), tick);
        self.order.insert(tick, key.clone());
    }

    pub fn remove(&mut self, key: &K) -> bool {
        match self.ticks.remove(key) {
            Some(tick) => {
                self.order.remove(&tick);
                true
            }
            None => false,
        }
    }

    /// Least recently used key, without removing it.
    pub fn peek_lru(&self) -> Option<&K> {
        self.order.values().next()
    }

    /// Remove and return the least recently used key.
    pub fn pop_lru(&mut self) -> Option<K> {
        let (_, key) = self.order.pop_first()?;
        self.ticks.remove(&key);
        Some(key)
    }

    pub fn len(&self) -> usize {
        self.ticks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ticks.is_empty()
    }

    pub fn clear(&mut self) {
        self.ticks.clear();
        self.order.clear();
    }
}

impl<K: Clone + Eq + Hash> Default for LruTracker<K> {
    fn default() -> Self {
        Self::new()
    }
}
