//! Bounded, time-expiring record cache.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use tracing::{debug, trace};

use super::clock::{Clock, SystemClock};
use super::config::CacheConfig;
use super::key::CacheKey;
use super::lru::LruTracker;
use super::stats::CacheStats;
use crate::record::Record;

#[derive(Debug, Clone)]
struct CacheEntry {
    record: Record,
    expires_at: Instant,
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<CacheKey, CacheEntry>,
    lru: LruTracker<CacheKey>,
    stats: CacheStats,
    /// Bumped by every insert, invalidation and clear.
    generation: u64,
    /// Generation of the last write per key, tracked only while reads are
    /// outstanding.
    touched: HashMap<CacheKey, u64>,
    /// Generation of the last clear.
    cleared_at: u64,
    /// Outstanding read tickets by the generation they started at.
    reads: BTreeMap<u64, usize>,
}

impl CacheState {
    fn drop_entry(&mut self, key: &CacheKey) -> bool {
        self.lru.remove(key);
        self.entries.remove(key).is_some()
    }

    fn purge_expired(&mut self, now: Instant) -> usize {
        let expired: Vec<CacheKey> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.expires_at <= now)
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            self.drop_entry(key);
        }
        self.stats.expirations += expired.len() as u64;
        expired.len()
    }

    fn touch(&mut self, key: &CacheKey) {
        self.generation += 1;
        if !self.reads.is_empty() {
            self.touched.insert(key.clone(), self.generation);
        }
    }

    fn begin_read(&mut self) -> u64 {
        *self.reads.entry(self.generation).or_insert(0) += 1;
        self.generation
    }

    fn end_read(&mut self, started_at: u64) {
        if let Some(count) = self.reads.get_mut(&started_at) {
            *count -= 1;
            if *count == 0 {
                self.reads.remove(&started_at);
            }
        }
        match self.reads.keys().next().copied() {
            None => self.touched.clear(),
            Some(oldest) => self.touched.retain(|_, written| *written > oldest),
        }
    }

    /// Whether `key` was written, invalidated or cleared after a read that
    /// started at `started_at`.
    fn written_since(&self, key: &CacheKey, started_at: u64) -> bool {
        self.cleared_at > started_at
            || self
                .touched
                .get(key)
                .map_or(false, |written| *written > started_at)
    }
}

/// An outstanding store read whose result may be cached with
/// [`RecordCache::fill`].
///
/// A fill is dropped when the key was written or invalidated after the
/// ticket was taken, so a snapshot read before a concurrent delete never
/// lands in the cache after the delete evicted the key.
#[derive(Debug)]
pub struct ReadTicket<'a> {
    cache: &'a RecordCache,
    started_at: u64,
}

impl Drop for ReadTicket<'_> {
    fn drop(&mut self) {
        self.cache.lock().end_read(self.started_at);
    }
}

/// In-process snapshot cache keyed by [`CacheKey`].
///
/// Entries expire `ttl` after they were written; reads do not extend an
/// entry's life. When full, inserting a new key first drops expired entries
/// and then evicts the least recently used one. All access goes through one
/// mutex; a poisoned lock is recovered since every state it guards is valid.
#[derive(Debug)]
pub struct RecordCache {
    config: CacheConfig,
    clock: Arc<dyn Clock>,
    state: Mutex<CacheState>,
}

impl RecordCache {
    pub fn new(config: CacheConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: CacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            state: Mutex::new(CacheState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Fresh snapshot for `key`, if any.
    pub fn get(&self, key: &CacheKey) -> Option<Record> {
        let now = self.clock.now();
        let mut state = self.lock();

        let expired = match state.entries.get(key) {
            None => {
                state.stats.misses += 1;
                trace!(cache_key = %key, "Cache miss");
                return None;
            }
            Some(entry) => entry.expires_at <= now,
        };

        if expired {
            state.drop_entry(key);
            state.stats.expirations += 1;
            state.stats.misses += 1;
            debug!(cache_key = %key, "Cache entry expired");
            return None;
        }

        state.lru.touch(key);
        state.stats.hits += 1;
        trace!(cache_key = %key, "Cache hit");
        state.entries.get(key).map(|entry| entry.record.clone())
    }

    /// Store a snapshot of `record` under its own key with a fresh TTL.
    pub fn insert(&self, record: &Record) {
        let now = self.clock.now();
        let mut state = self.lock();
        self.insert_locked(&mut state, CacheKey::of(record), record, now);
    }

    fn insert_locked(&self, state: &mut CacheState, key: CacheKey, record: &Record, now: Instant) {
        if !state.entries.contains_key(&key) && state.entries.len() >= self.config.max_entries {
            state.purge_expired(now);
            while state.entries.len() >= self.config.max_entries {
                let Some(victim) = state.lru.pop_lru() else {
                    break;
                };
                state.entries.remove(&victim);
                state.stats.evictions += 1;
                debug!(cache_key = %victim, "Evicted least recently used cache entry");
            }
        }

        state.touch(&key);
        state.lru.touch(&key);
        trace!(cache_key = %key, "Cached record");
        state.entries.insert(
            key,
            CacheEntry {
                record: record.clone(),
                expires_at: now + self.config.ttl,
            },
        );
    }

    /// Start a store read whose result will be offered to [`fill`](Self::fill).
    pub fn begin_read(&self) -> ReadTicket<'_> {
        let started_at = self.lock().begin_read();
        ReadTicket {
            cache: self,
            started_at,
        }
    }

    /// Cache `record` unless its key changed since `ticket` was taken.
    /// Returns whether the record was stored.
    pub fn fill(&self, ticket: &ReadTicket<'_>, record: &Record) -> bool {
        let key = CacheKey::of(record);
        let now = self.clock.now();
        let mut state = self.lock();
        if state.written_since(&key, ticket.started_at) {
            debug!(cache_key = %key, "Skipped caching a read that raced a write");
            return false;
        }
        self.insert_locked(&mut state, key, record, now);
        true
    }

    /// Drop `key`. Returns whether an entry was present.
    pub fn invalidate(&self, key: &CacheKey) -> bool {
        let mut state = self.lock();
        state.touch(key);
        let removed = state.drop_entry(key);
        if removed {
            debug!(cache_key = %key, "Invalidated cache entry");
        }
        removed
    }

    pub fn clear(&self) {
        let mut state = self.lock();
        state.generation += 1;
        state.cleared_at = state.generation;
        state.entries.clear();
        state.lru.clear();
    }

    /// Drop every expired entry. Returns how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        self.lock().purge_expired(now)
    }

    /// Whether a fresh entry exists, without counting a hit or miss.
    pub fn contains(&self, key: &CacheKey) -> bool {
        let now = self.clock.now();
        self.lock()
            .entries
            .get(key)
            .map_or(false, |entry| entry.expires_at > now)
    }

    /// Number of stored entries, expired ones not yet dropped included.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.lock();
        CacheStats {
            entry_count: state.entries.len() as u64,
            ..state.stats
        }
    }
}

impl Default for RecordCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}
