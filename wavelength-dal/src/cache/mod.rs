//! Record Cache
//!
//! Process-local snapshot cache used by the caching model. Entries are keyed
//! by model name plus `(partition_key, sort_key)`, expire after a fixed TTL
//! and are evicted least-recently-used once the cache is full. A store read
//! only fills the cache if no write touched its key while it was in flight.
//!
//! # Architecture
//!
//! ```text
//! CachingModel::get(key)
//!        │
//!        ▼
//! RecordCache::get ── hit (fresh) ──► snapshot
//!        │
//!      miss / expired
//!        │
//!        ▼
//! RecordCache::begin_read ──► GetByIdCommand ──► RecordCache::fill
//! ```

mod clock;
mod config;
mod key;
mod lru;
mod stats;
mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{CacheConfig, DEFAULT_MAX_ENTRIES, DEFAULT_TTL};
pub use key::CacheKey;
pub use lru::LruTracker;
pub use stats::CacheStats;
pub use store::{ReadTicket, RecordCache};
