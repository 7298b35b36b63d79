//! In-process read cache with a fixed time-to-live.

use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;
use tracing::debug;

use crate::key::CacheKey;

/// How long list and detail reads stay fresh.
pub const DEFAULT_TTL: Duration = Duration::from_millis(300_000);

/// Status of a cache lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// Fresh entry returned.
    Hit,
    /// No entry.
    Miss,
    /// Entry existed but outlived the TTL; it has been dropped.
    Stale,
}

impl std::fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Hit => write!(f, "HIT"),
            Self::Miss => write!(f, "MISS"),
            Self::Stale => write!(f, "STALE"),
        }
    }
}

/// A cached value and when it was stored.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    pub inserted_at: Instant,
}

impl<V> CacheEntry<V> {
    pub fn new(value: V) -> Self {
        Self {
            value,
            inserted_at: Instant::now(),
        }
    }

    /// Fresh while `now - inserted_at < ttl`.
    pub fn is_fresh(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.inserted_at) < ttl
    }

    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.inserted_at)
    }
}

/// Key-value cache whose entries expire a fixed time after insertion.
///
/// Staleness is checked lazily on read. Entries are never refreshed in place:
/// `set` replaces the entry with a new insertion time, and reads drop entries
/// that outlived the TTL. Nothing sweeps in the background.
#[derive(Debug)]
pub struct TtlCache<V> {
    entries: DashMap<CacheKey, CacheEntry<V>>,
    ttl: Duration,
}

impl<V: Clone> TtlCache<V> {
    /// Create a cache with the given TTL.
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Get a fresh value.
    pub fn get(&self, key: &CacheKey) -> Option<V> {
        self.lookup(key).1
    }

    /// Get a fresh value along with how the lookup went.
    pub fn lookup(&self, key: &CacheKey) -> (CacheStatus, Option<V>) {
        let now = Instant::now();

        let status = match self.entries.get(key) {
            Some(entry) if entry.is_fresh(now, self.ttl) => {
                debug!(key = %key, age_ms = entry.age(now).as_millis() as u64, "cache hit");
                return (CacheStatus::Hit, Some(entry.value.clone()));
            }
            Some(_) => CacheStatus::Stale,
            None => CacheStatus::Miss,
        };

        if status == CacheStatus::Stale {
            // A concurrent `set` may have replaced the entry since the check.
            self.entries
                .remove_if(key, |_, entry| !entry.is_fresh(now, self.ttl));
        }
        debug!(key = %key, %status, "cache miss");
        (status, None)
    }

    /// Store a value, replacing any previous entry.
    pub fn set(&self, key: CacheKey, value: V) {
        self.entries.insert(key, CacheEntry::new(value));
    }

    /// Drop a single entry. Returns whether one existed.
    pub fn invalidate(&self, key: &CacheKey) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Drop every entry whose key starts with `prefix`. Returns how many went.
    pub fn invalidate_prefix(&self, prefix: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, _| !key.has_prefix(prefix));
        let removed = before.saturating_sub(self.entries.len());
        debug!(prefix, removed, "cache prefix invalidated");
        removed
    }

    /// Drop everything. Returns how many entries went.
    pub fn clear(&self) -> usize {
        let removed = self.entries.len();
        self.entries.clear();
        debug!(removed, "cache cleared");
        removed
    }

    /// Number of stored entries, fresh or not.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V: Clone> Default for TtlCache<V> {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}
