//! Per-Group Role Cache
//!
//! Caches each group's role definitions in a bounded LRU with a fixed
//! entry lifetime. Entries are replaced wholesale on refetch.
//!
//! Per-group generation counters prevent an in-flight fetch that started
//! before an invalidation from writing stale roles back into the cache.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use gm_common::RoleDefinition;
use lru::LruCache;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Cached role list paired with the time it was fetched.
struct CachedRoleSet {
    roles: Arc<Vec<RoleDefinition>>,
    fetched_at: Instant,
}

/// Snapshot of a group's invalidation state, taken before a fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Generation {
    epoch: u64,
    group: u64,
}

/// Thread-safe cache of per-group role definitions.
pub struct RoleCache {
    entries: Mutex<LruCache<String, CachedRoleSet>>,
    /// Bumped by [`clear`](RoleCache::clear), which also drops every
    /// per-group counter.
    epoch: AtomicU64,
    /// Per-group invalidation counters. Only groups invalidated since the
    /// last `clear` have an entry; a missing entry reads as zero. The map is
    /// bounded by invalidations between clears, not by groups fetched.
    generations: DashMap<String, u64>,
    ttl: Duration,
}

impl RoleCache {
    /// Create an empty cache holding at most `capacity` groups.
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            epoch: AtomicU64::new(0),
            generations: DashMap::new(),
            ttl,
        }
    }

    /// Current generation for a group. Capture before fetching, pass to
    /// [`insert_if_current`](Self::insert_if_current) afterwards.
    pub fn generation(&self, group_id: &str) -> Generation {
        Generation {
            epoch: self.epoch.load(Ordering::Acquire),
            group: self.generations.get(group_id).map_or(0, |g| *g.value()),
        }
    }

    /// Live roles for a group. Expired entries are evicted on access.
    pub async fn get(&self, group_id: &str) -> Option<Arc<Vec<RoleDefinition>>> {
        let mut entries = self.entries.lock().await;

        let expired = match entries.get(group_id) {
            Some(entry) if entry.fetched_at.elapsed() < self.ttl => {
                return Some(Arc::clone(&entry.roles));
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            entries.pop(group_id);
        }
        None
    }

    /// Age of the cached entry, expired or not, without touching LRU order.
    pub async fn age(&self, group_id: &str) -> Option<Duration> {
        let entries = self.entries.lock().await;
        entries.peek(group_id).map(|entry| entry.fetched_at.elapsed())
    }

    /// Whether a group's entry is missing or older than `fraction` of the TTL.
    pub async fn needs_refresh(&self, group_id: &str, fraction: f64) -> bool {
        let threshold = self.ttl.mul_f64(fraction.clamp(0.0, 1.0));
        self.age(group_id).await.map_or(true, |age| age >= threshold)
    }

    /// Store roles fetched at `generation`.
    ///
    /// Returns `false` and stores nothing if the group was invalidated since
    /// the generation was captured.
    pub async fn insert_if_current(
        &self,
        group_id: &str,
        roles: Arc<Vec<RoleDefinition>>,
        generation: Generation,
    ) -> bool {
        let mut entries = self.entries.lock().await;

        // Checked under the entries lock so invalidate() cannot interleave.
        if self.generation(group_id) != generation {
            return false;
        }

        entries.put(
            group_id.to_string(),
            CachedRoleSet {
                roles,
                fetched_at: Instant::now(),
            },
        );
        true
    }

    /// Invalidate the cached roles for a group.
    pub async fn invalidate(&self, group_id: &str) {
        let mut entries = self.entries.lock().await;
        *self.generations.entry(group_id.to_string()).or_insert(0) += 1;
        entries.pop(group_id);
    }

    /// Drop every entry and every per-group counter.
    ///
    /// Fetches started before the clear are refused on insert.
    pub async fn clear(&self) {
        let mut entries = self.entries.lock().await;
        self.epoch.fetch_add(1, Ordering::Release);
        self.generations.clear();
        entries.clear();
    }

    /// Number of groups holding an invalidation counter.
    pub fn tracked_generations(&self) -> usize {
        self.generations.len()
    }

    /// Number of cached groups, including expired entries not yet evicted.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// Whether the cache holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    /// Entry lifetime.
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }
}
