//! Per-key bucket storage for the sliding-window limiter.
//!
//! The store is the only shared mutable state of the admission layer. It is
//! injected into [`RateLimiter`](super::RateLimiter) as `Arc<dyn BucketStore>`
//! so tests get isolated instances and a shared external store can be swapped
//! in behind the same contract.

use ahash::AHashMap;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

/// Default minimum spacing between two sweeps (60 seconds).
pub const DEFAULT_SWEEP_INTERVAL_MS: u64 = 60_000;

/// Default retention horizon for recorded hits (1 hour).
pub const DEFAULT_RETENTION_MS: u64 = 60 * 60 * 1000;

/// Recent activity and penalty state for a single key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bucket {
    /// Admitted request timestamps (epoch ms) in arrival order.
    pub hits: VecDeque<u64>,
    /// While `now < blocked_until` the key is denied regardless of `hits`.
    pub blocked_until: u64,
}

impl Bucket {
    /// Timestamp of the earliest recorded hit, if any.
    pub fn oldest_hit(&self) -> Option<u64> {
        self.hits.front().copied()
    }

    pub fn is_blocked_at(&self, now_ms: u64) -> bool {
        self.blocked_until > now_ms
    }

    /// Drop every hit for which `now - hit >= horizon_ms`.
    ///
    /// A hit stamped after `now` is kept. The clock may step backwards, so
    /// such a hit can sit in front of stale ones and the whole queue is scanned.
    pub fn retain_within(&mut self, now_ms: u64, horizon_ms: u64) {
        self.hits
            .retain(|&hit| now_ms.saturating_sub(hit) < horizon_ms);
    }

    /// An expired bucket is indistinguishable from an absent one.
    pub fn is_expired_at(&self, now_ms: u64) -> bool {
        self.hits.is_empty() && self.blocked_until <= now_ms
    }
}

/// Storage contract for rate-limit buckets.
pub trait BucketStore: Send + Sync {
    /// Snapshot of the bucket for `key`, or a fresh one. Never inserts.
    fn get_or_create(&self, key: &str) -> Bucket;

    /// Run `f` on the bucket for `key` (fresh if absent) and store the result.
    ///
    /// Implementations must not let another `update` of the same key interleave
    /// with `f`.
    fn update(&self, key: &str, f: &mut dyn FnMut(&mut Bucket));

    /// Purge hits older than the retention horizon and drop expired buckets.
    ///
    /// Returns `None` when the call was throttled, otherwise the number of
    /// buckets removed.
    fn sweep(&self, now_ms: u64) -> Option<usize>;

    /// Number of retained buckets.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

struct StoreState {
    buckets: AHashMap<String, Bucket>,
    last_swept_at: u64,
}

/// Process-local [`BucketStore`] backed by a hash map behind a mutex.
pub struct InMemoryBucketStore {
    state: Mutex<StoreState>,
    sweep_interval_ms: u64,
    retention_ms: u64,
}

impl InMemoryBucketStore {
    pub fn new() -> Self {
        Self::with_settings(DEFAULT_SWEEP_INTERVAL_MS, DEFAULT_RETENTION_MS)
    }

    /// Create a store with a custom sweep interval and retention horizon.
    pub fn with_settings(sweep_interval_ms: u64, retention_ms: u64) -> Self {
        Self {
            state: Mutex::new(StoreState {
                buckets: AHashMap::new(),
                last_swept_at: 0,
            }),
            sweep_interval_ms,
            retention_ms,
        }
    }

    pub fn sweep_interval_ms(&self) -> u64 {
        self.sweep_interval_ms
    }

    pub fn retention_ms(&self) -> u64 {
        self.retention_ms
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(|poisoned| {
            warn!("Bucket store lock poisoned, recovering");
            poisoned.into_inner()
        })
    }
}

impl Default for InMemoryBucketStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BucketStore for InMemoryBucketStore {
    fn get_or_create(&self, key: &str) -> Bucket {
        self.lock().buckets.get(key).cloned().unwrap_or_default()
    }

    fn update(&self, key: &str, f: &mut dyn FnMut(&mut Bucket)) {
        let mut state = self.lock();
        let mut bucket = state.buckets.remove(key).unwrap_or_default();
        f(&mut bucket);
        state.buckets.insert(key.to_string(), bucket);
    }

    fn sweep(&self, now_ms: u64) -> Option<usize> {
        let mut state = self.lock();
        if now_ms.saturating_sub(state.last_swept_at) < self.sweep_interval_ms {
            return None;
        }

        let retention_ms = self.retention_ms;
        let before = state.buckets.len();
        state.buckets.retain(|_, bucket| {
            bucket.retain_within(now_ms, retention_ms);
            !bucket.is_expired_at(now_ms)
        });
        let removed = before.saturating_sub(state.buckets.len());
        state.last_swept_at = now_ms;

        debug!(
            removed,
            retained = state.buckets.len(),
            "Swept rate limit buckets"
        );
        Some(removed)
    }

    fn len(&self) -> usize {
        self.lock().buckets.len()
    }
}
