//! Sliding-window rate limiter with block escalation.
//!
//! This module turns a [`Bucket`] and a [`RateLimitPolicy`] into a
//! [`RateLimitDecision`]. All state lives in the injected [`BucketStore`].

use std::sync::Arc;
use tracing::{debug, info};

use super::clock::{Clock, SystemClock};
use super::policy::RateLimitPolicy;
use super::store::{Bucket, BucketStore, InMemoryBucketStore};

/// Why a request was denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    /// Quota saturated within the window; retry once the window slides.
    Window,
    /// An escalation block is active; retry only after it expires.
    Blocked,
}

impl Denial {
    pub fn as_str(&self) -> &'static str {
        match self {
            Denial::Window => "window",
            Denial::Blocked => "blocked",
        }
    }
}

/// Outcome of a rate limit check.
///
/// Every field is populated for both outcomes so the decision can always be
/// projected into response headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    /// Configured quota for the window.
    pub limit: u32,
    /// Requests left in the current window (0 when denied).
    pub remaining: u32,
    /// Epoch ms at which the caller may expect to succeed again.
    pub reset_at_ms: u64,
    /// Seconds to wait before retrying: 0 when allowed, at least 1 when denied.
    pub retry_after_secs: u64,
    /// Set when `allowed` is false.
    pub denial: Option<Denial>,
}

impl RateLimitDecision {
    fn admitted(limit: u32, remaining: u32, reset_at_ms: u64) -> Self {
        Self {
            allowed: true,
            limit,
            remaining,
            reset_at_ms,
            retry_after_secs: 0,
            denial: None,
        }
    }

    fn denied(limit: u32, reset_at_ms: u64, now_ms: u64, denial: Denial) -> Self {
        Self {
            allowed: false,
            limit,
            remaining: 0,
            reset_at_ms,
            retry_after_secs: retry_after_secs(reset_at_ms, now_ms),
            denial: Some(denial),
        }
    }

    pub fn is_allowed(&self) -> bool {
        self.allowed
    }

    pub fn is_limited(&self) -> bool {
        !self.allowed
    }

    /// Reset time in whole epoch seconds, as advertised in headers.
    pub fn reset_at_secs(&self) -> u64 {
        self.reset_at_ms / 1000
    }
}

/// `ceil((reset_at - now) / 1000)` with a floor of one second.
fn retry_after_secs(reset_at_ms: u64, now_ms: u64) -> u64 {
    reset_at_ms.saturating_sub(now_ms).div_ceil(1000).max(1)
}

/// Keyed sliding-window limiter.
///
/// # Example
/// ```
/// use fitbooks_gate_lib::security::rate_limit::{RateLimitPolicy, RateLimiter};
///
/// let limiter = RateLimiter::in_memory();
/// let policy = RateLimitPolicy::new(60_000, 3);
///
/// let decision = limiter.check("lead:203.0.113.7", &policy);
/// assert!(decision.allowed);
/// assert_eq!(decision.remaining, 2);
/// ```
pub struct RateLimiter {
    store: Arc<dyn BucketStore>,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn BucketStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Limiter backed by a default [`InMemoryBucketStore`] and the system clock.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryBucketStore::new()), Arc::new(SystemClock))
    }

    pub fn store(&self) -> &Arc<dyn BucketStore> {
        &self.store
    }

    /// Check `key` against `policy` at the current clock time, recording the
    /// hit if it is admitted.
    pub fn check(&self, key: &str, policy: &RateLimitPolicy) -> RateLimitDecision {
        self.check_at(key, policy, self.clock.now_ms())
    }

    /// Same as [`check`](Self::check) with an explicit `now`.
    pub fn check_at(&self, key: &str, policy: &RateLimitPolicy, now_ms: u64) -> RateLimitDecision {
        self.store.sweep(now_ms);

        let mut outcome = None;
        self.store.update(key, &mut |bucket| {
            let blocked_before = bucket.blocked_until;
            let decision = evaluate(bucket, policy, now_ms);
            outcome = Some((decision, bucket.blocked_until != blocked_before));
        });

        // `update` always runs the closure; the fallback only satisfies the type.
        let (decision, escalated) =
            outcome.unwrap_or_else(|| (evaluate(&mut Bucket::default(), policy, now_ms), false));

        if escalated {
            info!(
                key,
                blocked_until = decision.reset_at_ms,
                retry_after = decision.retry_after_secs,
                "Quota exceeded, blocking key"
            );
        } else if let Some(denial) = decision.denial {
            debug!(
                key,
                reason = denial.as_str(),
                retry_after = decision.retry_after_secs,
                "Rate limit denied"
            );
        }

        decision
    }
}

/// Decide on one request and mutate `bucket` accordingly.
fn evaluate(bucket: &mut Bucket, policy: &RateLimitPolicy, now_ms: u64) -> RateLimitDecision {
    let limit = policy.max_requests;

    // An active block dominates whatever the window looks like.
    if bucket.is_blocked_at(now_ms) {
        return RateLimitDecision::denied(limit, bucket.blocked_until, now_ms, Denial::Blocked);
    }

    bucket.retain_within(now_ms, policy.window_ms);

    if bucket.hits.len() >= limit as usize {
        if let Some(block_ms) = policy.escalation_ms() {
            bucket.blocked_until = now_ms.saturating_add(block_ms);
            return RateLimitDecision::denied(limit, bucket.blocked_until, now_ms, Denial::Blocked);
        }

        let oldest = bucket.oldest_hit().unwrap_or(now_ms);
        let reset_at_ms = oldest.saturating_add(policy.window_ms);
        return RateLimitDecision::denied(limit, reset_at_ms, now_ms, Denial::Window);
    }

    bucket.hits.push_back(now_ms);

    let remaining = (limit as usize).saturating_sub(bucket.hits.len()) as u32;
    let reset_at_ms = bucket
        .oldest_hit()
        .unwrap_or(now_ms)
        .saturating_add(policy.window_ms);
    RateLimitDecision::admitted(limit, remaining, reset_at_ms)
}
