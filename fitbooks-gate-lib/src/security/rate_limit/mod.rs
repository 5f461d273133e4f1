//! Request admission control for the public API endpoints.
//!
//! The limiter is a keyed sliding window with an escalating block penalty:
//!
//! - **Clock** (`clock.rs`): epoch-millisecond time source, injectable for tests.
//! - **BucketStore** (`store.rs`): key -> [`Bucket`] map with a throttled sweep
//!   that bounds memory to the retention horizon.
//! - **RateLimiter** (`limiter.rs`): allow/deny decision with reset and retry
//!   timing.
//! - **Headers** (`headers.rs`): projection of a decision into
//!   `x-ratelimit-*` and `retry-after` response headers.
//!
//! # Example Usage
//!
//! ```
//! use fitbooks_gate_lib::security::rate_limit::{
//!     rate_limit_headers, Denial, RateLimitPolicy, RateLimiter,
//! };
//!
//! let limiter = RateLimiter::in_memory();
//! let policy = RateLimitPolicy::new(60_000, 1).with_block_ms(300_000);
//!
//! assert!(limiter.check("chat:198.51.100.4", &policy).allowed);
//!
//! let denied = limiter.check("chat:198.51.100.4", &policy);
//! assert_eq!(denied.denial, Some(Denial::Blocked));
//! assert!(rate_limit_headers(&denied).iter().any(|(name, _)| name == "retry-after"));
//! ```
//!
//! # Accuracy
//!
//! State is per process. Behind N instances a client can be admitted up to N
//! times the quota before any single instance denies it.

mod clock;
mod headers;
mod limiter;
mod policy;
mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use headers::{apply_rate_limit_headers, names, rate_limit_headers};
pub use limiter::{Denial, RateLimitDecision, RateLimiter};
pub use policy::RateLimitPolicy;
pub use store::{
    Bucket, BucketStore, InMemoryBucketStore, DEFAULT_RETENTION_MS, DEFAULT_SWEEP_INTERVAL_MS,
};
