use serde::Deserialize;

use crate::security::rate_limit::{
    RateLimitPolicy, DEFAULT_RETENTION_MS, DEFAULT_SWEEP_INTERVAL_MS,
};

/// Rate limiting configuration
///
/// ```toml
/// [rate_limit]
/// trust_proxy_headers = true
///
/// [rate_limit.chat]
/// window_ms = 300000
/// max_requests = 20
/// block_ms = 600000
/// ```
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct RateLimitConfig {
    /// Derive the client address from cf-connecting-ip / x-forwarded-for /
    /// x-real-ip. Disable when not running behind a trusted proxy; the peer
    /// address is used instead.
    /// Default: true
    #[serde(default = "default_true")]
    pub trust_proxy_headers: bool,
    /// Minimum spacing between bucket sweeps in milliseconds
    /// Default: 60000
    #[serde(default = "default_sweep_interval_ms")]
    pub sweep_interval_ms: u64,
    /// How long recorded hits are retained in milliseconds
    /// Default: 3600000 (1 hour)
    #[serde(default = "default_retention_ms")]
    pub retention_ms: u64,
    /// Lead intake policy
    /// Default: 6 requests per 10 minutes, 15 minute block
    #[serde(default = "RateLimitPolicy::lead")]
    pub lead: RateLimitPolicy,
    /// Chat relay policy
    /// Default: 20 requests per 5 minutes, 10 minute block
    #[serde(default = "RateLimitPolicy::chat")]
    pub chat: RateLimitPolicy,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            trust_proxy_headers: true,
            sweep_interval_ms: default_sweep_interval_ms(),
            retention_ms: default_retention_ms(),
            lead: RateLimitPolicy::lead(),
            chat: RateLimitPolicy::chat(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_sweep_interval_ms() -> u64 {
    DEFAULT_SWEEP_INTERVAL_MS
}

fn default_retention_ms() -> u64 {
    DEFAULT_RETENTION_MS
}
