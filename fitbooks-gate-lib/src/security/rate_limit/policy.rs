use serde::Deserialize;

use crate::error::{GateError, Result};

/// Sliding-window quota with an optional escalation block.
///
/// ```toml
/// [rate_limit.lead]
/// window_ms = 600000
/// max_requests = 6
/// block_ms = 900000
/// ```
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    /// Length of the sliding window in milliseconds. Must be > 0.
    pub window_ms: u64,
    /// Requests admitted within one window. Must be > 0.
    pub max_requests: u32,
    /// Penalty applied once the quota is exceeded. `None` or 0 means the caller
    /// only waits for the window to slide.
    #[serde(default)]
    pub block_ms: Option<u64>,
}

impl RateLimitPolicy {
    pub const fn new(window_ms: u64, max_requests: u32) -> Self {
        Self {
            window_ms,
            max_requests,
            block_ms: None,
        }
    }

    pub const fn with_block_ms(mut self, block_ms: u64) -> Self {
        self.block_ms = Some(block_ms);
        self
    }

    /// Lead intake: 6 requests per 10 minutes, 15 minute block.
    pub const fn lead() -> Self {
        Self::new(10 * 60_000, 6).with_block_ms(15 * 60_000)
    }

    /// Chat relay: 20 requests per 5 minutes, 10 minute block.
    pub const fn chat() -> Self {
        Self::new(5 * 60_000, 20).with_block_ms(10 * 60_000)
    }

    /// The block duration if escalation is enabled.
    pub fn escalation_ms(&self) -> Option<u64> {
        self.block_ms.filter(|ms| *ms > 0)
    }

    /// Reject policies the limiter cannot meaningfully apply.
    pub fn validate(&self, name: &str) -> Result<()> {
        if self.window_ms == 0 {
            return Err(GateError::Config(format!(
                "rate_limit.{name}.window_ms must be > 0"
            )));
        }
        if self.max_requests == 0 {
            return Err(GateError::Config(format!(
                "rate_limit.{name}.max_requests must be > 0"
            )));
        }
        Ok(())
    }
}
