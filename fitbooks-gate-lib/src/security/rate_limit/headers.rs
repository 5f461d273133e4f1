use http::header::{HeaderMap, HeaderName, HeaderValue, RETRY_AFTER};

use super::limiter::RateLimitDecision;

/// Response header names advertised for every guarded request.
pub mod names {
    pub const LIMIT: &str = "x-ratelimit-limit";
    pub const REMAINING: &str = "x-ratelimit-remaining";
    /// Epoch seconds at which the window or block resets.
    pub const RESET: &str = "x-ratelimit-reset";
    pub const RETRY_AFTER: &str = "retry-after";
}

/// Project a decision into `(name, value)` header pairs.
///
/// `retry-after` is only present when the request was denied.
pub fn rate_limit_headers(decision: &RateLimitDecision) -> Vec<(HeaderName, HeaderValue)> {
    let mut headers = vec![
        (
            HeaderName::from_static(names::LIMIT),
            HeaderValue::from(decision.limit),
        ),
        (
            HeaderName::from_static(names::REMAINING),
            HeaderValue::from(decision.remaining),
        ),
        (
            HeaderName::from_static(names::RESET),
            HeaderValue::from(decision.reset_at_secs()),
        ),
    ];

    if !decision.allowed {
        headers.push((RETRY_AFTER, HeaderValue::from(decision.retry_after_secs)));
    }

    headers
}

/// Insert the projected headers into `headers`, replacing existing values.
pub fn apply_rate_limit_headers(headers: &mut HeaderMap, decision: &RateLimitDecision) {
    for (name, value) in rate_limit_headers(decision) {
        headers.insert(name, value);
    }
}
