use http::HeaderMap;
use hyper::Response;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::debug;

use super::response::ApiError;
use super::RespBody;
use crate::config::RateLimitConfig;
use crate::security::{client_ip, RateLimitDecision, RateLimitPolicy, RateLimiter};
use crate::telemetry::Metrics;

/// Endpoints with their own rate limit policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Lead,
    Chat,
}

impl Endpoint {
    /// Prefix of the limiter key; distinct per endpoint so one endpoint's
    /// traffic never consumes the other's quota.
    pub fn tag(&self) -> &'static str {
        match self {
            Endpoint::Lead => "lead",
            Endpoint::Chat => "chat",
        }
    }
}

/// Result of the admission check.
pub enum Admission {
    /// Continue handling; the decision's headers go on the final response.
    Proceed(RateLimitDecision),
    /// Answer with this 429 and stop.
    Reject(Response<RespBody>),
}

/// Per-endpoint rate limiting in front of the handlers.
pub struct AdmissionGuard {
    limiter: Arc<RateLimiter>,
    lead: RateLimitPolicy,
    chat: RateLimitPolicy,
    trust_proxy_headers: bool,
    metrics: Option<Arc<Metrics>>,
}

impl AdmissionGuard {
    pub fn new(limiter: Arc<RateLimiter>, config: &RateLimitConfig) -> Self {
        Self {
            limiter,
            lead: config.lead,
            chat: config.chat,
            trust_proxy_headers: config.trust_proxy_headers,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Option<Arc<Metrics>>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn policy(&self, endpoint: Endpoint) -> &RateLimitPolicy {
        match endpoint {
            Endpoint::Lead => &self.lead,
            Endpoint::Chat => &self.chat,
        }
    }

    pub fn client_ip(&self, headers: &HeaderMap, peer: SocketAddr) -> String {
        client_ip(headers, peer, self.trust_proxy_headers)
    }

    /// Limiter key for `ip` on `endpoint`.
    pub fn key(endpoint: Endpoint, ip: &str) -> String {
        format!("{}:{}", endpoint.tag(), ip)
    }

    /// Check the client behind `headers`/`peer` against the endpoint policy.
    ///
    /// Rejections are 429 `rate_limited` responses carrying the rate limit
    /// headers and `retry-after`.
    pub fn admit(&self, endpoint: Endpoint, headers: &HeaderMap, peer: SocketAddr) -> Admission {
        let route = endpoint.tag();
        let key = Self::key(endpoint, &self.client_ip(headers, peer));

        if let Some(m) = &self.metrics {
            m.record_rate_limit_request(route);
        }

        let decision = self.limiter.check(&key, self.policy(endpoint));

        if decision.allowed {
            debug!(
                route,
                remaining = decision.remaining,
                "Rate limit check passed"
            );
            if let Some(m) = &self.metrics {
                m.record_rate_limit_allowed(route);
            }
            return Admission::Proceed(decision);
        }

        if let Some(m) = &self.metrics {
            let reason = decision.denial.map(|d| d.as_str()).unwrap_or("window");
            m.record_rate_limit_rejection(route, reason);
        }

        Admission::Reject(ApiError::RateLimited.into_response(Some(&decision)))
    }
}
