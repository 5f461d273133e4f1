//! Shared fakes and request builders for API tests

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use fitbooks_gate_lib::api::{AdmissionGuard, AppState, RespBody};
use fitbooks_gate_lib::config::RateLimitConfig;
use fitbooks_gate_lib::security::rate_limit::{InMemoryBucketStore, ManualClock};
use fitbooks_gate_lib::security::{CaptchaVerification, RateLimiter};
use fitbooks_gate_lib::upstream::{
    CaptchaVerifier, ChatProvider, ChatReply, ChatRequest, Lead, LeadReceipt, LeadSink,
    UpstreamError,
};
use http::{Method, Request, Response};
use http_body_util::{BodyExt, Full};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

pub type TestResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

pub const START_MS: u64 = 1_700_000_000_000;

pub fn peer() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 40_000))
}

pub struct FakeCaptcha {
    result: Result<CaptchaVerification, UpstreamError>,
    pub calls: Mutex<Vec<(String, Option<String>)>>,
}

impl FakeCaptcha {
    pub fn passing() -> Arc<Self> {
        Self::with(Ok(CaptchaVerification {
            success: true,
            ..CaptchaVerification::default()
        }))
    }

    pub fn with(result: Result<CaptchaVerification, UpstreamError>) -> Arc<Self> {
        Arc::new(Self {
            result,
            calls: Mutex::new(vec![]),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or(0)
    }
}

#[async_trait]
impl CaptchaVerifier for FakeCaptcha {
    async fn verify(
        &self,
        token: &str,
        remote_ip: Option<&str>,
    ) -> Result<CaptchaVerification, UpstreamError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((token.to_string(), remote_ip.map(str::to_string)));
        }
        self.result.clone()
    }
}

pub struct FakeSink {
    result: Result<LeadReceipt, UpstreamError>,
    pub leads: Mutex<Vec<Lead>>,
}

impl FakeSink {
    pub fn new_contact() -> Arc<Self> {
        Self::with(Ok(LeadReceipt {
            existing_contact: false,
        }))
    }

    pub fn with(result: Result<LeadReceipt, UpstreamError>) -> Arc<Self> {
        Arc::new(Self {
            result,
            leads: Mutex::new(vec![]),
        })
    }

    pub fn submitted(&self) -> Vec<Lead> {
        self.leads.lock().map(|l| l.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl LeadSink for FakeSink {
    async fn submit(&self, lead: &Lead) -> Result<LeadReceipt, UpstreamError> {
        if let Ok(mut leads) = self.leads.lock() {
            leads.push(lead.clone());
        }
        self.result.clone()
    }
}

pub struct FakeChat {
    result: Result<ChatReply, UpstreamError>,
    pub requests: Mutex<Vec<ChatRequest>>,
}

impl FakeChat {
    pub fn answering(answer: &str, response_id: Option<&str>) -> Arc<Self> {
        Self::with(Ok(ChatReply {
            answer: answer.to_string(),
            response_id: response_id.map(str::to_string),
        }))
    }

    pub fn with(result: Result<ChatReply, UpstreamError>) -> Arc<Self> {
        Arc::new(Self {
            result,
            requests: Mutex::new(vec![]),
        })
    }

    pub fn received(&self) -> Vec<ChatRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ChatProvider for FakeChat {
    async fn respond(&self, request: &ChatRequest) -> Result<ChatReply, UpstreamError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        self.result.clone()
    }
}

/// Guard on a manual clock with the given rate limit settings.
pub fn guard_with(config: &RateLimitConfig) -> (AdmissionGuard, ManualClock) {
    let clock = ManualClock::new(START_MS);
    let limiter = RateLimiter::new(
        Arc::new(InMemoryBucketStore::new()),
        Arc::new(clock.clone()),
    );
    (AdmissionGuard::new(Arc::new(limiter), config), clock)
}

/// App state with default rate limits and no upstreams.
pub fn bare_state() -> AppState {
    AppState::new(guard_with(&RateLimitConfig::default()).0)
}

pub fn post_json(path: &str, body: &str) -> Result<Request<Full<Bytes>>, http::Error> {
    request(Method::POST, path, body, &[])
}

pub fn request(
    method: Method,
    path: &str,
    body: &str,
    headers: &[(&str, &str)],
) -> Result<Request<Full<Bytes>>, http::Error> {
    let mut builder = Request::builder()
        .method(method)
        .uri(path)
        .header("content-type", "application/json");
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    builder.body(Full::new(Bytes::from(body.to_string())))
}

pub async fn body_json(
    resp: Response<RespBody>,
) -> Result<Value, Box<dyn std::error::Error + Send + Sync>> {
    let bytes = resp.into_body().collect().await?.to_bytes();
    Ok(serde_json::from_slice(&bytes)?)
}

pub fn header<'a>(resp: &'a Response<RespBody>, name: &str) -> Option<&'a str> {
    resp.headers().get(name).and_then(|v| v.to_str().ok())
}
