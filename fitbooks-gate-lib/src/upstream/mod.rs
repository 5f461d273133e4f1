//! Clients for the third-party APIs behind the guarded endpoints.
//!
//! Each collaborator sits behind a trait so handlers can be exercised without
//! network access:
//!
//! - [`CaptchaVerifier`]: Turnstile siteverify (`turnstile.rs`)
//! - [`LeadSink`]: JSON webhook receiving accepted leads (`webhook.rs`)
//! - [`ChatProvider`]: hosted LLM responses API (`responses.rs`)
//!
//! Every outbound request carries a fixed timeout.

mod responses;
mod turnstile;
mod webhook;

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

use crate::error::{GateError, Result};
use crate::security::CaptchaVerification;

pub use responses::{extract_response_text, ResponsesClient, ResponsesPayload};
pub use turnstile::TurnstileVerifier;
pub use webhook::WebhookLeadSink;

/// Failure talking to an upstream API
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UpstreamError {
    #[error("Upstream request timed out")]
    Timeout,

    #[error("Upstream responded with status {0}")]
    Status(u16),

    #[error("Upstream transport error: {0}")]
    Transport(String),

    #[error("Failed to decode upstream response: {0}")]
    Decode(String),
}

impl UpstreamError {
    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            UpstreamError::Timeout => "timeout",
            UpstreamError::Status(_) => "status",
            UpstreamError::Transport(_) => "transport",
            UpstreamError::Decode(_) => "decode",
        }
    }
}

impl From<reqwest::Error> for UpstreamError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            UpstreamError::Timeout
        } else if e.is_decode() {
            UpstreamError::Decode(e.to_string())
        } else {
            UpstreamError::Transport(e.to_string())
        }
    }
}

/// A lead that passed validation and captcha verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub business_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hutk: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LeadReceipt {
    /// The sink already knew this contact.
    pub existing_contact: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    pub message: String,
    pub previous_response_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatReply {
    /// Trimmed answer text; may be empty if the provider produced none.
    pub answer: String,
    pub response_id: Option<String>,
}

#[async_trait]
pub trait CaptchaVerifier: Send + Sync {
    /// Verify a widget token. A rejected token is `Ok` with `success == false`;
    /// `Err` means the provider could not be reached.
    async fn verify(
        &self,
        token: &str,
        remote_ip: Option<&str>,
    ) -> std::result::Result<CaptchaVerification, UpstreamError>;
}

#[async_trait]
pub trait LeadSink: Send + Sync {
    async fn submit(&self, lead: &Lead) -> std::result::Result<LeadReceipt, UpstreamError>;
}

#[async_trait]
pub trait ChatProvider: Send + Sync {
    async fn respond(&self, request: &ChatRequest)
        -> std::result::Result<ChatReply, UpstreamError>;
}

/// Shared HTTP client with a per-request timeout.
pub fn build_http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("fitbooks-gate/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| GateError::Upstream(format!("Failed to build HTTP client: {e}")))
}
