use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use super::{build_http_client, Lead, LeadReceipt, LeadSink, UpstreamError};
use crate::error::Result;

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct WebhookReply {
    #[serde(default)]
    existing_contact: bool,
}

/// Posts accepted leads as JSON to an automation webhook.
///
/// The webhook may answer with `{"existingContact": true}` to report a
/// duplicate; any other 2xx body is treated as a new lead.
pub struct WebhookLeadSink {
    client: reqwest::Client,
    url: String,
    token: Option<String>,
}

impl WebhookLeadSink {
    pub fn new(url: impl Into<String>, token: Option<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_http_client(timeout)?,
            url: url.into(),
            token,
        })
    }
}

#[async_trait]
impl LeadSink for WebhookLeadSink {
    async fn submit(&self, lead: &Lead) -> std::result::Result<LeadReceipt, UpstreamError> {
        let mut request = self.client.post(&self.url).json(lead);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "Lead webhook request failed");
            return Err(UpstreamError::Status(status.as_u16()));
        }

        let body = response.bytes().await?;
        let reply = serde_json::from_slice::<WebhookReply>(&body).unwrap_or_default();
        debug!(
            existing_contact = reply.existing_contact,
            "Lead delivered to webhook"
        );

        Ok(LeadReceipt {
            existing_contact: reply.existing_contact,
        })
    }
}
