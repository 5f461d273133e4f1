use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

use super::{build_http_client, ChatProvider, ChatReply, ChatRequest, UpstreamError};
use crate::error::Result;

#[derive(Debug, Serialize)]
struct ResponsesRequest<'a> {
    model: &'a str,
    instructions: &'a str,
    input: &'a str,
    store: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    previous_response_id: Option<&'a str>,
}

#[derive(Debug, Deserialize, Default)]
pub struct OutputChunk {
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct OutputItem {
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub content: Option<Vec<OutputChunk>>,
}

/// The subset of a responses API reply the relay reads.
#[derive(Debug, Deserialize, Default)]
pub struct ResponsesPayload {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub output_text: Option<String>,
    #[serde(default)]
    pub output: Vec<OutputItem>,
}

/// Answer text of a reply.
///
/// Prefers the aggregated `output_text`; otherwise joins the `output_text`
/// chunks of every `message` item with newlines.
pub fn extract_response_text(payload: &ResponsesPayload) -> String {
    if let Some(text) = payload.output_text.as_deref().map(str::trim) {
        if !text.is_empty() {
            return text.to_string();
        }
    }

    payload
        .output
        .iter()
        .filter(|item| item.kind.as_deref() == Some("message"))
        .filter_map(|item| item.content.as_ref())
        .flatten()
        .filter(|chunk| chunk.kind.as_deref() == Some("output_text"))
        .filter_map(|chunk| chunk.text.as_deref())
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Client for an OpenAI-compatible `/v1/responses` endpoint.
pub struct ResponsesClient {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
    instructions: String,
}

impl ResponsesClient {
    pub fn new(
        api_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        instructions: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        Ok(Self {
            client: build_http_client(timeout)?,
            api_url: api_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            instructions: instructions.into(),
        })
    }
}

#[async_trait]
impl ChatProvider for ResponsesClient {
    async fn respond(
        &self,
        request: &ChatRequest,
    ) -> std::result::Result<ChatReply, UpstreamError> {
        let body = ResponsesRequest {
            model: &self.model,
            instructions: &self.instructions,
            input: &request.message,
            store: true,
            previous_response_id: request.previous_response_id.as_deref(),
        };

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "Chat provider request failed");
            return Err(UpstreamError::Status(status.as_u16()));
        }

        let bytes = response.bytes().await?;
        let payload: ResponsesPayload =
            serde_json::from_slice(&bytes).map_err(|e| UpstreamError::Decode(e.to_string()))?;

        Ok(ChatReply {
            answer: extract_response_text(&payload),
            response_id: payload.id,
        })
    }
}
