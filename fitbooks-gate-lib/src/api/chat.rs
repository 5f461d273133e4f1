use bytes::Bytes;
use http::StatusCode;
use hyper::body::Body;
use hyper::{Request, Response};
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::LazyLock;
use std::time::Instant;
use tracing::{debug, error, warn};

use super::body::read_json_body;
use super::guard::{Admission, Endpoint};
use super::lead::record_upstream;
use super::response::{json_response, ApiError};
use super::state::AppState;
use super::RespBody;
use crate::telemetry::metrics::values;
use crate::upstream::{ChatRequest, UpstreamError};

/// `None` only if the pattern fails to compile; matching then fails closed.
static RESPONSE_ID_PATTERN: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"^resp_[A-Za-z0-9]+$")
        .inspect_err(|e| tracing::error!("Failed to compile response id regex: {e}"))
        .ok()
});

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ChatAnswer {
    ok: bool,
    code: &'static str,
    answer: String,
    response_id: Option<String>,
}

fn trimmed_str<'a>(body: &'a Value, field: &str) -> Option<&'a str> {
    body.get(field)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn is_response_id(value: &str) -> bool {
    RESPONSE_ID_PATTERN
        .as_ref()
        .is_some_and(|re| re.is_match(value))
}

/// Map a provider failure to the client-facing error.
///
/// A provider 400 means the conversation state was rejected (for example an
/// expired `previousResponseId`), so it is reported as the caller's fault.
fn provider_error(e: &UpstreamError) -> ApiError {
    match e {
        UpstreamError::Status(400) => ApiError::InvalidRequest,
        UpstreamError::Status(_) | UpstreamError::Decode(_) => ApiError::ProviderUnavailable,
        UpstreamError::Timeout => ApiError::ProviderTimeout,
        UpstreamError::Transport(_) => ApiError::ServerError,
    }
}

/// `POST /api/chat`
pub async fn handle_chat<B>(
    state: &AppState,
    req: Request<B>,
    peer: SocketAddr,
) -> Response<RespBody>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let decision = match state.guard.admit(Endpoint::Chat, req.headers(), peer) {
        Admission::Proceed(decision) => decision,
        Admission::Reject(resp) => return resp,
    };
    let fail = |e: ApiError| e.into_response(Some(&decision));

    let Some(provider) = &state.chat_provider else {
        warn!("Chat rejected: provider API key not configured");
        return fail(ApiError::ServerMisconfigured);
    };

    let body = match read_json_body(req.into_body(), state.chat_max_body_bytes).await {
        Ok(body) => body,
        Err(e) => return fail(e),
    };

    let Some(message) = trimmed_str(&body, "message") else {
        return fail(ApiError::MessageRequired);
    };
    if message.chars().count() > state.max_message_chars {
        return fail(ApiError::MessageTooLong);
    }

    let previous_response_id = trimmed_str(&body, "previousResponseId");
    if let Some(id) = previous_response_id {
        if !is_response_id(id) {
            return fail(ApiError::InvalidRequest);
        }
    }

    let request = ChatRequest {
        message: message.to_string(),
        previous_response_id: previous_response_id.map(str::to_string),
    };

    let started = Instant::now();
    let reply = provider.respond(&request).await;
    record_upstream(state, values::UPSTREAM_CHAT, started, reply.as_ref().err());

    let reply = match reply {
        Ok(reply) => reply,
        Err(e) => {
            let api_error = provider_error(&e);
            if api_error == ApiError::ServerError {
                error!(error = %e, "Chat provider request failed");
            } else {
                warn!(error = %e, "Chat provider request failed");
            }
            return fail(api_error);
        }
    };

    if reply.answer.is_empty() {
        warn!("Chat provider returned an empty answer");
        return fail(ApiError::ProviderUnavailable);
    }

    debug!(
        has_response_id = reply.response_id.is_some(),
        "Chat answered"
    );
    json_response(
        StatusCode::OK,
        &ChatAnswer {
            ok: true,
            code: "ok",
            answer: reply.answer,
            response_id: reply.response_id,
        },
        Some(&decision),
    )
}
