use bytes::Bytes;
use chrono::Utc;
use http::StatusCode;
use hyper::body::Body;
use hyper::{Request, Response};
use regex::Regex;
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::LazyLock;
use std::time::Instant;
use tracing::{info, warn};

use super::body::{optional_string, read_json_body};
use super::guard::{Admission, Endpoint};
use super::response::{json_response, ApiError};
use super::state::AppState;
use super::RespBody;
use crate::security::UNKNOWN_CLIENT;
use crate::telemetry::metrics::values;
use crate::upstream::{Lead, UpstreamError};

/// `None` only if the pattern fails to compile; matching then fails closed.
static EMAIL_PATTERN: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$")
        .inspect_err(|e| tracing::error!("Failed to compile email regex: {e}"))
        .ok()
});

const EMAIL_MAX_CHARS: usize = 254;
const NAME_MAX_CHARS: usize = 80;
const CAPTCHA_TOKEN_MAX_CHARS: usize = 2_000;
const BUSINESS_TYPE_MAX_CHARS: usize = 80;
const MESSAGE_MAX_CHARS: usize = 2_000;
const PAGE_URI_MAX_CHARS: usize = 500;
const PAGE_NAME_MAX_CHARS: usize = 120;
const HUTK_MAX_CHARS: usize = 200;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LeadAccepted {
    ok: bool,
    code: &'static str,
    existing_contact: bool,
}

/// `POST /api/lead`
pub async fn handle_lead<B>(
    state: &AppState,
    req: Request<B>,
    peer: SocketAddr,
) -> Response<RespBody>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let decision = match state.guard.admit(Endpoint::Lead, req.headers(), peer) {
        Admission::Proceed(decision) => decision,
        Admission::Reject(resp) => return resp,
    };
    let client_ip = state.guard.client_ip(req.headers(), peer);
    let fail = |e: ApiError| e.into_response(Some(&decision));

    let body = match read_json_body(req.into_body(), state.lead_max_body_bytes).await {
        Ok(body) => body,
        Err(e) => return fail(e),
    };

    let email = optional_string(&body, "email", EMAIL_MAX_CHARS).map(|e| e.to_lowercase());
    let name = optional_string(&body, "name", NAME_MAX_CHARS);
    let (email, name) = match (email, name) {
        (Some(email), Some(name)) if is_email(&email) => (email, name),
        _ => return fail(ApiError::InvalidRequest),
    };

    let Some(token) = optional_string(&body, "captchaToken", CAPTCHA_TOKEN_MAX_CHARS) else {
        return fail(ApiError::CaptchaRequired);
    };

    let Some(verifier) = &state.captcha else {
        warn!("Lead rejected: captcha verifier not configured");
        return fail(ApiError::ServerMisconfigured);
    };

    let remote_ip = (client_ip != UNKNOWN_CLIENT).then_some(client_ip.as_str());
    let started = Instant::now();
    let verification = verifier.verify(&token, remote_ip).await;
    record_upstream(
        state,
        values::UPSTREAM_CAPTCHA,
        started,
        verification.as_ref().err(),
    );

    let verification = match verification {
        Ok(verification) => verification,
        Err(e) => {
            warn!(error = %e, "Captcha provider unreachable");
            return fail(ApiError::ServerError);
        }
    };

    if !state.captcha_policy.accepts(&verification, Utc::now()) {
        info!(
            success = verification.success,
            error_codes = ?verification.error_codes,
            "Lead rejected: captcha not accepted"
        );
        if let Some(m) = &state.metrics {
            m.record_captcha_rejection();
        }
        return fail(ApiError::CaptchaFailed);
    }

    let Some(sink) = &state.lead_sink else {
        warn!("Lead rejected: lead sink not configured");
        return fail(ApiError::ServerMisconfigured);
    };

    let lead = Lead {
        name,
        email,
        business_type: optional_string(&body, "businessType", BUSINESS_TYPE_MAX_CHARS),
        message: optional_string(&body, "message", MESSAGE_MAX_CHARS),
        page_uri: optional_string(&body, "pageUri", PAGE_URI_MAX_CHARS),
        page_name: optional_string(&body, "pageName", PAGE_NAME_MAX_CHARS),
        hutk: optional_string(&body, "hutk", HUTK_MAX_CHARS),
    };

    let started = Instant::now();
    let receipt = sink.submit(&lead).await;
    record_upstream(
        state,
        values::UPSTREAM_LEAD_SINK,
        started,
        receipt.as_ref().err(),
    );

    match receipt {
        Ok(receipt) => {
            let code = if receipt.existing_contact {
                "lead_already_exists"
            } else {
                "lead_submitted"
            };
            info!(code, "Lead accepted");
            json_response(
                StatusCode::OK,
                &LeadAccepted {
                    ok: true,
                    code,
                    existing_contact: receipt.existing_contact,
                },
                Some(&decision),
            )
        }
        Err(e) => {
            warn!(error = %e, "Lead sink request failed");
            fail(ApiError::CrmUnavailable)
        }
    }
}

fn is_email(value: &str) -> bool {
    EMAIL_PATTERN.as_ref().is_some_and(|re| re.is_match(value))
}

pub(super) fn record_upstream(
    state: &AppState,
    upstream: &str,
    started: Instant,
    error: Option<&UpstreamError>,
) {
    if let Some(m) = &state.metrics {
        m.record_upstream(
            upstream,
            started.elapsed().as_secs_f64(),
            error.map(UpstreamError::kind),
        );
    }
}
