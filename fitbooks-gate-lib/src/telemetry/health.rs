use hyper::Response;
use hyper::StatusCode;
use serde_json::{json, Value};

use crate::api::{full_body, RespBody};
use crate::error::{GateError, Result};

/// Which upstream collaborators are configured.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Readiness {
    pub lead_ready: bool,
    pub chat_ready: bool,
}

impl Readiness {
    pub fn is_ready(&self) -> bool {
        self.lead_ready && self.chat_ready
    }

    fn missing(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if !self.lead_ready {
            missing.push("lead_not_configured");
        }
        if !self.chat_ready {
            missing.push("chat_not_configured");
        }
        missing
    }
}

fn json_response(status: StatusCode, body: Value) -> Result<Response<RespBody>> {
    let body_bytes = serde_json::to_vec(&body)
        .map_err(|e| GateError::Http(format!("Failed to serialize health response: {e}")))?;

    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(full_body(body_bytes))
        .map_err(|e| GateError::Http(format!("Failed to build health response: {e}")))
}

/// Health check response - always returns 200 if process is running
pub fn health_check_response() -> Result<Response<RespBody>> {
    json_response(StatusCode::OK, json!({"status": "healthy"}))
}

/// Readiness check - 200 when both endpoints have their upstreams configured,
/// 503 listing what is missing otherwise
pub fn ready_check_response(readiness: &Readiness) -> Result<Response<RespBody>> {
    if readiness.is_ready() {
        json_response(StatusCode::OK, json!({"status": "ready"}))
    } else {
        json_response(
            StatusCode::SERVICE_UNAVAILABLE,
            json!({"status": "not_ready", "reasons": readiness.missing()}),
        )
    }
}

/// Liveness check - always returns 200 if process is running
pub fn live_check_response() -> Result<Response<RespBody>> {
    json_response(StatusCode::OK, json!({"status": "alive"}))
}
