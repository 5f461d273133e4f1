use http::header::{HeaderValue, CONTENT_TYPE};
use http::StatusCode;
use hyper::Response;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use super::{full_body, RespBody};
use crate::security::rate_limit::{apply_rate_limit_headers, RateLimitDecision};

/// Client-facing failures of the API endpoints.
///
/// Each variant carries a stable machine-readable code returned as
/// `{"ok": false, "code": "<code>"}`.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ApiError {
    #[error("Request body is not valid JSON")]
    InvalidJson,

    #[error("Request body exceeds the size limit")]
    PayloadTooLarge,

    #[error("Request fields are missing or malformed")]
    InvalidRequest,

    #[error("Captcha token missing")]
    CaptchaRequired,

    #[error("Captcha verification failed")]
    CaptchaFailed,

    #[error("Too many requests")]
    RateLimited,

    #[error("Required upstream is not configured")]
    ServerMisconfigured,

    #[error("Lead sink unavailable")]
    CrmUnavailable,

    #[error("Chat message missing")]
    MessageRequired,

    #[error("Chat message too long")]
    MessageTooLong,

    #[error("Chat provider unavailable")]
    ProviderUnavailable,

    #[error("Chat provider timed out")]
    ProviderTimeout,

    #[error("Unexpected server error")]
    ServerError,

    #[error("Not found")]
    NotFound,

    #[error("Method not allowed")]
    MethodNotAllowed,
}

impl ApiError {
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::InvalidJson => "invalid_json",
            ApiError::PayloadTooLarge => "payload_too_large",
            ApiError::InvalidRequest => "invalid_request",
            ApiError::CaptchaRequired => "captcha_required",
            ApiError::CaptchaFailed => "captcha_failed",
            ApiError::RateLimited => "rate_limited",
            ApiError::ServerMisconfigured => "server_misconfigured",
            ApiError::CrmUnavailable => "crm_unavailable",
            ApiError::MessageRequired => "message_required",
            ApiError::MessageTooLong => "message_too_long",
            ApiError::ProviderUnavailable | ApiError::ProviderTimeout => "provider_unavailable",
            ApiError::ServerError => "server_error",
            ApiError::NotFound => "not_found",
            ApiError::MethodNotAllowed => "method_not_allowed",
        }
    }

    pub fn status(&self) -> StatusCode {
        StatusCode::from(*self)
    }

    /// JSON error response, carrying rate limit headers when a decision exists.
    pub fn into_response(self, decision: Option<&RateLimitDecision>) -> Response<RespBody> {
        json_response(
            self.status(),
            &ErrorBody {
                ok: false,
                code: self.code(),
            },
            decision,
        )
    }
}

impl From<ApiError> for StatusCode {
    fn from(e: ApiError) -> StatusCode {
        match e {
            ApiError::InvalidJson
            | ApiError::InvalidRequest
            | ApiError::CaptchaRequired
            | ApiError::CaptchaFailed
            | ApiError::MessageRequired
            | ApiError::MessageTooLong => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::ServerMisconfigured | ApiError::ServerError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::CrmUnavailable | ApiError::ProviderUnavailable => StatusCode::BAD_GATEWAY,
            ApiError::ProviderTimeout => StatusCode::GATEWAY_TIMEOUT,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    ok: bool,
    code: &'static str,
}

const FALLBACK_BODY: &str = r#"{"ok":false,"code":"server_error"}"#;

/// Serialize `body` as a JSON response.
pub fn json_response<T: Serialize>(
    status: StatusCode,
    body: &T,
    decision: Option<&RateLimitDecision>,
) -> Response<RespBody> {
    let (status, bytes) = match serde_json::to_vec(body) {
        Ok(bytes) => (status, bytes),
        Err(e) => {
            error!(error = %e, "Failed to serialize response body");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                FALLBACK_BODY.as_bytes().to_vec(),
            )
        }
    };

    let mut resp = Response::new(full_body(bytes));
    *resp.status_mut() = status;
    resp.headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    if let Some(decision) = decision {
        apply_rate_limit_headers(resp.headers_mut(), decision);
    }
    resp
}
