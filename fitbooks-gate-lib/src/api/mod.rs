//! Public API endpoints.
//!
//! Both endpoints run the admission guard before anything else, then parse a
//! size-limited JSON body and call their upstream:
//!
//! - `POST /api/lead`: validate, verify captcha, deliver to the lead sink
//! - `POST /api/chat`: validate, relay to the chat provider
//!
//! Every response is JSON. Responses that passed the guard carry the
//! `x-ratelimit-*` headers of that decision.

mod body;
mod chat;
mod guard;
mod lead;
mod response;
mod state;

use bytes::Bytes;
use http::header::{HeaderValue, ALLOW};
use http::Method;
use http_body_util::{combinators::BoxBody, BodyExt, Full};
use hyper::body::Body;
use hyper::{Request, Response};
use std::net::SocketAddr;
use std::time::Instant;

pub use body::{optional_string, read_json_body};
pub use chat::handle_chat;
pub use guard::{Admission, AdmissionGuard, Endpoint};
pub use lead::handle_lead;
pub use response::{json_response, ApiError};
pub use state::AppState;

pub type RespBody = BoxBody<Bytes, hyper::Error>;

pub const LEAD_PATH: &str = "/api/lead";
pub const CHAT_PATH: &str = "/api/chat";

pub fn full_body(bytes: impl Into<Bytes>) -> RespBody {
    Full::new(bytes.into())
        .map_err(|never| match never {})
        .boxed()
}

fn method_not_allowed() -> Response<RespBody> {
    let mut resp = ApiError::MethodNotAllowed.into_response(None);
    resp.headers_mut()
        .insert(ALLOW, HeaderValue::from_static("POST"));
    resp
}

/// Route a request to its endpoint handler.
pub async fn handle_request<B>(
    state: &AppState,
    req: Request<B>,
    peer: SocketAddr,
) -> Response<RespBody>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let started = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let (route, resp) = match path.as_str() {
        LEAD_PATH if method != Method::POST => (LEAD_PATH, method_not_allowed()),
        CHAT_PATH if method != Method::POST => (CHAT_PATH, method_not_allowed()),
        LEAD_PATH => (LEAD_PATH, handle_lead(state, req, peer).await),
        CHAT_PATH => (CHAT_PATH, handle_chat(state, req, peer).await),
        _ => ("unmatched", ApiError::NotFound.into_response(None)),
    };

    if let Some(m) = &state.metrics {
        m.record_request(
            route,
            method.as_str(),
            resp.status().as_u16(),
            started.elapsed().as_secs_f64(),
        );
    }

    resp
}
