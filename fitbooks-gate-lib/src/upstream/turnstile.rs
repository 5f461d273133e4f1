use async_trait::async_trait;
use std::time::Duration;
use tracing::warn;

use super::{build_http_client, CaptchaVerifier, UpstreamError};
use crate::error::Result;
use crate::security::CaptchaVerification;

/// Cloudflare Turnstile siteverify client.
pub struct TurnstileVerifier {
    client: reqwest::Client,
    verify_url: String,
    secret: String,
}

impl TurnstileVerifier {
    pub fn new(
        verify_url: impl Into<String>,
        secret: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        Ok(Self {
            client: build_http_client(timeout)?,
            verify_url: verify_url.into(),
            secret: secret.into(),
        })
    }
}

#[async_trait]
impl CaptchaVerifier for TurnstileVerifier {
    async fn verify(
        &self,
        token: &str,
        remote_ip: Option<&str>,
    ) -> std::result::Result<CaptchaVerification, UpstreamError> {
        let mut form = vec![("secret", self.secret.as_str()), ("response", token)];
        if let Some(ip) = remote_ip {
            form.push(("remoteip", ip));
        }

        let response = self
            .client
            .post(&self.verify_url)
            .form(&form)
            .send()
            .await?;

        if !response.status().is_success() {
            warn!(
                status = response.status().as_u16(),
                "Captcha verification request failed"
            );
            return Ok(CaptchaVerification::failed());
        }

        // An unreadable body counts as a failed verification, not an outage.
        match response.json::<CaptchaVerification>().await {
            Ok(verification) => Ok(verification),
            Err(e) => {
                warn!(error = %e, "Captcha verification response was not valid JSON");
                Ok(CaptchaVerification::failed())
            }
        }
    }
}
