use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::{ChatConfig, Config, LeadConfig};
use crate::error::{GateError, Result};
use crate::security::rate_limit::{InMemoryBucketStore, SystemClock};
use crate::security::{CaptchaPolicy, RateLimiter};
use crate::telemetry::{Metrics, Readiness};
use crate::upstream::{
    CaptchaVerifier, ChatProvider, LeadSink, ResponsesClient, TurnstileVerifier, WebhookLeadSink,
};

use super::guard::AdmissionGuard;

const DEFAULT_SYSTEM_PROMPT: &str = "You are the FitBooks website assistant. Answer questions \
about FitBooks bookkeeping services for fitness businesses briefly and accurately. If you do \
not know an answer, suggest contacting the team through the website form.";

/// Everything a request handler needs; shared across connections.
///
/// Upstreams are optional: a missing one makes its endpoint answer
/// `server_misconfigured` instead of failing startup.
pub struct AppState {
    pub guard: AdmissionGuard,
    pub lead_max_body_bytes: usize,
    pub chat_max_body_bytes: usize,
    pub max_message_chars: usize,
    pub captcha_policy: CaptchaPolicy,
    pub captcha: Option<Arc<dyn CaptchaVerifier>>,
    pub lead_sink: Option<Arc<dyn LeadSink>>,
    pub chat_provider: Option<Arc<dyn ChatProvider>>,
    pub metrics: Option<Arc<Metrics>>,
}

impl AppState {
    /// State with no upstreams and the config defaults for everything else.
    pub fn new(guard: AdmissionGuard) -> Self {
        let lead = LeadConfig::default();
        let chat = ChatConfig::default();
        Self {
            guard,
            lead_max_body_bytes: lead.max_body_bytes,
            chat_max_body_bytes: chat.max_body_bytes,
            max_message_chars: chat.max_message_chars,
            captcha_policy: CaptchaPolicy::default(),
            captcha: None,
            lead_sink: None,
            chat_provider: None,
            metrics: None,
        }
    }

    pub fn with_captcha(mut self, captcha: Arc<dyn CaptchaVerifier>) -> Self {
        self.captcha = Some(captcha);
        self
    }

    pub fn with_captcha_policy(mut self, policy: CaptchaPolicy) -> Self {
        self.captcha_policy = policy;
        self
    }

    pub fn with_lead_sink(mut self, sink: Arc<dyn LeadSink>) -> Self {
        self.lead_sink = Some(sink);
        self
    }

    pub fn with_chat_provider(mut self, provider: Arc<dyn ChatProvider>) -> Self {
        self.chat_provider = Some(provider);
        self
    }

    pub fn with_metrics(mut self, metrics: Option<Arc<Metrics>>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Wire the state from configuration and the process environment.
    ///
    /// Secrets are read from the environment variables named in the config;
    /// an unset or blank variable leaves the matching upstream unconfigured.
    pub fn from_config(config: &Config, metrics: Option<Arc<Metrics>>) -> Result<Self> {
        let store = InMemoryBucketStore::with_settings(
            config.rate_limit.sweep_interval_ms,
            config.rate_limit.retention_ms,
        );
        let limiter = Arc::new(RateLimiter::new(Arc::new(store), Arc::new(SystemClock)));
        let guard = AdmissionGuard::new(limiter, &config.rate_limit).with_metrics(metrics.clone());

        let mut state =
            Self::new(guard)
                .with_metrics(metrics)
                .with_captcha_policy(CaptchaPolicy::new(
                    Duration::from_secs(config.captcha.max_age_secs),
                    &config.captcha.allowed_hostnames,
                    config.captcha.expected_action.as_deref(),
                ));
        state.lead_max_body_bytes = config.lead.max_body_bytes;
        state.chat_max_body_bytes = config.chat.max_body_bytes;
        state.max_message_chars = config.chat.max_message_chars;

        match env_secret(&config.captcha.secret_env) {
            Some(secret) => {
                let verifier = TurnstileVerifier::new(
                    config.captcha.verify_url.clone(),
                    secret,
                    Duration::from_millis(config.captcha.timeout_ms),
                )?;
                state = state.with_captcha(Arc::new(verifier));
            }
            None => warn!(env = %config.captcha.secret_env, "Captcha secret not set"),
        }

        match &config.lead.webhook_url {
            Some(url) => {
                let token = config
                    .lead
                    .webhook_token_env
                    .as_deref()
                    .and_then(env_secret);
                let sink = WebhookLeadSink::new(
                    url.clone(),
                    token,
                    Duration::from_millis(config.lead.timeout_ms),
                )?;
                state = state.with_lead_sink(Arc::new(sink));
            }
            None => warn!("Lead webhook not configured"),
        }

        match env_secret(&config.chat.api_key_env) {
            Some(api_key) => {
                let instructions = match &config.chat.system_prompt_path {
                    Some(path) => std::fs::read_to_string(path).map_err(|e| {
                        GateError::Config(format!(
                            "Failed to read system prompt {}: {e}",
                            path.display()
                        ))
                    })?,
                    None => DEFAULT_SYSTEM_PROMPT.to_string(),
                };
                let client = ResponsesClient::new(
                    config.chat.api_url.clone(),
                    api_key,
                    config.chat.model.clone(),
                    instructions.trim().to_string(),
                    Duration::from_millis(config.chat.timeout_ms),
                )?;
                state = state.with_chat_provider(Arc::new(client));
            }
            None => warn!(env = %config.chat.api_key_env, "Chat API key not set"),
        }

        let readiness = state.readiness();
        info!(
            lead_ready = readiness.lead_ready,
            chat_ready = readiness.chat_ready,
            "Application state initialized"
        );

        Ok(state)
    }

    pub fn readiness(&self) -> Readiness {
        Readiness {
            lead_ready: self.captcha.is_some() && self.lead_sink.is_some(),
            chat_ready: self.chat_provider.is_some(),
        }
    }
}

fn env_secret(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
