use serde::Deserialize;
use std::path::PathBuf;

/// Lead intake configuration
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct LeadConfig {
    /// Largest accepted request body in bytes
    /// Default: 10240
    #[serde(default = "default_lead_max_body_bytes")]
    pub max_body_bytes: usize,
    /// Webhook that receives accepted leads as JSON
    /// If not set, the endpoint answers `server_misconfigured`
    #[serde(default)]
    pub webhook_url: Option<String>,
    /// Bearer token environment variable sent to the webhook (optional)
    #[serde(default)]
    pub webhook_token_env: Option<String>,
    /// Webhook request timeout in milliseconds
    /// Default: 10000
    #[serde(default = "default_lead_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for LeadConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: default_lead_max_body_bytes(),
            webhook_url: None,
            webhook_token_env: None,
            timeout_ms: default_lead_timeout_ms(),
        }
    }
}

fn default_lead_max_body_bytes() -> usize {
    10_240
}

fn default_lead_timeout_ms() -> u64 {
    10_000
}

/// Captcha (Turnstile) verification configuration
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct CaptchaConfig {
    /// Siteverify endpoint
    /// Default: "https://challenges.cloudflare.com/turnstile/v0/siteverify"
    #[serde(default = "default_verify_url")]
    pub verify_url: String,
    /// Environment variable holding the secret key
    /// Default: "TURNSTILE_SECRET_KEY"
    #[serde(default = "default_secret_env")]
    pub secret_env: String,
    /// Oldest accepted challenge in seconds
    /// Default: 300
    #[serde(default = "default_max_age_secs")]
    pub max_age_secs: u64,
    /// Hostnames the challenge must have been solved on (case-insensitive)
    /// Default: empty (any hostname)
    #[serde(default)]
    pub allowed_hostnames: Vec<String>,
    /// Widget action the challenge must carry (optional)
    #[serde(default)]
    pub expected_action: Option<String>,
    /// Verification request timeout in milliseconds
    /// Default: 10000
    #[serde(default = "default_captcha_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for CaptchaConfig {
    fn default() -> Self {
        Self {
            verify_url: default_verify_url(),
            secret_env: default_secret_env(),
            max_age_secs: default_max_age_secs(),
            allowed_hostnames: vec![],
            expected_action: None,
            timeout_ms: default_captcha_timeout_ms(),
        }
    }
}

fn default_verify_url() -> String {
    "https://challenges.cloudflare.com/turnstile/v0/siteverify".to_string()
}

fn default_secret_env() -> String {
    "TURNSTILE_SECRET_KEY".to_string()
}

fn default_max_age_secs() -> u64 {
    300
}

fn default_captcha_timeout_ms() -> u64 {
    10_000
}

/// Chat relay configuration
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ChatConfig {
    /// Largest accepted request body in bytes
    /// Default: 8192
    #[serde(default = "default_chat_max_body_bytes")]
    pub max_body_bytes: usize,
    /// Longest accepted message in characters
    /// Default: 2000
    #[serde(default = "default_max_message_chars")]
    pub max_message_chars: usize,
    /// Responses API endpoint
    /// Default: "https://api.openai.com/v1/responses"
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Model name sent with every request
    /// Default: "gpt-5-nano"
    #[serde(default = "default_model")]
    pub model: String,
    /// Environment variable holding the API key
    /// Default: "OPENAI_API_KEY"
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// File with the assistant instructions (optional)
    /// A short built-in prompt is used when not set
    #[serde(default)]
    pub system_prompt_path: Option<PathBuf>,
    /// Provider request timeout in milliseconds
    /// Default: 20000
    #[serde(default = "default_chat_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: default_chat_max_body_bytes(),
            max_message_chars: default_max_message_chars(),
            api_url: default_api_url(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            system_prompt_path: None,
            timeout_ms: default_chat_timeout_ms(),
        }
    }
}

fn default_chat_max_body_bytes() -> usize {
    8_192
}

fn default_max_message_chars() -> usize {
    2_000
}

fn default_api_url() -> String {
    "https://api.openai.com/v1/responses".to_string()
}

fn default_model() -> String {
    "gpt-5-nano".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_chat_timeout_ms() -> u64 {
    20_000
}
