use serde::Deserialize;
use std::net::SocketAddr;

use super::rate_limit::RateLimitConfig;
use super::telemetry::{LoggingConfig, TelemetryConfig};
use super::upstream::{CaptchaConfig, ChatConfig, LeadConfig};

/// Timeout configuration
#[derive(Debug, Deserialize, Clone)]
pub struct TimeoutConfig {
    /// Graceful shutdown timeout in seconds
    /// Active connections get this long to finish after SIGTERM/SIGINT
    /// Default: 30
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            shutdown_secs: default_shutdown_timeout(),
        }
    }
}

fn default_shutdown_timeout() -> u64 {
    30
}

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Address and port to listen on
    /// Example: "0.0.0.0:8080"
    pub listen: SocketAddr,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Telemetry configuration (metrics and health checks)
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    /// Timeout configuration
    #[serde(default)]
    pub timeout: TimeoutConfig,
    /// Admission control for the API endpoints
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    /// Lead intake endpoint
    #[serde(default)]
    pub lead: LeadConfig,
    /// Captcha verification used by lead intake
    #[serde(default)]
    pub captcha: CaptchaConfig,
    /// Chat relay endpoint
    #[serde(default)]
    pub chat: ChatConfig,
}
