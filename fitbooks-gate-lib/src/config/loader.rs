use std::fs;
use std::path::Path;

use crate::config::Config;
use crate::error::{GateError, Result};

pub fn load_from_path<P: AsRef<Path>>(p: P) -> Result<Config> {
    let txt = fs::read_to_string(p)
        .map_err(|e| GateError::Config(format!("Failed to read config file: {e}")))?;
    load_from_str(&txt)
}

pub fn load_from_str(txt: &str) -> Result<Config> {
    let cfg: Config = toml::from_str(txt)
        .map_err(|e| GateError::Config(format!("Failed to parse config: {e}")))?;

    validate(&cfg)?;

    Ok(cfg)
}

/// Startup checks; anything rejected here would otherwise surface as a
/// nonsensical decision at request time.
pub fn validate(cfg: &Config) -> Result<()> {
    cfg.rate_limit.lead.validate("lead")?;
    cfg.rate_limit.chat.validate("chat")?;

    if cfg.rate_limit.sweep_interval_ms == 0 {
        return Err(GateError::Config(
            "rate_limit.sweep_interval_ms must be > 0".into(),
        ));
    }
    if cfg.rate_limit.retention_ms < cfg.rate_limit.lead.window_ms
        || cfg.rate_limit.retention_ms < cfg.rate_limit.chat.window_ms
    {
        return Err(GateError::Config(
            "rate_limit.retention_ms must cover the longest policy window".into(),
        ));
    }

    if cfg.lead.max_body_bytes == 0 {
        return Err(GateError::Config("lead.max_body_bytes must be > 0".into()));
    }
    if let Some(url) = &cfg.lead.webhook_url {
        if url.trim().is_empty() {
            return Err(GateError::Config("lead.webhook_url cannot be empty".into()));
        }
    }
    if cfg.chat.max_body_bytes == 0 {
        return Err(GateError::Config("chat.max_body_bytes must be > 0".into()));
    }
    if cfg.chat.max_message_chars == 0 {
        return Err(GateError::Config(
            "chat.max_message_chars must be > 0".into(),
        ));
    }
    if cfg.chat.model.trim().is_empty() {
        return Err(GateError::Config("chat.model cannot be empty".into()));
    }

    for (name, timeout_ms) in [
        ("lead.timeout_ms", cfg.lead.timeout_ms),
        ("captcha.timeout_ms", cfg.captcha.timeout_ms),
        ("chat.timeout_ms", cfg.chat.timeout_ms),
    ] {
        if timeout_ms == 0 {
            return Err(GateError::Config(format!("{name} must be > 0")));
        }
    }

    if let Some(path) = &cfg.chat.system_prompt_path {
        if !path.exists() {
            return Err(GateError::Config(format!(
                "System prompt file not found: {}",
                path.display()
            )));
        }
    }

    Ok(())
}
