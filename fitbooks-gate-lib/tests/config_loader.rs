use std::io::Write;

use fitbooks_gate_lib::config::{load_from_path, load_from_str};
use fitbooks_gate_lib::security::RateLimitPolicy;
use tempfile::NamedTempFile;

#[test]
fn loads_minimal_config_with_defaults() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cfg = load_from_str(r#"listen = "127.0.0.1:0""#)?;

    assert_eq!(cfg.listen.to_string(), "127.0.0.1:0");
    assert!(cfg.rate_limit.trust_proxy_headers);
    assert_eq!(cfg.rate_limit.sweep_interval_ms, 60_000);
    assert_eq!(cfg.rate_limit.retention_ms, 3_600_000);
    assert_eq!(cfg.rate_limit.lead, RateLimitPolicy::lead());
    assert_eq!(cfg.rate_limit.chat, RateLimitPolicy::chat());
    assert_eq!(cfg.lead.max_body_bytes, 10_240);
    assert_eq!(cfg.lead.webhook_url, None);
    assert_eq!(cfg.captcha.secret_env, "TURNSTILE_SECRET_KEY");
    assert_eq!(cfg.captcha.max_age_secs, 300);
    assert_eq!(cfg.chat.max_body_bytes, 8_192);
    assert_eq!(cfg.chat.max_message_chars, 2_000);
    assert_eq!(cfg.chat.model, "gpt-5-nano");
    assert_eq!(cfg.chat.timeout_ms, 20_000);
    assert_eq!(cfg.timeout.shutdown_secs, 30);
    assert_eq!(cfg.telemetry.metrics_port, None);
    Ok(())
}

#[test]
fn default_policies_match_endpoint_limits() {
    let lead = RateLimitPolicy::lead();
    assert_eq!(
        (lead.window_ms, lead.max_requests, lead.block_ms),
        (600_000, 6, Some(900_000))
    );

    let chat = RateLimitPolicy::chat();
    assert_eq!(
        (chat.window_ms, chat.max_requests, chat.block_ms),
        (300_000, 20, Some(600_000))
    );
}

#[test]
fn loads_full_config_from_file() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut prompt = NamedTempFile::new()?;
    writeln!(prompt, "You answer questions about bookkeeping.")?;

    let toml = format!(
        r#"
listen = "0.0.0.0:8080"

[logging]
level = "debug"
show_target = true

[telemetry]
metrics_port = 9900

[rate_limit]
trust_proxy_headers = false

[rate_limit.lead]
window_ms = 60000
max_requests = 2

[rate_limit.chat]
window_ms = 30000
max_requests = 5
block_ms = 0

[lead]
webhook_url = "https://hooks.example.com/lead"
webhook_token_env = "LEAD_WEBHOOK_TOKEN"

[captcha]
allowed_hostnames = ["fitbooks.ca"]
expected_action = "lead"

[chat]
model = "gpt-5-mini"
system_prompt_path = "{}"
"#,
        prompt.path().display()
    );

    let mut file = NamedTempFile::new()?;
    file.write_all(toml.as_bytes())?;

    let cfg = load_from_path(file.path())?;
    assert_eq!(cfg.logging.level, "debug");
    assert_eq!(cfg.telemetry.metrics_port, Some(9900));
    assert!(!cfg.rate_limit.trust_proxy_headers);
    assert_eq!(cfg.rate_limit.lead, RateLimitPolicy::new(60_000, 2));
    assert_eq!(cfg.rate_limit.chat.escalation_ms(), None);
    assert_eq!(
        cfg.lead.webhook_url.as_deref(),
        Some("https://hooks.example.com/lead")
    );
    assert_eq!(cfg.captcha.allowed_hostnames, vec!["fitbooks.ca"]);
    assert_eq!(cfg.chat.model, "gpt-5-mini");
    assert!(cfg.chat.system_prompt_path.is_some());
    Ok(())
}

#[test]
fn rejects_missing_file() {
    let result = load_from_path("/nonexistent/gate.toml");
    assert!(result.is_err());
}

#[test]
fn rejects_zero_window_and_quota() {
    let zero_window = r#"
listen = "127.0.0.1:0"
[rate_limit.lead]
window_ms = 0
max_requests = 6
"#;
    assert!(load_from_str(zero_window).is_err());

    let zero_quota = r#"
listen = "127.0.0.1:0"
[rate_limit.chat]
window_ms = 1000
max_requests = 0
"#;
    assert!(load_from_str(zero_quota).is_err());
}

#[test]
fn rejects_retention_shorter_than_window() {
    let toml = r#"
listen = "127.0.0.1:0"
[rate_limit]
retention_ms = 1000
"#;
    assert!(load_from_str(toml).is_err());
}

#[test]
fn rejects_invalid_upstream_settings() {
    for toml in [
        "listen = \"127.0.0.1:0\"\n[lead]\nwebhook_url = \"  \"\n",
        "listen = \"127.0.0.1:0\"\n[chat]\nmodel = \"\"\n",
        "listen = \"127.0.0.1:0\"\n[chat]\nmax_message_chars = 0\n",
        "listen = \"127.0.0.1:0\"\n[captcha]\ntimeout_ms = 0\n",
        "listen = \"127.0.0.1:0\"\n[chat]\nsystem_prompt_path = \"/nonexistent/prompt.txt\"\n",
    ] {
        assert!(
            load_from_str(toml).is_err(),
            "expected rejection of:\n{toml}"
        );
    }
}

#[test]
fn rejects_malformed_toml() {
    assert!(load_from_str("listen = ").is_err());
    assert!(load_from_str("listen = \"not-an-address\"").is_err());
}
