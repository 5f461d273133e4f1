use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::time::Duration;

/// Siteverify response from the captcha provider.
#[derive(Debug, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct CaptchaVerification {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(default)]
    pub action: Option<String>,
    /// RFC 3339 time at which the challenge was solved.
    #[serde(default)]
    pub challenge_ts: Option<String>,
    #[serde(default, rename = "error-codes")]
    pub error_codes: Vec<String>,
}

impl CaptchaVerification {
    pub fn failed() -> Self {
        Self::default()
    }
}

/// Rules a successful verification must also satisfy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptchaPolicy {
    /// Oldest acceptable challenge.
    pub max_age: Duration,
    /// Lowercased hostnames; empty accepts any.
    pub allowed_hostnames: Vec<String>,
    pub expected_action: Option<String>,
}

impl Default for CaptchaPolicy {
    fn default() -> Self {
        Self {
            max_age: Duration::from_secs(300),
            allowed_hostnames: vec![],
            expected_action: None,
        }
    }
}

impl CaptchaPolicy {
    pub fn new(
        max_age: Duration,
        allowed_hostnames: &[String],
        expected_action: Option<&str>,
    ) -> Self {
        Self {
            max_age,
            allowed_hostnames: allowed_hostnames
                .iter()
                .map(|host| host.trim().to_lowercase())
                .filter(|host| !host.is_empty())
                .collect(),
            expected_action: expected_action
                .map(str::trim)
                .filter(|action| !action.is_empty())
                .map(str::to_string),
        }
    }

    pub fn accepts(&self, verification: &CaptchaVerification, now: DateTime<Utc>) -> bool {
        verification.success
            && self.is_fresh(verification.challenge_ts.as_deref(), now)
            && self.is_allowed_hostname(verification.hostname.as_deref())
            && self.is_expected_action(verification.action.as_deref())
    }

    /// A missing timestamp is accepted; an unparsable one is not.
    fn is_fresh(&self, challenge_ts: Option<&str>, now: DateTime<Utc>) -> bool {
        let Some(ts) = challenge_ts else {
            return true;
        };
        let Ok(solved_at) = DateTime::parse_from_rfc3339(ts) else {
            return false;
        };
        let age = now.signed_duration_since(solved_at.with_timezone(&Utc));
        match chrono::Duration::from_std(self.max_age) {
            Ok(max_age) => age <= max_age,
            Err(_) => true,
        }
    }

    fn is_allowed_hostname(&self, hostname: Option<&str>) -> bool {
        if self.allowed_hostnames.is_empty() {
            return true;
        }
        hostname
            .map(|host| self.allowed_hostnames.contains(&host.to_lowercase()))
            .unwrap_or(false)
    }

    fn is_expected_action(&self, action: Option<&str>) -> bool {
        match &self.expected_action {
            Some(expected) => action == Some(expected.as_str()),
            None => true,
        }
    }
}
