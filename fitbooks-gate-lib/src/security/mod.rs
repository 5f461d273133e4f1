pub mod captcha;
pub mod client_ip;
pub mod rate_limit;

pub use captcha::{CaptchaPolicy, CaptchaVerification};
pub use client_ip::{client_ip, client_ip_from_headers, UNKNOWN_CLIENT};
pub use rate_limit::{RateLimitDecision, RateLimitPolicy, RateLimiter};
