mod loader;
mod rate_limit;
mod telemetry;
mod types;
mod upstream;

pub use loader::{load_from_path, load_from_str, validate};
pub use rate_limit::RateLimitConfig;
pub use telemetry::{LoggingConfig, TelemetryConfig};
pub use types::{Config, TimeoutConfig};
pub use upstream::{CaptchaConfig, ChatConfig, LeadConfig};
