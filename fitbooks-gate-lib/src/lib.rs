#![forbid(unsafe_code)]

pub mod api;
pub mod config;
pub mod error;
pub mod security;
pub mod server;
pub mod telemetry;
pub mod upstream;

pub use api::{handle_request, AppState};
pub use config::{load_from_path, Config};
pub use error::{GateError, Result};
pub use security::{RateLimitDecision, RateLimitPolicy, RateLimiter};
pub use server::run;
