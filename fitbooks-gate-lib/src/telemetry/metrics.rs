use opentelemetry::global;
use opentelemetry::metrics::{Counter, Gauge, Histogram, Meter};
use opentelemetry::KeyValue;
use opentelemetry_sdk::metrics::SdkMeterProvider;
use prometheus::Registry;
use std::sync::Arc;

use crate::error::{GateError, Result};

pub mod labels {
    pub const ERROR_TYPE: &str = "error_type";
    pub const ROUTE: &str = "route";
    pub const METHOD: &str = "method";
    pub const STATUS_CODE: &str = "status_code";
    pub const REASON: &str = "reason";
    pub const UPSTREAM: &str = "upstream";
    pub const VERSION: &str = "version";
    pub const RUST_VERSION: &str = "rust_version";
}

pub mod values {
    pub const ERROR_RATE_LIMITED: &str = "rate_limited";
    pub const UPSTREAM_CAPTCHA: &str = "captcha";
    pub const UPSTREAM_LEAD_SINK: &str = "lead_sink";
    pub const UPSTREAM_CHAT: &str = "chat_provider";
}

#[derive(Clone)]
pub struct Metrics {
    pub requests_total: Counter<u64>,
    pub requests_duration_seconds: Histogram<f64>,

    // Admission control
    pub rate_limit_requests_total: Counter<u64>,
    pub rate_limit_allowed_total: Counter<u64>,
    pub rate_limit_rejected_total: Counter<u64>,

    // Third-party APIs
    pub upstream_requests_total: Counter<u64>,
    pub upstream_errors_total: Counter<u64>,
    pub upstream_duration_seconds: Histogram<f64>,
    pub captcha_rejections_total: Counter<u64>,

    pub errors_total: Counter<u64>,

    // Build info
    pub build_info: Gauge<u64>,
}

impl Metrics {
    fn new(meter: Meter) -> Self {
        Self {
            requests_total: meter
                .u64_counter("fitbooks_gate_requests_total")
                .with_description("Total number of API requests processed")
                .build(),
            requests_duration_seconds: meter
                .f64_histogram("fitbooks_gate_requests_duration_seconds")
                .with_description("API request duration in seconds")
                .build(),

            rate_limit_requests_total: meter
                .u64_counter("fitbooks_gate_rate_limit_requests_total")
                .with_description("Total number of requests checked by the rate limiter")
                .build(),
            rate_limit_allowed_total: meter
                .u64_counter("fitbooks_gate_rate_limit_allowed_total")
                .with_description("Total number of requests admitted by the rate limiter")
                .build(),
            rate_limit_rejected_total: meter
                .u64_counter("fitbooks_gate_rate_limit_rejected_total")
                .with_description("Total number of requests rejected by the rate limiter")
                .build(),

            upstream_requests_total: meter
                .u64_counter("fitbooks_gate_upstream_requests_total")
                .with_description("Total number of requests sent to third-party APIs")
                .build(),
            upstream_errors_total: meter
                .u64_counter("fitbooks_gate_upstream_errors_total")
                .with_description("Total number of failed third-party API requests")
                .build(),
            upstream_duration_seconds: meter
                .f64_histogram("fitbooks_gate_upstream_duration_seconds")
                .with_description("Third-party API request duration in seconds")
                .build(),
            captcha_rejections_total: meter
                .u64_counter("fitbooks_gate_captcha_rejections_total")
                .with_description("Total number of captcha tokens that failed verification")
                .build(),

            errors_total: meter
                .u64_counter("fitbooks_gate_errors_total")
                .with_description("Total number of errors by type")
                .build(),

            build_info: meter
                .u64_gauge("fitbooks_gate_build_info")
                .with_description("Build information (version, rust version)")
                .build(),
        }
    }

    /// Set build info metric with version labels
    pub fn set_build_info(&self) {
        let version = env!("CARGO_PKG_VERSION");
        let rust_version = env!("CARGO_PKG_RUST_VERSION");

        self.build_info.record(
            1,
            &[
                KeyValue::new(labels::VERSION, version),
                KeyValue::new(labels::RUST_VERSION, rust_version),
            ],
        );
    }

    pub fn record_request(&self, route: &str, method: &str, status_code: u16, duration_secs: f64) {
        self.requests_total.add(
            1,
            &[
                KeyValue::new(labels::ROUTE, route.to_string()),
                KeyValue::new(labels::METHOD, method.to_string()),
                KeyValue::new(labels::STATUS_CODE, i64::from(status_code)),
            ],
        );
        self.requests_duration_seconds.record(
            duration_secs,
            &[KeyValue::new(labels::ROUTE, route.to_string())],
        );
    }

    pub fn record_rate_limit_request(&self, route: &str) {
        self.rate_limit_requests_total
            .add(1, &[KeyValue::new(labels::ROUTE, route.to_string())]);
    }

    pub fn record_rate_limit_allowed(&self, route: &str) {
        self.rate_limit_allowed_total
            .add(1, &[KeyValue::new(labels::ROUTE, route.to_string())]);
    }

    pub fn record_rate_limit_rejection(&self, route: &str, reason: &str) {
        self.errors_total.add(
            1,
            &[KeyValue::new(
                labels::ERROR_TYPE,
                values::ERROR_RATE_LIMITED,
            )],
        );
        self.rate_limit_rejected_total.add(
            1,
            &[
                KeyValue::new(labels::ROUTE, route.to_string()),
                KeyValue::new(labels::REASON, reason.to_string()),
            ],
        );
    }

    pub fn record_upstream(&self, upstream: &str, duration_secs: f64, error: Option<&str>) {
        let attrs = &[KeyValue::new(labels::UPSTREAM, upstream.to_string())];
        self.upstream_requests_total.add(1, attrs);
        self.upstream_duration_seconds.record(duration_secs, attrs);
        if let Some(error_type) = error {
            self.upstream_errors_total.add(
                1,
                &[
                    KeyValue::new(labels::UPSTREAM, upstream.to_string()),
                    KeyValue::new(labels::ERROR_TYPE, error_type.to_string()),
                ],
            );
        }
    }

    pub fn record_captcha_rejection(&self) {
        self.captcha_rejections_total.add(1, &[]);
    }
}

pub fn init_metrics() -> Result<(Arc<Metrics>, Registry)> {
    let registry = Registry::default();

    let exporter = opentelemetry_prometheus::exporter()
        .with_registry(registry.clone())
        .build()
        .map_err(|e| GateError::Telemetry(format!("Failed to build Prometheus exporter: {e}")))?;

    let meter_provider = SdkMeterProvider::builder().with_reader(exporter).build();

    global::set_meter_provider(meter_provider);

    let meter = global::meter("fitbooks-gate");
    let metrics = Arc::new(Metrics::new(meter));

    metrics.set_build_info();

    Ok((metrics, registry))
}
