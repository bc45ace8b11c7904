use prometheus::{Encoder, Histogram, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use std::time::Duration;

pub struct CaptureMetrics {
    registry: Registry,

    // Capture metrics
    pub requests_captured: IntCounter,
    pub requests_failed: IntCounterVec,
    pub capture_duration: Histogram,

    // Store metrics
    pub store_evictions: IntCounter,
    pub store_records: IntGauge,

    // Connection metrics
    pub active_connections: IntGauge,
}

impl Default for CaptureMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureMetrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let requests_captured = IntCounter::new(
            "capture_proxy_requests_captured_total",
            "Total number of requests recorded in the capture store",
        )
        .expect("metric creation failed");
        let requests_failed = IntCounterVec::new(
            Opts::new(
                "capture_proxy_requests_failed_total",
                "Total number of requests that could not be captured or forwarded",
            ),
            &["reason"],
        )
        .expect("metric creation failed");
        let capture_duration = Histogram::with_opts(prometheus::HistogramOpts::new(
            "capture_proxy_capture_duration_seconds",
            "Time from request head to response, in seconds",
        ))
        .expect("metric creation failed");

        let store_evictions = IntCounter::new(
            "capture_proxy_store_evictions_total",
            "Captures dropped from the bounded store to make room",
        )
        .expect("metric creation failed");
        let store_records = IntGauge::new(
            "capture_proxy_store_records",
            "Number of captures currently held in the store",
        )
        .expect("metric creation failed");

        let active_connections = IntGauge::new(
            "capture_proxy_active_connections",
            "Number of open client connections",
        )
        .expect("metric creation failed");

        // Register all metrics
        registry
            .register(Box::new(requests_captured.clone()))
            .expect("metric registration failed");
        registry
            .register(Box::new(requests_failed.clone()))
            .expect("metric registration failed");
        registry
            .register(Box::new(capture_duration.clone()))
            .expect("metric registration failed");
        registry
            .register(Box::new(store_evictions.clone()))
            .expect("metric registration failed");
        registry
            .register(Box::new(store_records.clone()))
            .expect("metric registration failed");
        registry
            .register(Box::new(active_connections.clone()))
            .expect("metric registration failed");

        Self {
            registry,
            requests_captured,
            requests_failed,
            capture_duration,
            store_evictions,
            store_records,
            active_connections,
        }
    }

    pub fn record_capture(&self) {
        self.requests_captured.inc();
    }

    pub fn record_failure(&self, reason: &str) {
        self.requests_failed.with_label_values(&[reason]).inc();
    }

    pub fn record_capture_duration(&self, duration: Duration) {
        self.capture_duration.observe(duration.as_secs_f64());
    }

    pub fn record_eviction(&self) {
        self.store_evictions.inc();
    }

    pub fn set_store_records(&self, count: usize) {
        self.store_records.set(count as i64);
    }

    pub fn connection_opened(&self) {
        self.active_connections.inc();
    }

    pub fn connection_closed(&self) {
        self.active_connections.dec();
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Renders all metrics in the Prometheus text exposition format
    pub fn encode_text(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
            tracing::warn!(error = %e, "Failed to encode metrics");
            return String::new();
        }
        String::from_utf8_lossy(&buffer).into_owned()
    }
}
