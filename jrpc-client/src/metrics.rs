//! Client metrics definitions
//!
//! OpenTelemetry instruments recorded by the client when observability is
//! enabled through `ClientBuilder::with_observability()`.
//!
//! # Metrics Collected
//!
//! - **jrpc.client.requests.total**: Calls completed, by method and status (counter)
//! - **jrpc.client.request.duration**: Call latency in seconds (histogram)
//! - **jrpc.client.errors.total**: Errors by kind (counter)
//! - **jrpc.client.pending**: Calls waiting for a response (up/down counter)
//! - **jrpc.client.correlation.misses**: Responses that matched no pending call (counter)
//! - **jrpc.client.inbound.requests**: Requests and notifications from the server (counter)

use opentelemetry::{
    global,
    metrics::{Counter, Histogram, Meter, UpDownCounter},
    InstrumentationScope, KeyValue,
};

/// Client metrics for monitoring
pub struct ClientMetrics {
    pub requests_total: Counter<u64>,
    pub request_duration: Histogram<f64>,
    pub errors_total: Counter<u64>,
    pub pending: UpDownCounter<i64>,
    pub correlation_misses: Counter<u64>,
    pub inbound_requests: Counter<u64>,
}

impl ClientMetrics {
    /// Create metrics on the global meter provider
    pub fn new(service_name: impl Into<String>) -> Self {
        let scope = InstrumentationScope::builder(service_name.into()).build();
        Self::new_with_meter(&global::meter_with_scope(scope))
    }

    /// Create metrics on a specific meter
    pub fn new_with_meter(meter: &Meter) -> Self {
        Self {
            requests_total: meter
                .u64_counter("jrpc.client.requests.total")
                .with_description("Total number of calls completed")
                .build(),
            request_duration: meter
                .f64_histogram("jrpc.client.request.duration")
                .with_description("Call duration in seconds")
                .with_unit("s")
                .build(),
            errors_total: meter
                .u64_counter("jrpc.client.errors.total")
                .with_description("Total number of errors encountered")
                .build(),
            pending: meter
                .i64_up_down_counter("jrpc.client.pending")
                .with_description("Calls waiting for a response")
                .build(),
            correlation_misses: meter
                .u64_counter("jrpc.client.correlation.misses")
                .with_description("Responses whose id matched no pending call")
                .build(),
            inbound_requests: meter
                .u64_counter("jrpc.client.inbound.requests")
                .with_description("Requests and notifications received from the server")
                .build(),
        }
    }

    /// Record a completed call; `status` is "success", "error" or a local failure kind
    pub fn record_request(&self, method: &str, status: &str, duration_secs: f64) {
        let attributes = &[
            KeyValue::new("method", method.to_string()),
            KeyValue::new("status", status.to_string()),
        ];
        self.requests_total.add(1, attributes);
        self.request_duration.record(duration_secs, attributes);
    }

    pub fn record_error(&self, error_type: &str) {
        let attributes = &[KeyValue::new("error_type", error_type.to_string())];
        self.errors_total.add(1, attributes);
    }

    /// Adjust the pending gauge by `delta` calls
    pub fn record_pending(&self, delta: i64) {
        self.pending.add(delta, &[]);
    }

    pub fn record_correlation_miss(&self) {
        self.correlation_misses.add(1, &[]);
    }

    pub fn record_inbound_request(&self, method: &str) {
        let attributes = &[KeyValue::new("method", method.to_string())];
        self.inbound_requests.add(1, attributes);
    }
}
