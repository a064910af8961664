//! Metric families exported by the service.
//!
//! Metric names are part of the external contract: dashboards query them
//! verbatim, so they must not change.

use crate::registry::{CounterHandle, GaugeHandle, HistogramHandle, MetricRegistry, MetricsError};

pub const HTTP_REQUESTS_TOTAL: &str = "http_requests_total";
pub const HTTP_REQUEST_DURATION_SECONDS: &str = "http_request_duration_seconds";
pub const HTTP_REQUEST_SIZE_BYTES: &str = "http_request_size_bytes";
pub const HTTP_RESPONSE_SIZE_BYTES: &str = "http_response_size_bytes";
pub const PROCESS_OPEN_FDS: &str = "custom_process_open_fds";
pub const PROCESS_THREADS: &str = "custom_process_threads";
pub const CPU_UTILIZATION_PERCENTAGE: &str = "custom_cpu_utilization_percentage";

/// Request metrics written by the HTTP interceptor.
#[derive(Clone)]
pub struct HttpMetrics {
    pub requests_total: CounterHandle, // labels: method, endpoint, status_code
    pub request_duration_seconds: HistogramHandle, // labels: endpoint
    pub request_size_bytes: HistogramHandle, // labels: endpoint
    pub response_size_bytes: HistogramHandle, // labels: endpoint
}

impl HttpMetrics {
    /// Defines the request metrics in `registry`.
    ///
    /// `duration_buckets` are in seconds, `size_buckets` in bytes.
    pub fn new(
        registry: &MetricRegistry,
        duration_buckets: &[f64],
        size_buckets: &[f64],
    ) -> Result<Self, MetricsError> {
        let requests_total = registry.define_counter(
            HTTP_REQUESTS_TOTAL,
            "Total HTTP requests",
            &["method", "endpoint", "status_code"],
        )?;
        let request_duration_seconds = registry.define_histogram(
            HTTP_REQUEST_DURATION_SECONDS,
            "Request duration in seconds",
            &["endpoint"],
            duration_buckets,
        )?;
        let request_size_bytes = registry.define_histogram(
            HTTP_REQUEST_SIZE_BYTES,
            "HTTP request body size in bytes",
            &["endpoint"],
            size_buckets,
        )?;
        let response_size_bytes = registry.define_histogram(
            HTTP_RESPONSE_SIZE_BYTES,
            "HTTP response body size in bytes",
            &["endpoint"],
            size_buckets,
        )?;

        Ok(Self {
            requests_total,
            request_duration_seconds,
            request_size_bytes,
            response_size_bytes,
        })
    }
}

/// Process resource gauges written by the system sampler.
#[derive(Clone)]
pub struct ProcessMetrics {
    pub open_fds: GaugeHandle,
    pub threads: GaugeHandle,
    pub cpu_utilization_percentage: GaugeHandle,
}

impl ProcessMetrics {
    pub fn new(registry: &MetricRegistry) -> Result<Self, MetricsError> {
        let open_fds =
            registry.define_gauge(PROCESS_OPEN_FDS, "Number of open file descriptors")?;
        let threads = registry.define_gauge(PROCESS_THREADS, "Number of threads")?;
        let cpu_utilization_percentage = registry.define_gauge(
            CPU_UTILIZATION_PERCENTAGE,
            "Process CPU utilization as a percentage of all logical CPUs",
        )?;

        Ok(Self {
            open_fds,
            threads,
            cpu_utilization_percentage,
        })
    }
}
