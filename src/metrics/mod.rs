//! Prometheus metrics for monitoring.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Metrics collector.
#[derive(Debug, Default)]
pub struct Metrics {
    /// Total requests processed
    pub requests_total: AtomicU64,
    /// Successful requests
    pub requests_success: AtomicU64,
    /// Failed requests
    pub requests_failed: AtomicU64,
    /// Requests currently being handled
    pub requests_in_flight: AtomicU64,
    /// Tool calls
    pub tool_calls: AtomicU64,
    /// Tool calls that ended in an error result
    pub tool_errors: AtomicU64,
    /// Resource reads
    pub resource_reads: AtomicU64,
    /// Prompt renders
    pub prompt_gets: AtomicU64,
    /// Invocations rejected by argument validation
    pub validation_rejections: AtomicU64,
    /// Requests cancelled by the client
    pub cancellations: AtomicU64,
}

impl Metrics {
    /// Create a new metrics collector.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn inc_requests(&self) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
        self.requests_in_flight.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_success(&self) {
        self.requests_success.fetch_add(1, Ordering::Relaxed);
        self.requests_in_flight.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn inc_failed(&self) {
        self.requests_failed.fetch_add(1, Ordering::Relaxed);
        self.requests_in_flight.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn inc_tool_calls(&self) {
        self.tool_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_tool_errors(&self) {
        self.tool_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_resource_reads(&self) {
        self.resource_reads.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_prompt_gets(&self) {
        self.prompt_gets.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_validation_rejections(&self) {
        self.validation_rejections.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a cancelled request; it leaves the in-flight set without a response.
    pub fn inc_cancellations(&self) {
        self.cancellations.fetch_add(1, Ordering::Relaxed);
        self.requests_in_flight.fetch_sub(1, Ordering::Relaxed);
    }

    /// Get all metrics as a snapshot.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests_total: self.requests_total.load(Ordering::Relaxed),
            requests_success: self.requests_success.load(Ordering::Relaxed),
            requests_failed: self.requests_failed.load(Ordering::Relaxed),
            requests_in_flight: self.requests_in_flight.load(Ordering::Relaxed),
            tool_calls: self.tool_calls.load(Ordering::Relaxed),
            tool_errors: self.tool_errors.load(Ordering::Relaxed),
            resource_reads: self.resource_reads.load(Ordering::Relaxed),
            prompt_gets: self.prompt_gets.load(Ordering::Relaxed),
            validation_rejections: self.validation_rejections.load(Ordering::Relaxed),
            cancellations: self.cancellations.load(Ordering::Relaxed),
        }
    }

    /// Export metrics in Prometheus format.
    pub fn to_prometheus(&self) -> String {
        let s = self.snapshot();
        let series: [(&str, &str, &str, u64); 10] = [
            ("requests_total", "counter", "Total number of requests", s.requests_total),
            ("requests_success", "counter", "Successful requests", s.requests_success),
            ("requests_failed", "counter", "Failed requests", s.requests_failed),
            ("requests_in_flight", "gauge", "Requests currently being handled", s.requests_in_flight),
            ("tool_calls", "counter", "Tool calls count", s.tool_calls),
            ("tool_errors", "counter", "Tool calls returning an error result", s.tool_errors),
            ("resource_reads", "counter", "Resource reads count", s.resource_reads),
            ("prompt_gets", "counter", "Prompt renders count", s.prompt_gets),
            ("validation_rejections", "counter", "Invocations rejected by argument validation", s.validation_rejections),
            ("cancellations", "counter", "Requests cancelled by the client", s.cancellations),
        ];

        let mut out = String::new();
        for (name, kind, help, value) in series {
            out.push_str(&format!(
                "# HELP mcp_starter_{name} {help}\n# TYPE mcp_starter_{name} {kind}\nmcp_starter_{name} {value}\n\n"
            ));
        }
        out
    }
}

/// Metrics snapshot.
#[derive(Debug, Clone, serde::Serialize)]
pub struct MetricsSnapshot {
    pub requests_total: u64,
    pub requests_success: u64,
    pub requests_failed: u64,
    pub requests_in_flight: u64,
    pub tool_calls: u64,
    pub tool_errors: u64,
    pub resource_reads: u64,
    pub prompt_gets: u64,
    pub validation_rejections: u64,
    pub cancellations: u64,
}

/// Timer for measuring durations.
pub struct Timer {
    start: Instant,
}

impl Timer {
    /// Start a new timer.
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Get elapsed time in milliseconds.
    pub fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_counters() {
        let metrics = Metrics::new();
        metrics.inc_requests();
        metrics.inc_requests();
        metrics.inc_requests();
        metrics.inc_success();
        metrics.inc_failed();

        let s = metrics.snapshot();
        assert_eq!(s.requests_total, 3);
        assert_eq!(s.requests_success, 1);
        assert_eq!(s.requests_failed, 1);
        assert_eq!(s.requests_in_flight, 1);

        metrics.inc_cancellations();
        let s = metrics.snapshot();
        assert_eq!(s.cancellations, 1);
        assert_eq!(s.requests_in_flight, 0);
    }

    #[test]
    fn test_prometheus_export() {
        let metrics = Metrics::new();
        metrics.inc_tool_calls();
        metrics.inc_tool_calls();

        let text = metrics.to_prometheus();
        assert!(text.contains("# TYPE mcp_starter_tool_calls counter"));
        assert!(text.contains("mcp_starter_tool_calls 2\n"));
        assert!(text.contains("# TYPE mcp_starter_requests_in_flight gauge"));
    }
}
