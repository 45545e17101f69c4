//! Metrics collection and monitoring for the resource server
//!
//! Each [`Metrics`] owns its own Prometheus [`Registry`] so several app
//! states (as in tests) never collide on metric names.

use crate::core::Result;
use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};
use std::time::Duration;

/// CRUD request and store call metrics
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    /// Requests by resource, operation and outcome kind
    pub requests: IntCounterVec,
    /// Store call latency by operation
    pub store_latency: HistogramVec,
}

impl Metrics {
    /// Create and register all metrics on a fresh registry
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let requests = IntCounterVec::new(
            Opts::new("rs_requests_total", "Resource requests handled"),
            &["resource", "operation", "outcome"],
        )?;
        let store_latency = HistogramVec::new(
            HistogramOpts::new("rs_store_call_seconds", "Duration of store calls in seconds")
                .buckets(vec![0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
            &["operation"],
        )?;

        registry.register(Box::new(requests.clone()))?;
        registry.register(Box::new(store_latency.clone()))?;

        Ok(Self {
            registry,
            requests,
            store_latency,
        })
    }

    /// Count one handled request
    pub fn record_request(&self, resource: &str, operation: &str, outcome: &str) {
        self.requests
            .with_label_values(&[resource, operation, outcome])
            .inc();
    }

    /// Observe one store call
    pub fn record_store_call(&self, operation: &str, elapsed: Duration) {
        self.store_latency
            .with_label_values(&[operation])
            .observe(elapsed.as_secs_f64());
    }

    /// Render all metrics in the Prometheus text format
    pub fn render(&self) -> Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| crate::core::Error::internal(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_includes_recorded_series() {
        let metrics = Metrics::new().unwrap();
        metrics.record_request("todos", "create", "ok");
        metrics.record_request("todos", "create", "ok");
        metrics.record_store_call("insert", Duration::from_millis(2));

        let text = metrics.render().unwrap();
        let line = text
            .lines()
            .find(|l| l.starts_with("rs_requests_total{") && l.contains(r#"resource="todos""#))
            .unwrap();
        assert!(line.contains(r#"operation="create""#));
        assert!(line.ends_with(" 2"));
        assert!(text.contains("rs_store_call_seconds_count{operation=\"insert\"} 1"));
    }

    #[test]
    fn test_independent_registries() {
        let a = Metrics::new().unwrap();
        let b = Metrics::new().unwrap();
        a.record_request("books", "list", "ok");
        assert!(!b.render().unwrap().contains("books"));
    }
}
