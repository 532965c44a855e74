//! Metrics collection for observability
//!
//! This module provides Prometheus metrics for monitoring the ledger.
//!
//! # Metrics
//!
//! - `aid_requests_total{eligibility}` - Requests submitted, by category
//! - `aid_donations_total` - Donations appended to the ledger
//! - `aid_donations_rejected_total{reason}` - Donations refused
//! - `aid_append_duration_seconds` - Histogram of append latencies
//! - `aid_ledger_entries` - Current chain length
//! - `aid_verification_failures_total` - Failed chain verifications

use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Requests submitted, by eligibility
    pub requests_total: IntCounterVec,

    /// Donations appended
    pub donations_total: IntCounter,

    /// Donations refused, by reason
    pub donations_rejected: IntCounterVec,

    /// Append duration histogram
    pub append_duration: Histogram,

    /// Chain length
    pub ledger_entries: IntGauge,

    /// Failed verifications
    pub verification_failures: IntCounter,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics")
            .field("donations_total", &self.donations_total.get())
            .field("ledger_entries", &self.ledger_entries.get())
            .finish_non_exhaustive()
    }
}

impl Metrics {
    /// Create new metrics collector with its own registry
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let requests_total = IntCounterVec::new(
            Opts::new("aid_requests_total", "Aid requests submitted"),
            &["eligibility"],
        )?;
        registry.register(Box::new(requests_total.clone()))?;

        let donations_total =
            IntCounter::new("aid_donations_total", "Donations appended to the ledger")?;
        registry.register(Box::new(donations_total.clone()))?;

        let donations_rejected = IntCounterVec::new(
            Opts::new("aid_donations_rejected_total", "Donations refused"),
            &["reason"],
        )?;
        registry.register(Box::new(donations_rejected.clone()))?;

        let append_duration = Histogram::with_opts(
            HistogramOpts::new("aid_append_duration_seconds", "Histogram of append latencies")
                .buckets(vec![0.0005, 0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 1.0]),
        )?;
        registry.register(Box::new(append_duration.clone()))?;

        let ledger_entries = IntGauge::new("aid_ledger_entries", "Current chain length")?;
        registry.register(Box::new(ledger_entries.clone()))?;

        let verification_failures = IntCounter::new(
            "aid_verification_failures_total",
            "Failed chain verifications",
        )?;
        registry.register(Box::new(verification_failures.clone()))?;

        Ok(Self {
            requests_total,
            donations_total,
            donations_rejected,
            append_duration,
            ledger_entries,
            verification_failures,
            registry,
        })
    }

    /// Record a classified request
    pub fn record_request(&self, eligibility: &str) {
        self.requests_total.with_label_values(&[eligibility]).inc();
    }

    /// Record an appended donation
    pub fn record_donation(&self, duration_seconds: f64, chain_length: u64) {
        self.donations_total.inc();
        self.append_duration.observe(duration_seconds);
        self.ledger_entries.set(chain_length as i64);
    }

    /// Record a refused donation
    pub fn record_rejection(&self, reason: &str) {
        self.donations_rejected.with_label_values(&[reason]).inc();
    }

    /// Record a failed verification
    pub fn record_verification_failure(&self) {
        self.verification_failures.inc();
    }

    /// Get metrics registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Render in the Prometheus text format
    pub fn render(&self) -> prometheus::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new().unwrap();
        assert_eq!(metrics.donations_total.get(), 0);
        assert_eq!(metrics.ledger_entries.get(), 0);
    }

    #[test]
    fn test_independent_registries() {
        // Two collectors in one process must not clash
        let a = Metrics::new().unwrap();
        let b = Metrics::new().unwrap();
        a.record_donation(0.001, 1);
        assert_eq!(a.donations_total.get(), 1);
        assert_eq!(b.donations_total.get(), 0);
    }

    #[test]
    fn test_record_donation() {
        let metrics = Metrics::new().unwrap();
        metrics.record_donation(0.002, 1);
        metrics.record_donation(0.004, 2);
        assert_eq!(metrics.donations_total.get(), 2);
        assert_eq!(metrics.ledger_entries.get(), 2);
        assert_eq!(metrics.append_duration.get_sample_count(), 2);
    }

    #[test]
    fn test_labelled_counters() {
        let metrics = Metrics::new().unwrap();
        metrics.record_request("zakah");
        metrics.record_request("zakah");
        metrics.record_rejection("over_funded");
        assert_eq!(metrics.requests_total.with_label_values(&["zakah"]).get(), 2);
        assert_eq!(
            metrics
                .donations_rejected
                .with_label_values(&["over_funded"])
                .get(),
            1
        );
    }

    #[test]
    fn test_render() {
        let metrics = Metrics::new().unwrap();
        metrics.record_request("both");
        metrics.record_verification_failure();
        let text = metrics.render().unwrap();
        assert!(text.contains("aid_requests_total{eligibility=\"both\"} 1"));
        assert!(text.contains("aid_verification_failures_total 1"));
    }
}
