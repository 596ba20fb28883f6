//! Prometheus metrics for the reconcile loop.

use crate::error::ReconcileStep;
use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use std::time::Duration;

/// Reconcile metrics, registered on their own registry.
///
/// Cloning is cheap; clones share the same counters.
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    reconciliations: IntCounter,
    failures: IntCounterVec,
    duration: Histogram,
    stale_deleted: IntCounter,
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics")
            .field("reconciliations", &self.reconciliations.get())
            .field("stale_deleted", &self.stale_deleted.get())
            .finish_non_exhaustive()
    }
}

impl Metrics {
    /// Creates and registers all reconcile metrics
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let reconciliations = IntCounter::new(
            "statefulset_workload_reconciliations_total",
            "Reconciles started",
        )?;
        let failures = IntCounterVec::new(
            Opts::new("statefulset_workload_reconcile_failures_total", "Failed reconciles by step"),
            &["step"],
        )?;
        let duration = Histogram::with_opts(HistogramOpts::new(
            "statefulset_workload_reconcile_duration_seconds",
            "Reconcile duration",
        ))?;
        let stale_deleted = IntCounter::new(
            "statefulset_workload_stale_children_deleted_total",
            "Stale StatefulSets deleted",
        )?;

        registry.register(Box::new(reconciliations.clone()))?;
        registry.register(Box::new(failures.clone()))?;
        registry.register(Box::new(duration.clone()))?;
        registry.register(Box::new(stale_deleted.clone()))?;

        Ok(Self { registry, reconciliations, failures, duration, stale_deleted })
    }

    /// Counts a reconcile attempt
    pub fn reconcile_started(&self) {
        self.reconciliations.inc();
    }

    /// Counts a failed reconcile under its step label
    pub fn reconcile_failed(&self, step: ReconcileStep) {
        self.failures.with_label_values(&[step.as_str()]).inc();
    }

    /// Records the wall time of one reconcile
    pub fn observe_duration(&self, elapsed: Duration) {
        self.duration.observe(elapsed.as_secs_f64());
    }

    /// Counts stale children deleted by the collector
    pub fn stale_children_deleted(&self, count: usize) {
        self.stale_deleted.inc_by(count as u64);
    }

    /// Failure count for `step`
    #[cfg(test)]
    pub fn failures(&self, step: ReconcileStep) -> u64 {
        self.failures.with_label_values(&[step.as_str()]).get()
    }

    /// Metrics in the Prometheus text exposition format
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buf)?;
        String::from_utf8(buf).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
