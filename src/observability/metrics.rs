//! # Metrics
//!
//! Prometheus metrics for monitoring the operator.
//!
//! ## Metrics Exposed
//!
//! - `codebase_operator_reconciliations_total` - Reconcile passes by kind
//! - `codebase_operator_reconciliation_errors_total` - Failed passes by kind and error class
//! - `codebase_operator_transient_requeues_total` - Passes postponed because a dependency was unavailable
//! - `codebase_operator_reconciliation_duration_seconds` - Duration of reconcile passes by kind
//! - `codebase_operator_jenkins_jobs_triggered_total` - Jenkins jobs started
//! - `codebase_operator_jenkins_job_outcomes_total` - Terminal job outcomes by result

use anyhow::Result;
use prometheus::{HistogramVec, IntCounter, IntCounterVec, Registry};
use std::sync::LazyLock;

pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static RECONCILIATIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "codebase_operator_reconciliations_total",
            "Total number of reconciliations by resource kind",
        ),
        &["kind"],
    )
    .expect("Failed to create RECONCILIATIONS_TOTAL metric - this should never happen")
});

static RECONCILIATION_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "codebase_operator_reconciliation_errors_total",
            "Total number of reconciliation errors by resource kind and error class",
        ),
        &["kind", "error"],
    )
    .expect("Failed to create RECONCILIATION_ERRORS_TOTAL metric - this should never happen")
});

static TRANSIENT_REQUEUES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "codebase_operator_transient_requeues_total",
            "Total number of passes requeued because a dependency was unavailable",
        ),
        &["kind"],
    )
    .expect("Failed to create TRANSIENT_REQUEUES_TOTAL metric - this should never happen")
});

static RECONCILIATION_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    HistogramVec::new(
        prometheus::HistogramOpts::new(
            "codebase_operator_reconciliation_duration_seconds",
            "Duration of reconciliation in seconds by resource kind",
        )
        .buckets(vec![0.1, 0.5, 1.0, 5.0, 30.0, 60.0, 300.0]),
        &["kind"],
    )
    .expect("Failed to create RECONCILIATION_DURATION metric - this should never happen")
});

static JOBS_TRIGGERED_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "codebase_operator_jenkins_jobs_triggered_total",
        "Total number of Jenkins jobs triggered",
    )
    .expect("Failed to create JOBS_TRIGGERED_TOTAL metric - this should never happen")
});

static JOB_OUTCOMES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "codebase_operator_jenkins_job_outcomes_total",
            "Total number of Jenkins job outcomes by result",
        ),
        &["outcome"],
    )
    .expect("Failed to create JOB_OUTCOMES_TOTAL metric - this should never happen")
});

#[allow(
    clippy::missing_errors_doc,
    reason = "Registration only fails on duplicate registration"
)]
pub fn register_metrics() -> Result<()> {
    REGISTRY.register(Box::new(RECONCILIATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(TRANSIENT_REQUEUES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_DURATION.clone()))?;
    REGISTRY.register(Box::new(JOBS_TRIGGERED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(JOB_OUTCOMES_TOTAL.clone()))?;

    Ok(())
}

pub fn increment_reconciliations(kind: &str) {
    RECONCILIATIONS_TOTAL.with_label_values(&[kind]).inc();
}

pub fn increment_reconciliation_errors(kind: &str, error: &str) {
    RECONCILIATION_ERRORS_TOTAL
        .with_label_values(&[kind, error])
        .inc();
}

pub fn increment_transient_requeues(kind: &str) {
    TRANSIENT_REQUEUES_TOTAL.with_label_values(&[kind]).inc();
}

pub fn observe_reconciliation_duration(kind: &str, duration: f64) {
    RECONCILIATION_DURATION
        .with_label_values(&[kind])
        .observe(duration);
}

pub fn increment_jobs_triggered() {
    JOBS_TRIGGERED_TOTAL.inc();
}

pub fn record_job_outcome(outcome: &str) {
    JOB_OUTCOMES_TOTAL.with_label_values(&[outcome]).inc();
}
