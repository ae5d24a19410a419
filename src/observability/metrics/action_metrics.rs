//! # Action Metrics
//!
//! Counters for actions applied by the executor, labelled by action kind.

use crate::observability::metrics::registry::REGISTRY;
use anyhow::Result;
use prometheus::IntCounterVec;
use std::sync::LazyLock;

static ACTIONS_EXECUTED_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "keycloak_operator_actions_executed_total",
            "Total number of actions applied successfully",
        ),
        &["kind"],
    )
    .expect("Failed to create ACTIONS_EXECUTED_TOTAL metric - this should never happen")
});

static ACTION_FAILURES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "keycloak_operator_action_failures_total",
            "Total number of actions that aborted a plan",
        ),
        &["kind"],
    )
    .expect("Failed to create ACTION_FAILURES_TOTAL metric - this should never happen")
});

pub(crate) fn register_action_metrics() -> Result<()> {
    REGISTRY.register(Box::new(ACTIONS_EXECUTED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(ACTION_FAILURES_TOTAL.clone()))?;
    Ok(())
}

pub fn increment_actions_executed(kind: &str) {
    ACTIONS_EXECUTED_TOTAL.with_label_values(&[kind]).inc();
}

pub fn increment_action_failures(kind: &str) {
    ACTION_FAILURES_TOTAL.with_label_values(&[kind]).inc();
}
