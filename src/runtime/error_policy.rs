//! # Error Policy
//!
//! Retry policy for failed reconcile cycles.
//!
//! Every failure is retried after the same fixed delay (`REQUEUE_AFTER_SECS`,
//! 5 seconds by default). There is no backoff growth and no jitter. Status and
//! events were already written by the cycle itself.

use crate::controller::reconciler::{Reconcilable, Reconciler, ReconcilerError};
use crate::observability;
use kube::ResourceExt;
use kube_runtime::controller::Action;
use std::sync::Arc;
use tracing::{error, info};

/// Requeue a failed record after the fixed retry delay
pub fn error_policy<K: Reconcilable>(
    obj: Arc<K>,
    error: &ReconcilerError,
    ctx: Arc<Reconciler>,
) -> Action {
    let name = obj.name_any();
    let namespace = obj.namespace().unwrap_or_default();

    let error_span = tracing::span!(
        tracing::Level::ERROR,
        "controller.watch.reconciliation_error",
        resource.kind = K::KIND,
        resource.name = %name,
        resource.namespace = %namespace,
        error = %error
    );
    let _error_guard = error_span.enter();

    error!("Reconciliation error for {} {}/{}: {}", K::KIND, namespace, name, error);
    observability::metrics::increment_reconciliation_errors(K::KIND);

    let delay = ctx.config.requeue_after();
    info!("Retrying in {}s", delay.as_secs());
    observability::metrics::increment_requeues_total(K::KIND, "error");
    Action::requeue(delay)
}
