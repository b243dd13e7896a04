//! # Error Policy
//!
//! A chain failure is already written to the resource status, so the resource
//! waits for its next change. Store, status and working directory errors are
//! requeued after the configured interval.

use crate::controller::{Context, ReconcilerError};
use crate::observability::metrics;
use kube_runtime::controller::Action;
use kube::{Resource, ResourceExt};
use std::sync::Arc;
use tracing::{error, info};

/// Decide how a failed reconcile of `obj` is retried
pub fn handle_reconciliation_error<K>(
    obj: Arc<K>,
    error: &ReconcilerError,
    ctx: Arc<Context>,
) -> Action
where
    K: Resource<DynamicType = ()>,
{
    let kind = K::kind(&()).to_string();
    let name = obj.name_any();
    let namespace = obj.namespace().unwrap_or_default();

    let error_span = tracing::span!(
        tracing::Level::ERROR,
        "controller.reconciliation_error",
        resource.kind = %kind,
        resource.name = %name,
        resource.namespace = %namespace,
        error = %error
    );
    let _error_guard = error_span.enter();

    error!("Reconciliation error for {kind} {namespace}/{name}: {error}");
    metrics::increment_reconciliation_errors(&kind, error.kind());

    if error.is_reported() {
        info!("Failure is recorded on status, waiting for the next change");
        return Action::await_change();
    }

    let delay = ctx.services.config.reconciliation_error_requeue_duration();
    info!("🔄 Retrying in {}s", delay.as_secs());
    Action::requeue(delay)
}
