//! # Reconciler
//!
//! Top-level control of one reconcile pass for kinds that carry a finalizer
//! and a lifecycle status (Codebase, CodebaseBranch).
//!
//! ```text
//! fetch ── absent ──────────────────────────────> done
//!   │
//!   ├─ deleting ─> deletion chain ─> remove work dir ─> status ─> strip finalizer
//!   │
//!   └─ gate ─> ensure finalizer ─> creation chain ─┬─ ok ─────────> finished ─> status
//!                                                  ├─ transient ──> pending ──> status, requeue
//!                                                  └─ failed ─────> failed ───> status, error
//! ```
//!
//! Status is written once at the end of every pass. Handlers may persist
//! intermediate status themselves; the final write carries the refreshed
//! resource version.

use crate::cluster::{ClusterObject, ObjectStore};
use crate::config::OperatorConfig;
use crate::controller::chain::ChainPair;
use crate::controller::context::{Context, Services};
use crate::controller::error::ReconcilerError;
use crate::controller::status::update_status;
use crate::crd::{ActionType, StatusTracking, STATUS_FAILED, STATUS_FINISHED};
use crate::git::remove_dir_if_exists;
use crate::observability::metrics;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kube::{Resource, ResourceExt};
use kube_runtime::controller::Action;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, info_span, warn, Instrument};

/// Chains resolved for one resource
#[derive(Debug)]
pub enum Chains<'a, K> {
    Ready(&'a ChainPair<K>),
    /// The resource the chains are selected by is gone
    OwnerMissing(String),
}

/// A kind driven through finalizer-guarded creation and deletion chains
#[async_trait]
pub trait Reconcilable: ClusterObject + StatusTracking {
    const FINALIZER: &'static str;

    /// Action recorded when a pass succeeds without running any handler
    const ACCEPT_ACTION: ActionType;

    fn store(services: &Services) -> &Arc<dyn ObjectStore<Self>>;

    async fn chains<'a>(&self, ctx: &'a Context) -> Result<Chains<'a, Self>, ReconcilerError>;

    /// Local checkout removed once the deletion chain has run
    fn work_dir(&self, _config: &OperatorConfig) -> Option<PathBuf> {
        None
    }

    /// Kind-specific status fields set after a successful creation chain
    fn on_success(&mut self) {}
}

/// Outcome of checking whether a pass has anything to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    Run,
    /// This generation already reached a terminal outcome
    Skip,
    /// A pending pass was recorded recently; wait out the remainder
    Delay(Duration),
}

/// Decide whether a watch event for `resource` needs a pass.
///
/// Status writes generate watch events of their own. Finished and failed
/// outcomes record the generation they handled, pending outcomes are
/// recognized by their recent timestamp and message.
pub fn gate<K: Resource + StatusTracking>(
    resource: &K,
    transient_delay: Duration,
    now: DateTime<Utc>,
) -> Gate {
    if resource.meta().deletion_timestamp.is_some() {
        return Gate::Run;
    }
    let Some(status) = resource.lifecycle() else {
        return Gate::Run;
    };

    let generation = resource.meta().generation;
    let observed = status.observed_generation.is_some() && status.observed_generation == generation;
    if observed && (status.status == STATUS_FINISHED || status.status == STATUS_FAILED) {
        return Gate::Skip;
    }

    if !observed && !status.detailed_message.is_empty() && status.status != STATUS_FAILED {
        if let Some(updated) = resource.last_time_updated() {
            let elapsed = (now - updated).to_std().unwrap_or(Duration::ZERO);
            if elapsed < transient_delay {
                return Gate::Delay(transient_delay - elapsed);
            }
        }
    }

    Gate::Run
}

#[must_use]
pub fn has_finalizer<K: Resource>(resource: &K, finalizer: &str) -> bool {
    resource.finalizers().iter().any(|f| f == finalizer)
}

fn add_finalizer<K: Resource>(resource: &mut K, finalizer: &str) {
    resource
        .meta_mut()
        .finalizers
        .get_or_insert_with(Vec::new)
        .push(finalizer.to_string());
}

fn remove_finalizer<K: Resource>(resource: &mut K, finalizer: &str) {
    if let Some(finalizers) = resource.meta_mut().finalizers.as_mut() {
        finalizers.retain(|f| f != finalizer);
    }
}

/// Controller entry point for a [`Reconcilable`] kind
pub async fn reconcile<K: Reconcilable>(
    object: Arc<K>,
    ctx: Arc<Context>,
) -> Result<Action, ReconcilerError> {
    let kind = K::kind(&()).to_string();
    let name = object.name_any();
    let namespace = object.namespace().unwrap_or_default();

    let start = Instant::now();
    metrics::increment_reconciliations(&kind);

    let span = info_span!(
        "reconcile",
        resource.kind = %kind,
        resource.name = %name,
        resource.namespace = %namespace
    );
    let result = reconcile_pass::<K>(&namespace, &name, &ctx)
        .instrument(span)
        .await;

    metrics::observe_reconciliation_duration(&kind, start.elapsed().as_secs_f64());
    result
}

async fn reconcile_pass<K: Reconcilable>(
    namespace: &str,
    name: &str,
    ctx: &Context,
) -> Result<Action, ReconcilerError> {
    let services = &ctx.services;
    let store = K::store(services);

    let Some(mut resource) = store.get(namespace, name).await? else {
        debug!("Resource has been deleted, nothing to do");
        return Ok(Action::await_change());
    };

    if resource.meta().deletion_timestamp.is_some() {
        return finalize(ctx, store.as_ref(), resource).await;
    }

    let transient_delay = services.config.transient_requeue_duration();
    match gate(&resource, transient_delay, Utc::now()) {
        Gate::Run => {}
        Gate::Skip => {
            debug!("Generation has already been reconciled");
            return Ok(Action::await_change());
        }
        Gate::Delay(remaining) => {
            debug!(remaining_ms = remaining.as_millis(), "Pass postponed recently, waiting");
            return Ok(Action::requeue(remaining));
        }
    }

    if !has_finalizer(&resource, K::FINALIZER) {
        add_finalizer(&mut resource, K::FINALIZER);
        resource = store.replace(&resource).await?;
        debug!(finalizer = K::FINALIZER, "Finalizer has been added");
    }

    info!("🔄 Reconciling");
    let generation = resource.meta().generation;

    let pair = match resource.chains(ctx).await? {
        Chains::Ready(pair) => pair,
        Chains::OwnerMissing(reason) => {
            info!(reason = %reason, "⏳ Owner is missing, requeueing");
            resource.record_pending(K::ACCEPT_ACTION, reason);
            update_status(store.as_ref(), &mut resource).await?;
            metrics::increment_transient_requeues(&K::kind(&()));
            return Ok(Action::requeue(transient_delay));
        }
    };

    let action = match pair.create.serve(&mut resource).await {
        Ok(last) => {
            let action = last
                .or_else(|| resource.lifecycle().and_then(|s| s.action))
                .unwrap_or(K::ACCEPT_ACTION);
            resource.on_success();
            resource.record_success(action, generation);
            info!("✅ Reconciliation has been finished");
            Action::await_change()
        }
        Err(e) if e.is_transient() => {
            info!(reason = %e, "⏳ Dependency is not ready, requeueing");
            metrics::increment_transient_requeues(&K::kind(&()));
            Action::requeue(transient_delay)
        }
        Err(e) => {
            if let Some(status) = resource.lifecycle_mut() {
                status.observed_generation = generation;
            }
            if let Err(status_error) = update_status(store.as_ref(), &mut resource).await {
                warn!(error = %status_error, "Failed to record failure on status");
            }
            return Err(e.into());
        }
    };

    update_status(store.as_ref(), &mut resource).await?;
    Ok(action)
}

/// Deletion path: serve the deletion chain, clean up, then release the finalizer
async fn finalize<K: Reconcilable>(
    ctx: &Context,
    store: &dyn ObjectStore<K>,
    mut resource: K,
) -> Result<Action, ReconcilerError> {
    info!("🗑️ Resource is being deleted");

    // Without our finalizer the deletion chain has already been served
    if !has_finalizer(&resource, K::FINALIZER) {
        debug!("Finalizer is already absent");
        return Ok(Action::await_change());
    }

    let mut chain_ran = false;
    match resource.chains(ctx).await? {
        Chains::Ready(pair) => {
            chain_ran = true;
            match pair.delete.serve(&mut resource).await {
                Ok(last) => {
                    if let Some(action) = last {
                        resource.record_success(action, None);
                    }
                }
                Err(e) => {
                    if let Err(status_error) = update_status(store, &mut resource).await {
                        warn!(error = %status_error, "Failed to record deletion failure on status");
                    }
                    if e.is_transient() {
                        metrics::increment_transient_requeues(&K::kind(&()));
                        return Ok(Action::requeue(
                            ctx.services.config.transient_requeue_duration(),
                        ));
                    }
                    return Err(e.into());
                }
            }
        }
        Chains::OwnerMissing(reason) => {
            info!(reason = %reason, "Skipping deletion chain");
        }
    }

    if let Some(dir) = resource.work_dir(&ctx.services.config) {
        let removed = remove_dir_if_exists(&dir)
            .await
            .map_err(|source| ReconcilerError::WorkDir {
                path: dir.clone(),
                source,
            })?;
        if removed {
            info!(path = %dir.display(), "Working directory has been removed");
        }
    }

    if chain_ran {
        match update_status(store, &mut resource).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => return Ok(Action::await_change()),
            Err(e) => warn!(error = %e, "Failed to update status before removing finalizer"),
        }
    }

    remove_finalizer(&mut resource, K::FINALIZER);
    match store.replace(&resource).await {
        Ok(_) => info!("✅ Finalizer has been removed"),
        Err(e) if e.is_not_found() => debug!("Resource is already gone"),
        Err(e) => return Err(e.into()),
    }
    Ok(Action::await_change())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::{CodebaseBranch, CodebaseBranchSpec, CodebaseBranchStatus, LifecycleStatus};
    use kube::api::ObjectMeta;

    fn branch(generation: i64, lifecycle: Option<LifecycleStatus>) -> CodebaseBranch {
        CodebaseBranch {
            metadata: ObjectMeta {
                name: Some("app-master".to_string()),
                namespace: Some("edp".to_string()),
                generation: Some(generation),
                ..ObjectMeta::default()
            },
            spec: CodebaseBranchSpec {
                codebase_name: "app".to_string(),
                branch_name: "master".to_string(),
                from_commit: String::new(),
                version: None,
                release: false,
                release_job_params: None,
            },
            status: lifecycle.map(|lifecycle| CodebaseBranchStatus {
                lifecycle,
                ..CodebaseBranchStatus::default()
            }),
        }
    }

    const DELAY: Duration = Duration::from_secs(5);

    #[test]
    fn test_fresh_resource_runs() {
        assert_eq!(gate(&branch(1, None), DELAY, Utc::now()), Gate::Run);
    }

    #[test]
    fn test_finished_generation_is_skipped() {
        let mut status = LifecycleStatus::default();
        status.record_success(ActionType::PutCodebaseImageStream, Some(2));

        assert_eq!(gate(&branch(2, Some(status.clone())), DELAY, Utc::now()), Gate::Skip);
        assert_eq!(gate(&branch(3, Some(status)), DELAY, Utc::now()), Gate::Run);
    }

    #[test]
    fn test_recent_pending_pass_is_delayed() {
        let mut status = LifecycleStatus::default();
        status.record_pending(ActionType::TriggerReleaseJob, "app codebase is unavailable".to_string());
        let resource = branch(1, Some(status));

        let now = resource.last_time_updated().unwrap() + chrono::Duration::seconds(2);
        match gate(&resource, DELAY, now) {
            Gate::Delay(remaining) => assert!(remaining <= Duration::from_secs(3)),
            other => panic!("expected delay, got {other:?}"),
        }

        let later = resource.last_time_updated().unwrap() + chrono::Duration::seconds(6);
        assert_eq!(gate(&resource, DELAY, later), Gate::Run);
    }

    #[test]
    fn test_deleting_resource_always_runs() {
        let mut status = LifecycleStatus::default();
        status.record_success(ActionType::PutCodebaseImageStream, Some(1));
        let mut resource = branch(1, Some(status));
        resource.metadata.deletion_timestamp =
            Some(serde_json::from_value(serde_json::json!("2026-01-01T00:00:00Z")).unwrap());
        assert_eq!(gate(&resource, DELAY, Utc::now()), Gate::Run);
    }

    #[test]
    fn test_finalizer_helpers() {
        let mut resource = branch(1, None);
        assert!(!has_finalizer(&resource, "test.finalizer"));
        add_finalizer(&mut resource, "test.finalizer");
        assert!(has_finalizer(&resource, "test.finalizer"));
        remove_finalizer(&mut resource, "test.finalizer");
        assert!(!has_finalizer(&resource, "test.finalizer"));
    }
}
