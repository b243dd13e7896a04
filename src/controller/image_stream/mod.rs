//! # CodebaseImageStream Reconciliation
//!
//! Image streams carry no finalizer and no status. Every `pipeline/stage`
//! label asks for the newest tag to be deployed into that stage through a
//! `CDStageDeploy`.
//!
//! Once a pass succeeds, the labels and the tag it acted on are stored in
//! the [`DEPLOY_FINGERPRINT_ANNOTATION`] annotation. Later events for the
//! same labels and tag are skipped, so a stage deploy consumed by the CD
//! pipeline is not requested again until a new tag is pushed.

mod put_cd_stage_deploy;

pub use put_cd_stage_deploy::{latest_tag, stage_deploy_name, validate_labels, PutCdStageDeploy};

use crate::cluster::StoreError;
use crate::controller::chain::Chain;
use crate::controller::context::{Context, Services};
use crate::controller::error::ReconcilerError;
use crate::crd::CodebaseImageStream;
use crate::observability::metrics;
use kube::{Resource, ResourceExt};
use kube_runtime::controller::Action;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, info_span, warn, Instrument};

pub const DEPLOY_FINGERPRINT_ANNOTATION: &str = "edp.epam.com/cd-stage-deploy-fingerprint";

#[must_use]
pub fn chain(services: &Arc<Services>) -> Chain<CodebaseImageStream> {
    Chain::new("codebase-image-stream").then(PutCdStageDeploy::new(Arc::clone(services)))
}

/// `{labels joined by ','}@{newest tag}`, `None` for a stream without labels
#[must_use]
pub fn deploy_fingerprint(stream: &CodebaseImageStream) -> Option<String> {
    let labels = stream.labels();
    if labels.is_empty() {
        return None;
    }
    let keys: Vec<&str> = labels.keys().map(String::as_str).collect();
    let tag = latest_tag(&stream.spec.tags).map_or("", |t| t.name.as_str());
    Some(format!("{}@{tag}", keys.join(",")))
}

fn recorded_fingerprint(stream: &CodebaseImageStream) -> Option<&str> {
    stream
        .annotations()
        .get(DEPLOY_FINGERPRINT_ANNOTATION)
        .map(String::as_str)
}

/// Controller entry point for image streams
pub async fn reconcile_image_stream(
    object: Arc<CodebaseImageStream>,
    ctx: Arc<Context>,
) -> Result<Action, ReconcilerError> {
    let kind = CodebaseImageStream::kind(&()).to_string();
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
    let result = image_stream_pass(&namespace, &name, &ctx)
        .instrument(span)
        .await;

    metrics::observe_reconciliation_duration(&kind, start.elapsed().as_secs_f64());
    result
}

async fn image_stream_pass(
    namespace: &str,
    name: &str,
    ctx: &Context,
) -> Result<Action, ReconcilerError> {
    let store = &ctx.services.stores.image_streams;

    let Some(mut stream) = store.get(namespace, name).await? else {
        debug!("Image stream has been deleted, nothing to do");
        return Ok(Action::await_change());
    };
    if stream.meta().deletion_timestamp.is_some() {
        return Ok(Action::await_change());
    }

    let fingerprint = deploy_fingerprint(&stream);
    if fingerprint.is_some() && fingerprint.as_deref() == recorded_fingerprint(&stream) {
        debug!("Stage deploys for these labels and tag have already been requested");
        return Ok(Action::await_change());
    }

    info!("🔄 Reconciling");
    match ctx.image_stream_chain.serve(&mut stream).await {
        Ok(_) => {}
        Err(e) if e.is_transient() => {
            info!(reason = %e, "⏳ Waiting for previous stage deploy, requeueing");
            metrics::increment_transient_requeues(&CodebaseImageStream::kind(&()));
            return Ok(Action::requeue(
                ctx.services.config.transient_requeue_duration(),
            ));
        }
        Err(e) => return Err(e.into()),
    }

    if let Some(fingerprint) = fingerprint {
        stream
            .annotations_mut()
            .insert(DEPLOY_FINGERPRINT_ANNOTATION.to_string(), fingerprint);
        match store.replace(&stream).await {
            Ok(_) => {}
            Err(e @ (StoreError::Conflict { .. } | StoreError::NotFound { .. })) => {
                warn!(error = %e, "Couldn't record stage deploy fingerprint");
            }
            Err(e) => return Err(e.into()),
        }
    }
    info!("✅ Reconciliation has been finished");
    Ok(Action::await_change())
}
