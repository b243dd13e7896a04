//! # Watch Loop
//!
//! Runs a controller for each owned kind until a shutdown signal arrives.
//! All controllers share one [`Context`].

use crate::controller::{reconcile, reconcile_image_stream, Context};
use crate::crd::{Codebase, CodebaseBranch, CodebaseImageStream};
use crate::observability::ServerState;
use crate::runtime::error_policy::handle_reconciliation_error;
use futures::StreamExt;
use k8s_openapi::NamespaceResourceScope;
use kube_runtime::{watcher, Controller};
use kube::{Api, Client, Resource};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{debug, info, warn};

fn watched_api<K>(client: &Client, namespace: Option<&str>) -> Api<K>
where
    K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>,
{
    match namespace {
        Some(namespace) => Api::namespaced(client.clone(), namespace),
        None => Api::all(client.clone()),
    }
}

/// Run the codebase, branch and image stream controllers to completion
pub async fn run_controllers(client: Client, ctx: Arc<Context>, server_state: Arc<ServerState>) {
    let namespace = ctx.services.config.watch_namespace.clone();
    match namespace.as_deref() {
        Some(ns) => info!("Watching namespace {ns}"),
        None => info!("Watching all namespaces"),
    }

    let codebases = Controller::new(
        watched_api::<Codebase>(&client, namespace.as_deref()),
        watcher::Config::default(),
    )
    .shutdown_on_signal()
    .run(
        reconcile::<Codebase>,
        handle_reconciliation_error::<Codebase>,
        Arc::clone(&ctx),
    )
    .for_each(|result| {
        if let Err(e) = result {
            warn!(kind = "Codebase", error = %e, "Controller stream error");
        }
        futures::future::ready(())
    });

    let branches = Controller::new(
        watched_api::<CodebaseBranch>(&client, namespace.as_deref()),
        watcher::Config::default(),
    )
    .shutdown_on_signal()
    .run(
        reconcile::<CodebaseBranch>,
        handle_reconciliation_error::<CodebaseBranch>,
        Arc::clone(&ctx),
    )
    .for_each(|result| {
        if let Err(e) = result {
            warn!(kind = "CodebaseBranch", error = %e, "Controller stream error");
        }
        futures::future::ready(())
    });

    let image_streams = Controller::new(
        watched_api::<CodebaseImageStream>(&client, namespace.as_deref()),
        watcher::Config::default(),
    )
    .shutdown_on_signal()
    .run(
        reconcile_image_stream,
        handle_reconciliation_error::<CodebaseImageStream>,
        Arc::clone(&ctx),
    )
    .for_each(|result| {
        match result {
            Ok((object, _)) => debug!(name = %object.name, "Image stream reconciled"),
            Err(e) => warn!(kind = "CodebaseImageStream", error = %e, "Controller stream error"),
        }
        futures::future::ready(())
    });

    info!("Starting controllers...");
    futures::join!(codebases, branches, image_streams);

    server_state.is_ready.store(false, Ordering::Relaxed);
    info!("Controllers stopped");
}
