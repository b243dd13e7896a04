//! # Status Updater
//!
//! Persists the status block of a resource. A status-only write is tried
//! first, any failure falls back to a single full-object write. There is no
//! retry loop beyond that; a failed pass is retried by requeueing.

use crate::cluster::{ClusterObject, ObjectStore};
use crate::controller::error::StatusError;
use tracing::{debug, warn};

/// Write the status of `resource` and refresh its resource version
pub async fn update_status<K: ClusterObject>(
    store: &dyn ObjectStore<K>,
    resource: &mut K,
) -> Result<(), StatusError> {
    let name = resource.meta().name.clone().unwrap_or_default();

    let status_error = match store.replace_status(resource).await {
        Ok(updated) => {
            refresh_version(resource, &updated);
            debug!(kind = %K::kind(&()), name = %name, "Status has been updated");
            return Ok(());
        }
        Err(e) => e,
    };

    warn!(
        kind = %K::kind(&()),
        name = %name,
        error = %status_error,
        "Status-only update failed, falling back to full update"
    );

    match store.replace(resource).await {
        Ok(updated) => {
            refresh_version(resource, &updated);
            Ok(())
        }
        Err(update_error) => Err(StatusError {
            kind: K::kind(&()).to_string(),
            name,
            status_error,
            update_error,
        }),
    }
}

/// Later writes in the same pass must carry the version the server returned
fn refresh_version<K: ClusterObject>(resource: &mut K, updated: &K) {
    let meta = resource.meta_mut();
    meta.resource_version.clone_from(&updated.meta().resource_version);
    meta.generation = updated.meta().generation;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::MemoryStore;
    use crate::crd::{CodebaseBranch, CodebaseBranchSpec, StatusTracking};
    use kube::api::ObjectMeta;

    fn branch() -> CodebaseBranch {
        CodebaseBranch {
            metadata: ObjectMeta {
                name: Some("app-master".to_string()),
                namespace: Some("edp".to_string()),
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
            status: None,
        }
    }

    #[tokio::test]
    async fn test_status_write_refreshes_resource_version() {
        let store = MemoryStore::<CodebaseBranch>::new();
        let mut resource = store.create(&branch()).await.unwrap();
        let before = resource.metadata.resource_version.clone();

        resource.record_pending(crate::crd::ActionType::TriggerReleaseJob, "waiting".to_string());
        update_status(&store, &mut resource).await.unwrap();
        assert_ne!(resource.metadata.resource_version, before);

        // A second write in the same pass must not conflict
        update_status(&store, &mut resource).await.unwrap();
        assert_eq!(store.status_writes(), 2);
        assert_eq!(store.full_writes(), 0);
    }

    #[tokio::test]
    async fn test_rejected_status_write_falls_back_to_full_update() {
        let store = MemoryStore::<CodebaseBranch>::new();
        let mut resource = store.create(&branch()).await.unwrap();
        store.reject_status_writes(true);

        resource.record_pending(crate::crd::ActionType::TriggerReleaseJob, "waiting".to_string());
        update_status(&store, &mut resource).await.unwrap();

        assert_eq!(store.status_writes(), 0);
        assert_eq!(store.full_writes(), 1);
        let stored = store.get("edp", "app-master").await.unwrap().unwrap();
        assert_eq!(stored.lifecycle().unwrap().detailed_message, "waiting");
    }

    #[tokio::test]
    async fn test_both_writes_failing_is_an_error() {
        let store = MemoryStore::<CodebaseBranch>::new();
        let mut resource = store.create(&branch()).await.unwrap();
        store.reject_status_writes(true);
        store.reject_writes(true);

        let err = update_status(&store, &mut resource).await.unwrap_err();
        assert!(!err.is_not_found());
        assert!(err.to_string().contains("app-master"));
    }
}
