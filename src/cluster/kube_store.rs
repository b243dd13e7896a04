//! # Kubernetes Store
//!
//! [`ObjectStore`] over `kube::Api`.

use super::{object_name, object_namespace, ClusterObject, ObjectStore, StoreError};
use crate::constants::FIELD_MANAGER;
use async_trait::async_trait;
use kube::api::{DeleteParams, ListParams, Patch, PatchParams, PostParams};
use kube::{Api, Client};
use std::marker::PhantomData;
use tracing::debug;

/// Store for one namespaced kind backed by the API server
pub struct KubeStore<K> {
    client: Client,
    _kind: PhantomData<fn() -> K>,
}

impl<K> std::fmt::Debug for KubeStore<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeStore").finish_non_exhaustive()
    }
}

impl<K: ClusterObject> KubeStore<K> {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self {
            client,
            _kind: PhantomData,
        }
    }

    fn api(&self, namespace: &str) -> Api<K> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

/// Merge patch carrying the status and the resourceVersion it was read at.
///
/// The resourceVersion makes the API server reject stale writes with 409.
fn status_patch<K: ClusterObject>(object: &K) -> Result<serde_json::Value, StoreError> {
    let encoded = serde_json::to_value(object).map_err(|source| StoreError::Encode {
        kind: K::kind(&()).to_string(),
        source,
    })?;
    let status = encoded
        .get("status")
        .cloned()
        .unwrap_or(serde_json::Value::Null);
    Ok(serde_json::json!({
        "metadata": { "resourceVersion": object.meta().resource_version },
        "status": status,
    }))
}

/// Map API status codes onto the distinguished store conditions
fn classify<K: ClusterObject>(error: kube::Error, name: &str) -> StoreError {
    let kind = K::kind(&()).to_string();
    match error {
        kube::Error::Api(api_err) if api_err.code == 404 => StoreError::NotFound {
            kind,
            name: name.to_string(),
        },
        kube::Error::Api(api_err) if api_err.code == 409 && api_err.reason == "AlreadyExists" => {
            StoreError::AlreadyExists {
                kind,
                name: name.to_string(),
            }
        }
        kube::Error::Api(api_err) if api_err.code == 409 => StoreError::Conflict {
            kind,
            name: name.to_string(),
        },
        other => StoreError::Api(other),
    }
}

#[async_trait]
impl<K: ClusterObject> ObjectStore<K> for KubeStore<K> {
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<K>, StoreError> {
        self.api(namespace)
            .get_opt(name)
            .await
            .map_err(|e| classify::<K>(e, name))
    }

    async fn list(&self, namespace: &str) -> Result<Vec<K>, StoreError> {
        let list = self
            .api(namespace)
            .list(&ListParams::default())
            .await
            .map_err(StoreError::Api)?;
        Ok(list.items)
    }

    async fn create(&self, object: &K) -> Result<K, StoreError> {
        let name = object_name(object)?;
        self.api(&object_namespace(object))
            .create(&PostParams::default(), object)
            .await
            .map_err(|e| classify::<K>(e, &name))
    }

    async fn replace(&self, object: &K) -> Result<K, StoreError> {
        let name = object_name(object)?;
        self.api(&object_namespace(object))
            .replace(&name, &PostParams::default(), object)
            .await
            .map_err(|e| classify::<K>(e, &name))
    }

    async fn replace_status(&self, object: &K) -> Result<K, StoreError> {
        let name = object_name(object)?;
        let patch = status_patch(object)?;

        debug!(kind = %K::kind(&()), name = %name, "patching status");
        self.api(&object_namespace(object))
            .patch_status(&name, &PatchParams::apply(FIELD_MANAGER), &Patch::Merge(patch))
            .await
            .map_err(|e| classify::<K>(e, &name))
    }

    async fn delete(&self, namespace: &str, name: &str) -> Result<(), StoreError> {
        self.api(namespace)
            .delete(name, &DeleteParams::default())
            .await
            .map(|_| ())
            .map_err(|e| classify::<K>(e, name))
    }
}
