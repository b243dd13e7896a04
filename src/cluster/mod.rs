//! # Cluster Object Store
//!
//! Narrow read/write interface the handler chains use to reach the cluster.
//!
//! - `kube_store.rs` - [`KubeStore`] backed by the Kubernetes API
//! - `memory.rs` - [`MemoryStore`] holding objects in process, used by tests
//!   and for local dry runs
//!
//! "Not found" is a distinguished condition: `get` returns `None` and the
//! mutating calls return [`StoreError::NotFound`].

mod kube_store;
mod memory;

pub use kube_store::KubeStore;
pub use memory::{MemoryCluster, MemoryStore};

use crate::crd::{
    CDStageDeploy, Codebase, CodebaseBranch, CodebaseImageStream, EDPComponent, GitServer,
    Jenkins, JenkinsFolder,
};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::NamespaceResourceScope;
use kube::{Client, Resource};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;
use std::sync::Arc;

/// Namespaced resource types the stores can hold
pub trait ClusterObject:
    Resource<Scope = NamespaceResourceScope, DynamicType = ()>
    + Clone
    + Debug
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
}

impl<K> ClusterObject for K where
    K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>
        + Clone
        + Debug
        + Serialize
        + DeserializeOwned
        + Send
        + Sync
        + 'static
{
}

/// Error type for cluster store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{kind} {name} not found")]
    NotFound { kind: String, name: String },

    #[error("{kind} {name} already exists")]
    AlreadyExists { kind: String, name: String },

    #[error("{kind} {name} was modified concurrently")]
    Conflict { kind: String, name: String },

    #[error("{kind} is missing metadata.name")]
    Unnamed { kind: String },

    #[error("Failed to encode {kind}: {source}")]
    Encode {
        kind: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Kubernetes API error: {0}")]
    Api(#[from] kube::Error),
}

impl StoreError {
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    #[must_use]
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. })
    }
}

/// CRUD access to one resource kind
#[async_trait]
pub trait ObjectStore<K: ClusterObject>: Send + Sync {
    /// Get an object by name, `None` when it does not exist
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<K>, StoreError>;

    async fn list(&self, namespace: &str) -> Result<Vec<K>, StoreError>;

    async fn create(&self, object: &K) -> Result<K, StoreError>;

    /// Full-object update, checked against `metadata.resourceVersion`
    async fn replace(&self, object: &K) -> Result<K, StoreError>;

    /// Status-only update, checked against `metadata.resourceVersion`
    async fn replace_status(&self, object: &K) -> Result<K, StoreError>;

    async fn delete(&self, namespace: &str, name: &str) -> Result<(), StoreError>;

    /// Get an object that must exist
    async fn fetch(&self, namespace: &str, name: &str) -> Result<K, StoreError> {
        self.get(namespace, name)
            .await?
            .ok_or_else(|| StoreError::NotFound {
                kind: K::kind(&()).to_string(),
                name: name.to_string(),
            })
    }
}

/// One store per resource kind the operator touches
#[derive(Clone)]
pub struct Stores {
    pub codebases: Arc<dyn ObjectStore<Codebase>>,
    pub branches: Arc<dyn ObjectStore<CodebaseBranch>>,
    pub image_streams: Arc<dyn ObjectStore<CodebaseImageStream>>,
    pub stage_deploys: Arc<dyn ObjectStore<CDStageDeploy>>,
    pub jenkins_folders: Arc<dyn ObjectStore<JenkinsFolder>>,
    pub jenkins: Arc<dyn ObjectStore<Jenkins>>,
    pub git_servers: Arc<dyn ObjectStore<GitServer>>,
    pub components: Arc<dyn ObjectStore<EDPComponent>>,
    pub secrets: Arc<dyn ObjectStore<Secret>>,
}

impl Stores {
    /// Stores backed by the Kubernetes API
    #[must_use]
    pub fn kube(client: &Client) -> Self {
        Self {
            codebases: Arc::new(KubeStore::new(client.clone())),
            branches: Arc::new(KubeStore::new(client.clone())),
            image_streams: Arc::new(KubeStore::new(client.clone())),
            stage_deploys: Arc::new(KubeStore::new(client.clone())),
            jenkins_folders: Arc::new(KubeStore::new(client.clone())),
            jenkins: Arc::new(KubeStore::new(client.clone())),
            git_servers: Arc::new(KubeStore::new(client.clone())),
            components: Arc::new(KubeStore::new(client.clone())),
            secrets: Arc::new(KubeStore::new(client.clone())),
        }
    }
}

impl Debug for Stores {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stores").finish_non_exhaustive()
    }
}

/// Name of an object, or an error for objects built without one
pub(crate) fn object_name<K: ClusterObject>(object: &K) -> Result<String, StoreError> {
    object
        .meta()
        .name
        .clone()
        .ok_or_else(|| StoreError::Unnamed {
            kind: K::kind(&()).to_string(),
        })
}

/// Namespace of an object, `default` when unset
pub(crate) fn object_namespace<K: ClusterObject>(object: &K) -> String {
    object
        .meta()
        .namespace
        .clone()
        .unwrap_or_else(|| "default".to_string())
}
