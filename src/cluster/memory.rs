//! # In-Memory Store
//!
//! [`ObjectStore`] holding objects in process. It mimics the API server
//! behaviour the reconcilers depend on: resource versions with conflict
//! detection, finalizer-gated deletion and status-only writes. Writes can be
//! rejected on demand to exercise fallback paths.

use super::{
    object_name, object_namespace, ClusterObject, ObjectStore, StoreError, Stores,
};
use crate::crd::{
    CDStageDeploy, Codebase, CodebaseBranch, CodebaseImageStream, EDPComponent, GitServer,
    Jenkins, JenkinsFolder,
};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

type Key = (String, String);

/// Store for one kind kept in a map keyed by namespace and name
#[derive(Debug)]
pub struct MemoryStore<K> {
    objects: Mutex<BTreeMap<Key, K>>,
    next_version: AtomicU64,
    reject_status_writes: AtomicBool,
    reject_writes: AtomicBool,
    status_writes: AtomicUsize,
    full_writes: AtomicUsize,
}

impl<K> Default for MemoryStore<K> {
    fn default() -> Self {
        Self {
            objects: Mutex::new(BTreeMap::new()),
            next_version: AtomicU64::new(1),
            reject_status_writes: AtomicBool::new(false),
            reject_writes: AtomicBool::new(false),
            status_writes: AtomicUsize::new(0),
            full_writes: AtomicUsize::new(0),
        }
    }
}

impl<K: ClusterObject> MemoryStore<K> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every status-only write fail with a conflict
    pub fn reject_status_writes(&self, reject: bool) {
        self.reject_status_writes.store(reject, Ordering::SeqCst);
    }

    /// Make every full-object write fail with a conflict
    pub fn reject_writes(&self, reject: bool) {
        self.reject_writes.store(reject, Ordering::SeqCst);
    }

    /// Number of successful status-only writes
    #[must_use]
    pub fn status_writes(&self) -> usize {
        self.status_writes.load(Ordering::SeqCst)
    }

    /// Number of successful full-object writes
    #[must_use]
    pub fn full_writes(&self) -> usize {
        self.full_writes.load(Ordering::SeqCst)
    }

    /// Current number of objects across all namespaces
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<Key, K>> {
        self.objects.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn bump_version(&self) -> String {
        self.next_version.fetch_add(1, Ordering::SeqCst).to_string()
    }

    fn kind() -> String {
        K::kind(&()).to_string()
    }

    fn conflict(name: &str) -> StoreError {
        StoreError::Conflict {
            kind: Self::kind(),
            name: name.to_string(),
        }
    }

    fn not_found(name: &str) -> StoreError {
        StoreError::NotFound {
            kind: Self::kind(),
            name: name.to_string(),
        }
    }

    fn check_version(stored: &K, incoming: &K, name: &str) -> Result<(), StoreError> {
        match incoming.meta().resource_version.as_deref() {
            Some(version) if Some(version) != stored.meta().resource_version.as_deref() => {
                Err(Self::conflict(name))
            }
            _ => Ok(()),
        }
    }

    fn encode(object: &K) -> Result<Value, StoreError> {
        serde_json::to_value(object).map_err(|source| StoreError::Encode {
            kind: Self::kind(),
            source,
        })
    }

    fn decode(value: Value) -> Result<K, StoreError> {
        serde_json::from_value(value).map_err(|source| StoreError::Encode {
            kind: Self::kind(),
            source,
        })
    }
}

#[async_trait]
impl<K: ClusterObject> ObjectStore<K> for MemoryStore<K> {
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<K>, StoreError> {
        Ok(self
            .lock()
            .get(&(namespace.to_string(), name.to_string()))
            .cloned())
    }

    async fn list(&self, namespace: &str) -> Result<Vec<K>, StoreError> {
        Ok(self
            .lock()
            .iter()
            .filter(|((ns, _), _)| ns == namespace)
            .map(|(_, object)| object.clone())
            .collect())
    }

    async fn create(&self, object: &K) -> Result<K, StoreError> {
        let name = object_name(object)?;
        let namespace = object_namespace(object);
        let key = (namespace.clone(), name.clone());

        let mut objects = self.lock();
        if objects.contains_key(&key) {
            return Err(StoreError::AlreadyExists {
                kind: Self::kind(),
                name,
            });
        }

        let mut stored = object.clone();
        let meta = stored.meta_mut();
        meta.namespace = Some(namespace);
        meta.resource_version = Some(self.bump_version());
        meta.generation = Some(1);
        meta.deletion_timestamp = None;
        objects.insert(key, stored.clone());
        Ok(stored)
    }

    async fn replace(&self, object: &K) -> Result<K, StoreError> {
        let name = object_name(object)?;
        let key = (object_namespace(object), name.clone());

        let mut objects = self.lock();
        let stored = objects.get(&key).ok_or_else(|| Self::not_found(&name))?;
        if self.reject_writes.load(Ordering::SeqCst) {
            return Err(Self::conflict(&name));
        }
        Self::check_version(stored, object, &name)?;

        let spec_changed = Self::encode(stored)?.get("spec") != Self::encode(object)?.get("spec");
        let generation = stored.meta().generation.unwrap_or(1);
        let deletion_timestamp = stored.meta().deletion_timestamp.clone();

        let mut updated = object.clone();
        let meta = updated.meta_mut();
        meta.resource_version = Some(self.bump_version());
        meta.generation = Some(if spec_changed { generation + 1 } else { generation });
        meta.deletion_timestamp = deletion_timestamp;

        self.full_writes.fetch_add(1, Ordering::SeqCst);

        let finalizers_cleared = updated
            .meta()
            .finalizers
            .as_ref()
            .is_none_or(Vec::is_empty);
        if updated.meta().deletion_timestamp.is_some() && finalizers_cleared {
            objects.remove(&key);
        } else {
            objects.insert(key, updated.clone());
        }
        Ok(updated)
    }

    async fn replace_status(&self, object: &K) -> Result<K, StoreError> {
        let name = object_name(object)?;
        let key = (object_namespace(object), name.clone());

        let mut objects = self.lock();
        let stored = objects.get(&key).ok_or_else(|| Self::not_found(&name))?;
        if self.reject_status_writes.load(Ordering::SeqCst) {
            return Err(Self::conflict(&name));
        }
        Self::check_version(stored, object, &name)?;

        let mut merged = Self::encode(stored)?;
        let status = Self::encode(object)?
            .get("status")
            .cloned()
            .unwrap_or(Value::Null);
        if let Some(fields) = merged.as_object_mut() {
            fields.insert("status".to_string(), status);
        }

        let mut updated = Self::decode(merged)?;
        updated.meta_mut().resource_version = Some(self.bump_version());
        self.status_writes.fetch_add(1, Ordering::SeqCst);
        objects.insert(key, updated.clone());
        Ok(updated)
    }

    async fn delete(&self, namespace: &str, name: &str) -> Result<(), StoreError> {
        let key = (namespace.to_string(), name.to_string());

        let mut objects = self.lock();
        let stored = objects.get(&key).ok_or_else(|| Self::not_found(name))?;
        let has_finalizers = stored
            .meta()
            .finalizers
            .as_ref()
            .is_some_and(|f| !f.is_empty());

        if !has_finalizers {
            objects.remove(&key);
            return Ok(());
        }

        let mut marked = Self::encode(stored)?;
        marked["metadata"]["deletionTimestamp"] = Value::String(chrono::Utc::now().to_rfc3339());
        let mut marked = Self::decode(marked)?;
        marked.meta_mut().resource_version = Some(self.bump_version());
        objects.insert(key, marked);
        Ok(())
    }
}

/// In-memory stores for every kind the operator touches
#[derive(Debug, Default)]
pub struct MemoryCluster {
    pub codebases: Arc<MemoryStore<Codebase>>,
    pub branches: Arc<MemoryStore<CodebaseBranch>>,
    pub image_streams: Arc<MemoryStore<CodebaseImageStream>>,
    pub stage_deploys: Arc<MemoryStore<CDStageDeploy>>,
    pub jenkins_folders: Arc<MemoryStore<JenkinsFolder>>,
    pub jenkins: Arc<MemoryStore<Jenkins>>,
    pub git_servers: Arc<MemoryStore<GitServer>>,
    pub components: Arc<MemoryStore<EDPComponent>>,
    pub secrets: Arc<MemoryStore<Secret>>,
}

impl MemoryCluster {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Trait-object view handed to the reconcilers
    #[must_use]
    pub fn stores(&self) -> Stores {
        Stores {
            codebases: Arc::clone(&self.codebases) as _,
            branches: Arc::clone(&self.branches) as _,
            image_streams: Arc::clone(&self.image_streams) as _,
            stage_deploys: Arc::clone(&self.stage_deploys) as _,
            jenkins_folders: Arc::clone(&self.jenkins_folders) as _,
            jenkins: Arc::clone(&self.jenkins) as _,
            git_servers: Arc::clone(&self.git_servers) as _,
            components: Arc::clone(&self.components) as _,
            secrets: Arc::clone(&self.secrets) as _,
        }
    }
}
