//! # Jenkins Connection
//!
//! Builds a [`JenkinsApi`] client for the Jenkins installation of a namespace.
//! A fresh client is built on every reconcile pass; nothing is cached.

use super::{JenkinsApi, JenkinsClient, JenkinsError};
use crate::cluster::ObjectStore;
use crate::constants::EDP_ANNOTATIONS_PREFIX;
use crate::crd::Jenkins;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use std::sync::Arc;
use tracing::debug;

/// Annotation suffix naming the secret that holds the Jenkins API token
const TOKEN_ANNOTATION_SUFFIX: &str = "admin-token";

/// Resolves a Jenkins client for a namespace
#[async_trait]
pub trait JenkinsConnector: Send + Sync {
    async fn connect(&self, namespace: &str) -> Result<Arc<dyn JenkinsApi>, JenkinsError>;
}

/// Connector reading the Jenkins resource and its token secret from the cluster
pub struct ClusterJenkinsConnector {
    jenkins: Arc<dyn ObjectStore<Jenkins>>,
    secrets: Arc<dyn ObjectStore<Secret>>,
}

impl std::fmt::Debug for ClusterJenkinsConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClusterJenkinsConnector").finish_non_exhaustive()
    }
}

impl ClusterJenkinsConnector {
    #[must_use]
    pub fn new(jenkins: Arc<dyn ObjectStore<Jenkins>>, secrets: Arc<dyn ObjectStore<Secret>>) -> Self {
        Self { jenkins, secrets }
    }
}

/// Jenkins URL: the `externalUrl` annotation, else the in-cluster service address
#[must_use]
pub fn jenkins_url(jenkins: &Jenkins, namespace: &str) -> String {
    let key = format!("{EDP_ANNOTATIONS_PREFIX}/externalUrl");
    if let Some(url) = jenkins
        .metadata
        .annotations
        .as_ref()
        .and_then(|a| a.get(&key))
        .filter(|url| !url.is_empty())
    {
        return url.clone();
    }

    let base_path = if jenkins.spec.base_path.is_empty() {
        String::new()
    } else {
        format!("/{}", jenkins.spec.base_path.trim_start_matches('/'))
    };
    format!("http://jenkins.{namespace}:8080{base_path}")
}

fn secret_value(secret: &Secret, key: &str) -> Option<String> {
    secret
        .data
        .as_ref()
        .and_then(|data| data.get(key))
        .map(|value| String::from_utf8_lossy(&value.0).into_owned())
}

#[async_trait]
impl JenkinsConnector for ClusterJenkinsConnector {
    async fn connect(&self, namespace: &str) -> Result<Arc<dyn JenkinsApi>, JenkinsError> {
        let jenkins = self
            .jenkins
            .list(namespace)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| {
                JenkinsError::Configuration(format!(
                    "jenkins installation is not found in namespace {namespace}"
                ))
            })?;

        let key = format!("{EDP_ANNOTATIONS_PREFIX}/{TOKEN_ANNOTATION_SUFFIX}");
        let secret_name = jenkins
            .metadata
            .annotations
            .as_ref()
            .and_then(|a| a.get(&key))
            .cloned()
            .ok_or_else(|| {
                JenkinsError::Configuration(format!("Jenkins resource has no {key} annotation"))
            })?;

        let secret = self.secrets.fetch(namespace, &secret_name).await?;
        let username = secret_value(&secret, "username").unwrap_or_default();
        let token = secret_value(&secret, "password").unwrap_or_default();

        let url = jenkins_url(&jenkins, namespace);
        debug!(url = %url, user = %username, "Jenkins client has been created");
        Ok(Arc::new(JenkinsClient::new(&url, &username, &token)?))
    }
}
