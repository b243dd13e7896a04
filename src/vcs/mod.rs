//! # Version Control Hosting
//!
//! Adapters for the VCS the codebase projects are mirrored into.
//!
//! - `gitlab.rs` - GitLab API v4
//! - `bitbucket.rs` - Bitbucket Server REST API 1.0
//!
//! The adapter is selected by the configured tool name and built per request
//! from the `vcs-autouser-codebase-{name}-temp` credentials secret.

mod bitbucket;
mod gitlab;

pub use bitbucket::BitBucket;
pub use gitlab::GitLab;

use crate::cluster::{ObjectStore, StoreError};
use crate::config::VcsSettings;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use reqwest::Url;
use std::str::FromStr;
use std::sync::Arc;

/// Error type for VCS operations
#[derive(Debug, thiserror::Error)]
pub enum VcsError {
    #[error("invalid VCS tool. Currently we do not support {0}")]
    UnsupportedTool(String),

    #[error("Invalid VCS group URL {url}: {reason}")]
    InvalidGroupUrl { url: String, reason: String },

    #[error("VCS request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("VCS returned HTTP {status} for {url}")]
    Unexpected { status: u16, url: String },

    #[error("VCS group {0} not found")]
    GroupNotFound(String),

    #[error("VCS project {0} not found")]
    ProjectNotFound(String),

    #[error("Unable to get VCS credentials: {0}")]
    Credentials(#[from] StoreError),
}

/// Project operations of a VCS
#[async_trait]
pub trait Vcs: Send + Sync {
    async fn project_exists(&self, group_path: &str, project: &str) -> Result<bool, VcsError>;

    /// Create the project and return its identifier
    async fn create_project(&self, group_path: &str, project: &str) -> Result<String, VcsError>;

    async fn repository_ssh_url(&self, group_path: &str, project: &str)
        -> Result<String, VcsError>;
}

/// Supported VCS implementations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VcsTool {
    GitLab,
    BitBucket,
}

impl FromStr for VcsTool {
    type Err = VcsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gitlab" => Ok(Self::GitLab),
            "bitbucket" => Ok(Self::BitBucket),
            other => Err(VcsError::UnsupportedTool(other.to_string())),
        }
    }
}

/// Build the adapter for `tool` against the VCS at `host_url`
pub fn create_vcs_client(
    tool: VcsTool,
    host_url: &str,
    username: &str,
    password: &str,
) -> Result<Arc<dyn Vcs>, VcsError> {
    Ok(match tool {
        VcsTool::GitLab => Arc::new(GitLab::new(host_url, username, password)?),
        VcsTool::BitBucket => Arc::new(BitBucket::new(host_url, username, password)?),
    })
}

/// Host part and group path of a VCS group URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupLocation {
    /// `scheme://host[:port]`
    pub host_url: String,
    /// Group path without the leading slash
    pub group_path: String,
}

impl GroupLocation {
    /// Split `https://gitlab.example.com/edp/apps` into host and `edp/apps`
    pub fn parse(group_name_url: &str) -> Result<Self, VcsError> {
        let invalid = |reason: &str| VcsError::InvalidGroupUrl {
            url: group_name_url.to_string(),
            reason: reason.to_string(),
        };
        let url = Url::parse(group_name_url).map_err(|e| invalid(&e.to_string()))?;
        let host = url.host_str().ok_or_else(|| invalid("missing host"))?;
        let host_url = match url.port() {
            Some(port) => format!("{}://{host}:{port}", url.scheme()),
            None => format!("{}://{host}", url.scheme()),
        };
        let group_path = url.path().trim_matches('/').to_string();
        if group_path.is_empty() {
            return Err(invalid("missing group path"));
        }
        Ok(Self {
            host_url,
            group_path,
        })
    }
}

/// VCS client bound to the group a codebase lives in
#[derive(Clone)]
pub struct VcsProject {
    pub client: Arc<dyn Vcs>,
    pub group_path: String,
}

impl std::fmt::Debug for VcsProject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VcsProject")
            .field("group_path", &self.group_path)
            .finish_non_exhaustive()
    }
}

/// Resolves the VCS client for a codebase
#[async_trait]
pub trait VcsConnector: Send + Sync {
    /// `None` when VCS integration is disabled
    async fn connect(&self, namespace: &str, codebase: &str)
        -> Result<Option<VcsProject>, VcsError>;
}

/// Connector reading the per-codebase VCS credentials from the cluster
pub struct ClusterVcsConnector {
    settings: VcsSettings,
    secrets: Arc<dyn ObjectStore<Secret>>,
}

impl std::fmt::Debug for ClusterVcsConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClusterVcsConnector")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl ClusterVcsConnector {
    #[must_use]
    pub fn new(settings: VcsSettings, secrets: Arc<dyn ObjectStore<Secret>>) -> Self {
        Self { settings, secrets }
    }
}

/// Secret holding the VCS credentials used while provisioning a codebase
#[must_use]
pub fn credentials_secret_name(codebase: &str) -> String {
    format!("vcs-autouser-codebase-{codebase}-temp")
}

#[async_trait]
impl VcsConnector for ClusterVcsConnector {
    async fn connect(
        &self,
        namespace: &str,
        codebase: &str,
    ) -> Result<Option<VcsProject>, VcsError> {
        if !self.settings.integration_enabled {
            return Ok(None);
        }

        let tool: VcsTool = self.settings.tool_name.parse()?;
        let location = GroupLocation::parse(&self.settings.group_name_url)?;

        let secret = self
            .secrets
            .fetch(namespace, &credentials_secret_name(codebase))
            .await?;
        let value = |key: &str| {
            secret
                .data
                .as_ref()
                .and_then(|d| d.get(key))
                .map(|v| String::from_utf8_lossy(&v.0).into_owned())
                .unwrap_or_default()
        };

        let client = create_vcs_client(tool, &location.host_url, &value("username"), &value("password"))?;
        Ok(Some(VcsProject {
            client,
            group_path: location.group_path,
        }))
    }
}

/// Append one path segment, percent-encoding any `/` inside it
pub(crate) fn push_segment(url: &mut Url, segment: &str) {
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.push(segment);
    }
}
