//! # Codebase
//!
//! An application, library or autotest project provisioned on the platform.

use crate::crd::common::{LifecycleStatus, StatusTracking};
use serde::{Deserialize, Serialize};

/// Codebase Custom Resource Definition
///
/// # Example
///
/// ```yaml
/// apiVersion: v2.edp.epam.com/v1alpha1
/// kind: Codebase
/// metadata:
///   name: app
///   namespace: edp
/// spec:
///   type: application
///   lang: java
///   buildTool: Maven
///   strategy: create
///   gitServer: gerrit
///   defaultBranch: master
///   jobProvisioning: default
///   ciTool: Jenkins
///   versioning:
///     type: edp
///     startFrom: 0.0.1
/// ```
#[derive(kube::CustomResource, Debug, Clone, Deserialize, Serialize, schemars::JsonSchema)]
#[kube(
    kind = "Codebase",
    group = "v2.edp.epam.com",
    version = "v1alpha1",
    namespaced,
    status = "CodebaseStatus",
    printcolumn = r#"{"name":"Available", "type":"boolean", "jsonPath":".status.available"}, {"name":"Status", "type":"string", "jsonPath":".status.status"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct CodebaseSpec {
    /// application, library or autotests
    #[serde(rename = "type", default)]
    pub codebase_type: String,
    #[serde(default)]
    pub lang: String,
    #[serde(default)]
    pub framework: Option<String>,
    #[serde(default)]
    pub build_tool: String,
    #[serde(default)]
    pub strategy: Strategy,
    /// Remote repository used by the clone strategy
    #[serde(default)]
    pub repository: Option<Repository>,
    /// GitServer resource hosting the repository
    pub git_server: String,
    /// Repository path on the git server, required by the import strategy
    #[serde(default)]
    pub git_url_path: Option<String>,
    #[serde(default)]
    pub default_branch: String,
    /// Provisioner job under `job-provisions/job/ci`
    #[serde(default)]
    pub job_provisioning: Option<String>,
    #[serde(default)]
    pub jira_server: Option<String>,
    #[serde(default)]
    pub ci_tool: CiTool,
    #[serde(default)]
    pub versioning: Versioning,
    #[serde(default)]
    pub empty_project: bool,
}

/// How the repository comes into existence
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    #[default]
    Create,
    Clone,
    Import,
}

#[derive(Debug, Clone, Deserialize, Serialize, schemars::JsonSchema)]
pub struct Repository {
    pub url: String,
}

/// CI system driving the codebase pipelines
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
pub enum CiTool {
    #[default]
    Jenkins,
    #[serde(rename = "GitLab CI", alias = "gitlab ci", alias = "GitlabCI")]
    GitlabCi,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Versioning {
    #[serde(rename = "type", default)]
    pub versioning_type: VersioningType,
    #[serde(default)]
    pub start_from: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum VersioningType {
    #[default]
    Default,
    /// Branch versions are tracked in status history and reset build counters
    Edp,
}

/// Status of a Codebase
#[derive(Debug, Clone, Default, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CodebaseStatus {
    /// Set once the repository and CI folder are provisioned
    #[serde(default)]
    pub available: bool,
    #[serde(flatten)]
    pub lifecycle: LifecycleStatus,
}

impl Codebase {
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.status.as_ref().is_some_and(|s| s.available)
    }

    #[must_use]
    pub fn uses_edp_versioning(&self) -> bool {
        self.spec.versioning.versioning_type == VersioningType::Edp
    }
}

impl StatusTracking for Codebase {
    fn lifecycle(&self) -> Option<&LifecycleStatus> {
        self.status.as_ref().map(|s| &s.lifecycle)
    }

    fn lifecycle_mut(&mut self) -> Option<&mut LifecycleStatus> {
        Some(&mut self.status.get_or_insert_with(CodebaseStatus::default).lifecycle)
    }
}
