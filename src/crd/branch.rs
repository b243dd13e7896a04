//! # CodebaseBranch
//!
//! A branch of a codebase, optionally a release branch cut by a CI job.

use crate::crd::common::{LifecycleStatus, StatusTracking};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// CodebaseBranch Custom Resource Definition
///
/// # Example
///
/// ```yaml
/// apiVersion: v2.edp.epam.com/v1alpha1
/// kind: CodebaseBranch
/// metadata:
///   name: app-release-1.0
///   namespace: edp
/// spec:
///   codebaseName: app
///   branchName: release/1.0
///   fromCommit: ""
///   version: 1.0.0-SNAPSHOT
///   release: true
///   releaseJobParams:
///     branchName: RELEASE_NAME
///     fromCommit: COMMIT_ID
/// ```
#[derive(kube::CustomResource, Debug, Clone, Deserialize, Serialize, schemars::JsonSchema)]
#[kube(
    kind = "CodebaseBranch",
    group = "v2.edp.epam.com",
    version = "v1alpha1",
    namespaced,
    status = "CodebaseBranchStatus",
    printcolumn = r#"{"name":"Status", "type":"string", "jsonPath":".status.status"}, {"name":"Codebase", "type":"string", "jsonPath":".spec.codebaseName"}, {"name":"Branch", "type":"string", "jsonPath":".spec.branchName"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct CodebaseBranchSpec {
    pub codebase_name: String,
    pub branch_name: String,
    /// Commit the branch starts from; empty means the default branch head
    #[serde(default)]
    pub from_commit: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default)]
    pub release: bool,
    /// Spec field name to release job parameter name, e.g. `fromCommit: COMMIT_ID`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_job_params: Option<BTreeMap<String, String>>,
}

/// Status of a CodebaseBranch
#[derive(Debug, Clone, Default, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CodebaseBranchStatus {
    #[serde(flatten)]
    pub lifecycle: LifecycleStatus,
    /// Every version this branch has been released under, oldest first
    #[serde(default)]
    pub version_history: Vec<String>,
    /// Build counter of the current version
    ///
    /// Serialized as null when unset so a merge patch clears it.
    #[serde(default)]
    pub build: Option<String>,
    #[serde(default)]
    pub last_successful_build: Option<String>,
}

impl CodebaseBranch {
    /// Lifecycle value of the branch, empty when no status was written yet
    #[must_use]
    pub fn lifecycle_status(&self) -> &str {
        self.status
            .as_ref()
            .map_or("", |s| s.lifecycle.status.as_str())
    }
}

impl StatusTracking for CodebaseBranch {
    fn lifecycle(&self) -> Option<&LifecycleStatus> {
        self.status.as_ref().map(|s| &s.lifecycle)
    }

    fn lifecycle_mut(&mut self) -> Option<&mut LifecycleStatus> {
        Some(
            &mut self
                .status
                .get_or_insert_with(CodebaseBranchStatus::default)
                .lifecycle,
        )
    }
}
