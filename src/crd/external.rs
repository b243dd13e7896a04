//! # Platform Resources
//!
//! Resources owned by sibling operators that this operator reads or creates.
//! Only the fields the handler chains touch are modelled; unknown fields are
//! ignored on read.

use serde::{Deserialize, Serialize};

/// Jenkins folder holding the CI jobs of one codebase
#[derive(kube::CustomResource, Debug, Clone, Default, Deserialize, Serialize, schemars::JsonSchema)]
#[kube(
    kind = "JenkinsFolder",
    group = "v2.edp.epam.com",
    version = "v1alpha1",
    namespaced,
    status = "JenkinsFolderStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct JenkinsFolderSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_base_name: Option<String>,
    /// Provisioner job that fills the folder
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job: Option<JenkinsJob>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
pub struct JenkinsJob {
    pub name: String,
    /// JSON encoded job parameters
    pub config: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct JenkinsFolderStatus {
    #[serde(default)]
    pub available: bool,
    #[serde(default)]
    pub status: String,
}

impl JenkinsFolder {
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.status.as_ref().is_some_and(|s| s.available)
    }
}

/// Jenkins installation of a namespace
#[derive(kube::CustomResource, Debug, Clone, Default, Deserialize, Serialize, schemars::JsonSchema)]
#[kube(kind = "Jenkins", group = "v2.edp.epam.com", version = "v1alpha1", namespaced)]
#[serde(rename_all = "camelCase")]
pub struct JenkinsSpec {
    /// Path prefix Jenkins is served under
    #[serde(default)]
    pub base_path: String,
}

/// Git server hosting codebase repositories
#[derive(kube::CustomResource, Debug, Clone, Default, Deserialize, Serialize, schemars::JsonSchema)]
#[kube(kind = "GitServer", group = "v2.edp.epam.com", version = "v1alpha1", namespaced)]
#[serde(rename_all = "camelCase")]
pub struct GitServerSpec {
    pub git_host: String,
    pub git_user: String,
    #[serde(default)]
    pub http_port: i32,
    pub ssh_port: i32,
    /// Secret holding the `id_rsa` private key
    pub name_ssh_key_secret: String,
}

/// Platform component registration, e.g. the docker registry
#[derive(kube::CustomResource, Debug, Clone, Default, Deserialize, Serialize, schemars::JsonSchema)]
#[kube(kind = "EDPComponent", group = "v1.edp.epam.com", version = "v1alpha1", namespaced)]
#[serde(rename_all = "camelCase")]
pub struct EDPComponentSpec {
    #[serde(rename = "type", default)]
    pub component_type: String,
    pub url: String,
    #[serde(default)]
    pub visible: bool,
}
