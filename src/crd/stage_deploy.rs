//! # CDStageDeploy
//!
//! Request to deploy one codebase tag into a CD pipeline stage.

use serde::{Deserialize, Serialize};

#[derive(kube::CustomResource, Debug, Clone, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[kube(
    kind = "CDStageDeploy",
    group = "v2.edp.epam.com",
    version = "v1alpha1",
    namespaced,
    printcolumn = r#"{"name":"Pipeline", "type":"string", "jsonPath":".spec.pipeline"}, {"name":"Stage", "type":"string", "jsonPath":".spec.stage"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct CDStageDeploySpec {
    pub pipeline: String,
    pub stage: String,
    pub tag: CodebaseTag,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
pub struct CodebaseTag {
    pub codebase: String,
    pub tag: String,
}
