//! # CodebaseImageStream
//!
//! Container image built from a codebase branch and the tags pushed for it.
//! Labels of the form `pipeline/stage` request deployment of the newest tag.

use crate::crd::common::{LifecycleStatus, StatusTracking};
use serde::{Deserialize, Serialize};

#[derive(kube::CustomResource, Debug, Clone, Deserialize, Serialize, schemars::JsonSchema)]
#[kube(
    kind = "CodebaseImageStream",
    group = "v2.edp.epam.com",
    version = "v1alpha1",
    namespaced,
    shortname = "cis"
)]
#[serde(rename_all = "camelCase")]
pub struct CodebaseImageStreamSpec {
    /// Codebase the image is built from
    #[serde(default)]
    pub codebase: String,
    pub image_name: String,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
pub struct Tag {
    pub name: String,
    /// Push time, `%Y-%m-%dT%H:%M:%S`
    #[serde(default)]
    pub created: String,
}

impl StatusTracking for CodebaseImageStream {
    fn lifecycle(&self) -> Option<&LifecycleStatus> {
        None
    }

    fn lifecycle_mut(&mut self) -> Option<&mut LifecycleStatus> {
        None
    }
}
