//! # Codebase Reconciliation
//!
//! - `put_vcs_project.rs` - mirrors the codebase into the configured VCS group
//! - `put_jenkins_folder.rs` - requests the Jenkins folder holding the CI jobs
//! - `cleaner.rs` - removes provisioning leftovers on deletion

mod cleaner;
mod put_jenkins_folder;
mod put_vcs_project;

pub use cleaner::Cleaner;
pub use put_jenkins_folder::{jenkins_folder_name, repository_path, ssh_link, PutJenkinsFolder};
pub use put_vcs_project::PutVcsProject;

use crate::cluster::ObjectStore;
use crate::controller::chain::{Chain, ChainPair};
use crate::controller::context::{Context, Services};
use crate::controller::error::ReconcilerError;
use crate::controller::reconciler::{Chains, Reconcilable};
use crate::crd::{ActionType, CiTool, Codebase, CodebaseStatus};
use async_trait::async_trait;
use std::sync::Arc;

pub const CODEBASE_FINALIZER: &str = "codebase.operator.finalizer.name";

/// Chains for codebases driven by `tool`
#[must_use]
pub fn chains(tool: CiTool, services: &Arc<Services>) -> ChainPair<Codebase> {
    let create = match tool {
        CiTool::Jenkins => {
            let chain = Chain::new("codebase-jenkins");
            let chain = if services.config.vcs.integration_enabled {
                chain.then(PutVcsProject::new(Arc::clone(services)))
            } else {
                chain
            };
            chain.then(PutJenkinsFolder::new(Arc::clone(services)))
        }
        CiTool::GitlabCi => {
            Chain::new("codebase-gitlab-ci").then(PutVcsProject::new(Arc::clone(services)))
        }
    };
    let delete = Chain::new("codebase-deletion").then(Cleaner::new(Arc::clone(services)));
    ChainPair { create, delete }
}

#[async_trait]
impl Reconcilable for Codebase {
    const FINALIZER: &'static str = CODEBASE_FINALIZER;
    const ACCEPT_ACTION: ActionType = ActionType::AcceptCodebaseRegistration;

    fn store(services: &Services) -> &Arc<dyn ObjectStore<Self>> {
        &services.stores.codebases
    }

    async fn chains<'a>(&self, ctx: &'a Context) -> Result<Chains<'a, Self>, ReconcilerError> {
        Ok(Chains::Ready(ctx.codebase_chains.for_tool(self.spec.ci_tool)))
    }

    fn on_success(&mut self) {
        self.status
            .get_or_insert_with(CodebaseStatus::default)
            .available = true;
    }
}
