//! # CodebaseBranch Reconciliation
//!
//! Chains are selected by the CI tool of the owning codebase:
//!
//! | CI tool   | creation                                   | deletion             |
//! |-----------|--------------------------------------------|----------------------|
//! | Jenkins   | TriggerReleaseJob -> PutCodebaseImageStream | TriggerDeletionJob   |
//! | GitLab CI | PutBranchInGit -> PutCodebaseImageStream    | Empty                |

mod empty;
mod put_branch_in_git;
mod put_image_stream;
mod trigger_job;

pub use empty::Empty;
pub use put_branch_in_git::PutBranchInGit;
pub use put_image_stream::{image_stream_name, PutCodebaseImageStream};
pub use trigger_job::{default_job_params, release_job_params, TriggerJob};

use crate::cluster::ObjectStore;
use crate::config::OperatorConfig;
use crate::controller::chain::{Chain, ChainPair};
use crate::controller::context::{Context, Services};
use crate::controller::error::ReconcilerError;
use crate::controller::reconciler::{Chains, Reconcilable};
use crate::crd::{ActionType, CiTool, Codebase, CodebaseBranch};
use crate::git::branch_work_dir;
use crate::jenkins::JobKind;
use async_trait::async_trait;
use kube::ResourceExt;
use std::path::PathBuf;
use std::sync::Arc;

pub const BRANCH_FINALIZER: &str = "codebase.branch.operator.finalizer.name";

/// Chains for branches of codebases driven by `tool`
#[must_use]
pub fn chains(tool: CiTool, services: &Arc<Services>) -> ChainPair<CodebaseBranch> {
    match tool {
        CiTool::Jenkins => ChainPair {
            create: Chain::new("branch-jenkins")
                .then(TriggerJob::new(Arc::clone(services), JobKind::Release))
                .then(PutCodebaseImageStream::new(Arc::clone(services))),
            delete: Chain::new("branch-jenkins-deletion")
                .then(TriggerJob::new(Arc::clone(services), JobKind::Deletion)),
        },
        CiTool::GitlabCi => ChainPair {
            create: Chain::new("branch-gitlab-ci")
                .then(PutBranchInGit::new(Arc::clone(services)))
                .then(PutCodebaseImageStream::new(Arc::clone(services))),
            delete: Chain::new("branch-gitlab-ci-deletion").then(Empty::new(
                "GitLab CI branches have no deletion job",
                false,
            )),
        },
    }
}

/// The codebase a branch belongs to, `None` when it does not exist
pub(crate) async fn owning_codebase(
    services: &Services,
    branch: &CodebaseBranch,
) -> Result<Option<Codebase>, crate::cluster::StoreError> {
    services
        .stores
        .codebases
        .get(&branch.namespace().unwrap_or_default(), &branch.spec.codebase_name)
        .await
}

#[async_trait]
impl Reconcilable for CodebaseBranch {
    const FINALIZER: &'static str = BRANCH_FINALIZER;
    const ACCEPT_ACTION: ActionType = ActionType::AcceptCodebaseBranchRegistration;

    fn store(services: &Services) -> &Arc<dyn ObjectStore<Self>> {
        &services.stores.branches
    }

    async fn chains<'a>(&self, ctx: &'a Context) -> Result<Chains<'a, Self>, ReconcilerError> {
        match owning_codebase(&ctx.services, self).await? {
            Some(codebase) => Ok(Chains::Ready(ctx.branch_chains.for_tool(codebase.spec.ci_tool))),
            None => Ok(Chains::OwnerMissing(format!(
                "{} codebase is not found",
                self.spec.codebase_name
            ))),
        }
    }

    fn work_dir(&self, config: &OperatorConfig) -> Option<PathBuf> {
        Some(branch_work_dir(
            &config.working_dir,
            &self.namespace().unwrap_or_default(),
            &self.spec.codebase_name,
            &self.spec.branch_name,
        ))
    }
}
