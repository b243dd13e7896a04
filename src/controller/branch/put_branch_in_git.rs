use super::owning_codebase;
use crate::constants::PRIVATE_SSH_KEY_NAME;
use crate::controller::chain::{Handler, HandlerError};
use crate::controller::codebase::repository_path;
use crate::controller::context::Services;
use crate::controller::status::update_status;
use crate::controller::versions::process_new_version;
use crate::crd::{ActionType, CodebaseBranch, CodebaseBranchStatus};
use crate::git::{branch_work_dir, is_populated};
use anyhow::{anyhow, Context as _};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::ResourceExt;
use std::sync::Arc;
use tracing::info;

/// Creates the branch in the codebase repository for GitLab CI codebases
#[derive(Debug)]
pub struct PutBranchInGit {
    services: Arc<Services>,
}

impl PutBranchInGit {
    #[must_use]
    pub fn new(services: Arc<Services>) -> Self {
        Self { services }
    }
}

fn private_key(secret: &Secret) -> Option<String> {
    secret
        .data
        .as_ref()
        .and_then(|data| data.get(PRIVATE_SSH_KEY_NAME))
        .map(|value| String::from_utf8_lossy(&value.0).into_owned())
}

#[async_trait]
impl Handler<CodebaseBranch> for PutBranchInGit {
    fn name(&self) -> &'static str {
        "put-branch-in-git"
    }

    fn action(&self) -> ActionType {
        ActionType::PutBranchInGit
    }

    async fn serve(&self, branch: &mut CodebaseBranch) -> Result<(), HandlerError> {
        let namespace = branch.namespace().unwrap_or_default();
        let stores = &self.services.stores;

        branch
            .status
            .get_or_insert_with(CodebaseBranchStatus::default)
            .lifecycle
            .record_intermediate(ActionType::AcceptCodebaseBranchRegistration);
        update_status(stores.branches.as_ref(), branch)
            .await
            .context("couldn't set intermediate status")?;

        let codebase = owning_codebase(&self.services, branch)
            .await
            .with_context(|| format!("couldn't get {} codebase", branch.spec.codebase_name))?
            .ok_or_else(|| anyhow!("{} codebase is not found", branch.spec.codebase_name))?;
        let codebase_name = codebase.name_any();

        if !codebase.is_available() {
            return Err(HandlerError::Unavailable(format!(
                "{codebase_name} codebase is unavailable"
            )));
        }

        if codebase.uses_edp_versioning() {
            process_new_version(stores.branches.as_ref(), branch)
                .await
                .with_context(|| {
                    format!("couldn't process new version for {} branch", branch.spec.branch_name)
                })?;
        }

        let git_server = stores
            .git_servers
            .fetch(&namespace, &codebase.spec.git_server)
            .await
            .with_context(|| {
                format!(
                    "an error has occurred while getting {} Git Server CR",
                    codebase.spec.git_server
                )
            })?;

        let secret_name = &git_server.spec.name_ssh_key_secret;
        let key = stores
            .secrets
            .fetch(&namespace, secret_name)
            .await
            .map_err(anyhow::Error::new)
            .and_then(|secret| {
                private_key(&secret).ok_or_else(|| anyhow!("{PRIVATE_SSH_KEY_NAME} key is missing"))
            })
            .with_context(|| format!("an error has occurred while getting {secret_name} secret"))?;

        let work_dir = branch_work_dir(
            &self.services.config.working_dir,
            &namespace,
            &codebase_name,
            &branch.spec.branch_name,
        );
        let populated = is_populated(&work_dir)
            .await
            .with_context(|| format!("couldn't inspect {}", work_dir.display()))?;

        let user = &git_server.spec.git_user;
        if !populated {
            let url = format!(
                "ssh://{}:{}{}",
                git_server.spec.git_host,
                git_server.spec.ssh_port,
                repository_path(&codebase)?
            );
            self.services
                .git
                .clone_by_ssh(&key, user, &url, &work_dir)
                .await
                .with_context(|| format!("couldn't clone {url}"))?;
            info!(url = %url, path = %work_dir.display(), "Repository has been cloned");
        }

        self.services
            .git
            .create_remote_branch(&key, user, &work_dir, &branch.spec.branch_name)
            .await
            .with_context(|| format!("couldn't create branch {}", branch.spec.branch_name))?;
        info!(branch = %branch.spec.branch_name, codebase = %codebase_name, "Branch has been pushed to git");
        Ok(())
    }
}
