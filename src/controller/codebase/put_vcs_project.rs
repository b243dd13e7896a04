use crate::controller::chain::{Handler, HandlerError};
use crate::controller::context::Services;
use crate::crd::{ActionType, Codebase};
use anyhow::Context as _;
use async_trait::async_trait;
use kube::ResourceExt;
use std::sync::Arc;
use tracing::info;

/// Creates the codebase project in the VCS group unless it exists
#[derive(Debug)]
pub struct PutVcsProject {
    services: Arc<Services>,
}

impl PutVcsProject {
    #[must_use]
    pub fn new(services: Arc<Services>) -> Self {
        Self { services }
    }
}

#[async_trait]
impl Handler<Codebase> for PutVcsProject {
    fn name(&self) -> &'static str {
        "put-vcs-project"
    }

    fn action(&self) -> ActionType {
        ActionType::PutVcsProject
    }

    async fn serve(&self, codebase: &mut Codebase) -> Result<(), HandlerError> {
        let name = codebase.name_any();
        let namespace = codebase.namespace().unwrap_or_default();

        let Some(project) = self
            .services
            .vcs
            .connect(&namespace, &name)
            .await
            .context("unable to get VCS config")?
        else {
            info!(codebase = %name, "VCS integration is disabled, skipping");
            return Ok(());
        };

        let exists = project
            .client
            .project_exists(&project.group_path, &name)
            .await
            .with_context(|| format!("couldn't check project {name} in VCS"))?;

        if exists {
            info!(codebase = %name, group = %project.group_path, "VCS project already exists");
        } else {
            project
                .client
                .create_project(&project.group_path, &name)
                .await
                .with_context(|| format!("couldn't create project {name} in VCS"))?;
        }

        let ssh_url = project
            .client
            .repository_ssh_url(&project.group_path, &name)
            .await
            .with_context(|| format!("couldn't get ssh url of project {name}"))?;
        info!(codebase = %name, url = %ssh_url, "VCS project is in place");
        Ok(())
    }
}
