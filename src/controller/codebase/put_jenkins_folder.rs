use crate::constants::CODEBASE_LABEL_KEY;
use crate::controller::chain::{Handler, HandlerError};
use crate::controller::context::Services;
use crate::crd::{
    ActionType, Codebase, GitServer, JenkinsFolder, JenkinsFolderSpec, JenkinsFolderStatus,
    JenkinsJob, Strategy,
};
use anyhow::{anyhow, Context as _};
use async_trait::async_trait;
use kube::api::ObjectMeta;
use kube::ResourceExt;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

/// Requests the Jenkins folder of a codebase from the Jenkins operator
#[derive(Debug)]
pub struct PutJenkinsFolder {
    services: Arc<Services>,
}

impl PutJenkinsFolder {
    #[must_use]
    pub fn new(services: Arc<Services>) -> Self {
        Self { services }
    }
}

#[must_use]
pub fn jenkins_folder_name(codebase: &str) -> String {
    format!("{codebase}-codebase")
}

/// Repository path on the git server; imported codebases keep their own path
pub fn repository_path(codebase: &Codebase) -> anyhow::Result<String> {
    match codebase.spec.strategy {
        Strategy::Import => codebase
            .spec
            .git_url_path
            .clone()
            .ok_or_else(|| anyhow!("gitUrlPath is not defined in spec for import strategy")),
        Strategy::Create | Strategy::Clone => Ok(format!("/{}", codebase.name_any())),
    }
}

#[must_use]
pub fn ssh_link(path: &str, git_server: &GitServer) -> String {
    format!(
        "ssh://{}@{}:{}{}",
        git_server.spec.git_user, git_server.spec.git_host, git_server.spec.ssh_port, path
    )
}

impl PutJenkinsFolder {
    fn job_params(&self, codebase: &Codebase, git_server: &GitServer) -> anyhow::Result<String> {
        let path = repository_path(codebase)?;
        let link = ssh_link(&path, git_server);
        info!(link = %link, "SSH link has been generated");

        let params = BTreeMap::from([
            ("PARAM", "true".to_string()),
            ("NAME", codebase.name_any()),
            ("BUILD_TOOL", codebase.spec.build_tool.to_lowercase()),
            ("DEFAULT_BRANCH", codebase.spec.default_branch.clone()),
            ("GIT_SERVER_CR_NAME", git_server.name_any()),
            ("GIT_SERVER_CR_VERSION", "v2".to_string()),
            ("GIT_CREDENTIALS_ID", git_server.spec.name_ssh_key_secret.clone()),
            ("REPOSITORY_PATH", link),
            (
                "JIRA_INTEGRATION_ENABLED",
                codebase.spec.jira_server.is_some().to_string(),
            ),
            ("PLATFORM_TYPE", self.services.config.platform_type.clone()),
        ]);
        serde_json::to_string(&params).context("can't marshal job parameters into json string")
    }
}

#[async_trait]
impl Handler<Codebase> for PutJenkinsFolder {
    fn name(&self) -> &'static str {
        "put-jenkins-folder"
    }

    fn action(&self) -> ActionType {
        ActionType::PutJenkinsFolder
    }

    async fn serve(&self, codebase: &mut Codebase) -> Result<(), HandlerError> {
        let name = codebase.name_any();
        let namespace = codebase.namespace().unwrap_or_default();
        let stores = &self.services.stores;

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

        let config = self.job_params(codebase, &git_server)?;

        let folder_name = jenkins_folder_name(&name);
        if stores
            .jenkins_folders
            .get(&namespace, &folder_name)
            .await
            .with_context(|| format!("failed to get jenkins folder {folder_name}"))?
            .is_some()
        {
            info!(name = %folder_name, "Jenkins folder already exists in cluster");
            return Ok(());
        }

        let provisioner = codebase
            .spec
            .job_provisioning
            .as_deref()
            .ok_or_else(|| anyhow!("jobProvisioning is not defined in spec"))?;

        let folder = JenkinsFolder {
            metadata: ObjectMeta {
                name: Some(folder_name.clone()),
                namespace: Some(namespace),
                labels: Some(BTreeMap::from([(CODEBASE_LABEL_KEY.to_string(), name)])),
                ..ObjectMeta::default()
            },
            spec: JenkinsFolderSpec {
                code_base_name: None,
                job: Some(JenkinsJob {
                    name: format!("job-provisions/job/ci/job/{provisioner}"),
                    config,
                }),
            },
            status: Some(JenkinsFolderStatus {
                available: false,
                status: "in progress".to_string(),
            }),
        };

        match stores.jenkins_folders.create(&folder).await {
            Ok(_) => info!(name = %folder_name, "Jenkins folder has been created"),
            Err(e) if e.is_already_exists() => {
                info!(name = %folder_name, "Jenkins folder already exists in cluster");
            }
            Err(e) => {
                return Err(anyhow::Error::new(e)
                    .context(format!("couldn't create jenkins folder {folder_name}"))
                    .into())
            }
        }
        Ok(())
    }
}
