use super::owning_codebase;
use crate::controller::chain::{Handler, HandlerError};
use crate::controller::codebase::jenkins_folder_name;
use crate::controller::context::Services;
use crate::controller::versions::{has_new_version, process_new_version};
use crate::crd::{ActionType, Codebase, CodebaseBranch, JenkinsFolder, STATUS_INIT};
use crate::jenkins::{JenkinsError, JobKind, JobOutcome, JobTriggerPoller};
use anyhow::{anyhow, bail, Context as _};
use async_trait::async_trait;
use kube::ResourceExt;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// Triggers the release or deletion job of a branch in Jenkins
#[derive(Debug)]
pub struct TriggerJob {
    services: Arc<Services>,
    kind: JobKind,
}

impl TriggerJob {
    #[must_use]
    pub fn new(services: Arc<Services>, kind: JobKind) -> Self {
        Self { services, kind }
    }
}

/// Fixed `RELEASE_NAME` and `COMMIT_ID` parameters of the release management jobs
pub fn default_job_params(branch: &CodebaseBranch) -> HashMap<String, String> {
    HashMap::from([
        ("RELEASE_NAME".to_string(), branch.spec.branch_name.clone()),
        ("COMMIT_ID".to_string(), branch.spec.from_commit.clone()),
    ])
}

/// Parameters of the release job.
///
/// When the branch declares `releaseJobParams` they replace the defaults:
/// every mapped spec field must resolve to a string in the branch spec
/// merged over the codebase spec.
pub fn release_job_params(
    branch: &CodebaseBranch,
    codebase: &Codebase,
) -> anyhow::Result<HashMap<String, String>> {
    let Some(mapping) = branch
        .spec
        .release_job_params
        .as_ref()
        .filter(|m| !m.is_empty())
    else {
        return Ok(default_job_params(branch));
    };

    let mut fields = match serde_json::to_value(&codebase.spec)? {
        serde_json::Value::Object(map) => map,
        _ => bail!("codebase spec is not an object"),
    };
    if let serde_json::Value::Object(branch_fields) = serde_json::to_value(&branch.spec)? {
        fields.extend(branch_fields);
    }

    mapping
        .iter()
        .map(|(field, param)| {
            fields
                .get(field)
                .and_then(serde_json::Value::as_str)
                .map(|value| (param.clone(), value.to_string()))
                .ok_or_else(|| anyhow!("wrong trigger release field type: {field}"))
        })
        .collect()
}

impl TriggerJob {
    async fn codebase(&self, branch: &CodebaseBranch) -> anyhow::Result<Codebase> {
        owning_codebase(&self.services, branch)
            .await
            .with_context(|| format!("couldn't get {} codebase", branch.spec.codebase_name))?
            .ok_or_else(|| anyhow!("{} codebase is not found", branch.spec.codebase_name))
    }

    async fn jenkins_folder(&self, codebase: &Codebase) -> anyhow::Result<Option<JenkinsFolder>> {
        let name = jenkins_folder_name(&codebase.name_any());
        self.services
            .stores
            .jenkins_folders
            .get(&codebase.namespace().unwrap_or_default(), &name)
            .await
            .with_context(|| format!("failed to get jenkins folder {name}"))
    }

    async fn release(&self, branch: &mut CodebaseBranch) -> Result<(), HandlerError> {
        let codebase = self.codebase(branch).await?;
        let codebase_name = codebase.name_any();

        let folder = self.jenkins_folder(&codebase).await?;
        let folder_ready = folder.as_ref().is_some_and(JenkinsFolder::is_available);
        if !codebase.is_available() || !folder_ready {
            return Err(HandlerError::Unavailable(format!(
                "{codebase_name} codebase is unavailable"
            )));
        }

        if codebase.uses_edp_versioning() && has_new_version(branch) {
            process_new_version(self.services.stores.branches.as_ref(), branch)
                .await
                .with_context(|| {
                    format!("couldn't process new version for {} branch", branch.spec.branch_name)
                })?;
        }

        let status = branch.lifecycle_status();
        if !status.is_empty() && status != STATUS_INIT {
            info!(branch = %branch.name_any(), status = %status, "Release is not in init status. Skipped");
            return Ok(());
        }

        let params = release_job_params(branch, &codebase)
            .context("unable to convert codebase branch spec to params map")?;
        let jenkins = self
            .services
            .jenkins
            .connect(&branch.namespace().unwrap_or_default())
            .await
            .context("couldn't create jenkins client")?;

        let job = self.kind.job_name(&codebase_name);
        let mut poller =
            JobTriggerPoller::new(jenkins.as_ref(), self.services.config.release_job_policy());
        match poller
            .trigger(&job, &params)
            .await
            .context("release job has not been finished")?
        {
            JobOutcome::Succeeded => {
                info!(branch = %branch.name_any(), job = %job, "Release has been created");
            }
            // The branch is still reported as finished, the job color is only logged.
            JobOutcome::Failed { color } => {
                info!(branch = %branch.name_any(), job = %job, color = %color, "Failed to create release");
            }
            JobOutcome::NotFound => {
                return Err(anyhow!("Couldn't trigger {job} job")
                    .context("unable to trigger release job")
                    .into());
            }
        }
        Ok(())
    }

    async fn deletion(&self, branch: &mut CodebaseBranch) -> Result<(), HandlerError> {
        let codebase = self.codebase(branch).await?;
        let codebase_name = codebase.name_any();

        let params = default_job_params(branch);
        let jenkins = self
            .services
            .jenkins
            .connect(&branch.namespace().unwrap_or_default())
            .await
            .context("couldn't create jenkins client")?;

        let job = self.kind.job_name(&codebase_name);
        let mut poller =
            JobTriggerPoller::new(jenkins.as_ref(), self.services.config.deletion_job_policy());
        match poller
            .trigger(&job, &params)
            .await
            .context("unable to get deletion job status")?
        {
            JobOutcome::Succeeded => {
                info!(branch = %branch.name_any(), job = %job, "Deletion job has been finished");
                Ok(())
            }
            JobOutcome::NotFound => {
                info!(branch = %branch.name_any(), job = %job, "Deletion job not found, skipping");
                Ok(())
            }
            JobOutcome::Failed { color } => Err(anyhow::Error::new(JenkinsError::JobFailed {
                name: job,
                color,
            })
            .context("deletion job failed")
            .into()),
        }
    }
}

#[async_trait]
impl Handler<CodebaseBranch> for TriggerJob {
    fn name(&self) -> &'static str {
        match self.kind {
            JobKind::Release => "trigger-release-job",
            JobKind::Deletion => "trigger-deletion-job",
        }
    }

    fn action(&self) -> ActionType {
        match self.kind {
            JobKind::Release => ActionType::TriggerReleaseJob,
            JobKind::Deletion => ActionType::TriggerDeletionJob,
        }
    }

    async fn serve(&self, branch: &mut CodebaseBranch) -> Result<(), HandlerError> {
        match self.kind {
            JobKind::Release => self.release(branch).await,
            JobKind::Deletion => self.deletion(branch).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::{CodebaseBranchSpec, CodebaseSpec};
    use std::collections::BTreeMap;

    fn codebase() -> Codebase {
        let spec: CodebaseSpec = serde_json::from_value(serde_json::json!({
            "gitServer": "gerrit",
            "buildTool": "maven",
            "defaultBranch": "master",
            "lang": "java"
        }))
        .unwrap();
        Codebase::new("app", spec)
    }

    fn branch(mapping: Option<BTreeMap<String, String>>) -> CodebaseBranch {
        CodebaseBranch::new(
            "app-release-1-0",
            CodebaseBranchSpec {
                codebase_name: "app".to_string(),
                branch_name: "release/1.0".to_string(),
                from_commit: "abc123".to_string(),
                version: Some("1.0.0".to_string()),
                release: true,
                release_job_params: mapping,
            },
        )
    }

    #[test]
    fn test_default_params() {
        let params = release_job_params(&branch(None), &codebase()).unwrap();
        assert_eq!(params.len(), 2);
        assert_eq!(params["RELEASE_NAME"], "release/1.0");
        assert_eq!(params["COMMIT_ID"], "abc123");
    }

    #[test]
    fn test_mapping_reads_branch_and_codebase_fields() {
        let mapping = BTreeMap::from([
            ("version".to_string(), "VERSION".to_string()),
            ("buildTool".to_string(), "TOOL".to_string()),
            ("codebaseName".to_string(), "APP".to_string()),
        ]);
        let params = release_job_params(&branch(Some(mapping)), &codebase()).unwrap();
        assert_eq!(params["VERSION"], "1.0.0");
        assert_eq!(params["TOOL"], "maven");
        assert_eq!(params["APP"], "app");
        assert_eq!(params.len(), 3);
    }

    #[test]
    fn test_mapping_replaces_default_params() {
        let mapping = BTreeMap::from([("fromCommit".to_string(), "COMMIT".to_string())]);
        let params = release_job_params(&branch(Some(mapping)), &codebase()).unwrap();
        assert_eq!(
            params,
            HashMap::from([("COMMIT".to_string(), "abc123".to_string())])
        );
    }

    #[test]
    fn test_deletion_params_ignore_mapping() {
        let mapping = BTreeMap::from([("unknown".to_string(), "X".to_string())]);
        let params = default_job_params(&branch(Some(mapping)));
        assert_eq!(params.len(), 2);
        assert_eq!(params["RELEASE_NAME"], "release/1.0");
        assert_eq!(params["COMMIT_ID"], "abc123");
    }

    #[test]
    fn test_non_string_field_is_rejected() {
        let mapping = BTreeMap::from([("release".to_string(), "RELEASE".to_string())]);
        let err = release_job_params(&branch(Some(mapping)), &codebase()).unwrap_err();
        assert!(err.to_string().contains("wrong trigger release field type"));
    }

    #[test]
    fn test_missing_field_is_rejected() {
        let mapping = BTreeMap::from([("unknown".to_string(), "X".to_string())]);
        assert!(release_job_params(&branch(Some(mapping)), &codebase()).is_err());
    }
}
