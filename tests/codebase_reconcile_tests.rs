//! # Codebase Reconciliation Tests
//!
//! These tests verify:
//! - Jenkins folder provisioning and its job parameters
//! - VCS project mirroring when the integration is enabled
//! - Failure recording for incomplete specs
//! - Cleanup of provisioning leftovers on deletion

mod common;

use codebase_operator::cluster::ObjectStore;
use codebase_operator::constants::CODEBASE_LABEL_KEY;
use codebase_operator::controller::codebase::CODEBASE_FINALIZER;
use codebase_operator::crd::{ActionType, CiTool, Strategy, STATUS_FAILED, STATUS_FINISHED};
use common::{codebase, git_server, jenkins_folder, secret, TestEnv, NS, SSH_SECRET, VCS_GROUP};
use kube::ResourceExt;
use kube_runtime::controller::Action;
use serde_json::Value;

async fn env_with_git_server(vcs: bool) -> TestEnv {
    let env = TestEnv::with_vcs(vcs);
    env.cluster.git_servers.create(&git_server()).await.unwrap();
    env
}

fn folder_params(config: &str) -> Value {
    serde_json::from_str(config).unwrap()
}

#[tokio::test]
async fn test_jenkins_codebase_gets_folder_and_becomes_available() {
    let env = env_with_git_server(false).await;
    env.cluster
        .codebases
        .create(&codebase("app", CiTool::Jenkins, false, false))
        .await
        .unwrap();

    let action = env.reconcile_codebase("app").await.unwrap();
    assert_eq!(action, Action::await_change());

    let folder = env
        .cluster
        .jenkins_folders
        .get(NS, "app-codebase")
        .await
        .unwrap()
        .expect("jenkins folder should be created");
    assert_eq!(
        folder.labels().get(CODEBASE_LABEL_KEY).map(String::as_str),
        Some("app")
    );

    let job = folder.spec.job.expect("folder should carry a job");
    assert_eq!(job.name, "job-provisions/job/ci/job/default");
    let params = folder_params(&job.config);
    assert_eq!(params["NAME"], "app");
    assert_eq!(params["BUILD_TOOL"], "maven");
    assert_eq!(params["DEFAULT_BRANCH"], "master");
    assert_eq!(params["GIT_SERVER_CR_NAME"], "gerrit");
    assert_eq!(params["GIT_CREDENTIALS_ID"], SSH_SECRET);
    assert_eq!(params["REPOSITORY_PATH"], "ssh://edp-ci@gerrit.edp:29418/app");
    assert_eq!(params["JIRA_INTEGRATION_ENABLED"], "false");
    assert_eq!(params["PLATFORM_TYPE"], "kubernetes");

    let stored = env.codebase("app").await.unwrap();
    assert!(stored.is_available());
    assert!(stored.finalizers().iter().any(|f| f == CODEBASE_FINALIZER));
    let status = stored.status.unwrap().lifecycle;
    assert_eq!(status.status, STATUS_FINISHED);
    assert_eq!(status.action, Some(ActionType::PutJenkinsFolder));
    assert!(env.vcs.created().is_empty());
}

#[tokio::test]
async fn test_import_strategy_uses_git_url_path() {
    let env = env_with_git_server(false).await;
    let mut object = codebase("app", CiTool::Jenkins, false, false);
    object.spec.strategy = Strategy::Import;
    object.spec.git_url_path = Some("/platform/app".to_string());
    env.cluster.codebases.create(&object).await.unwrap();

    env.reconcile_codebase("app").await.unwrap();

    let folder = env
        .cluster
        .jenkins_folders
        .get(NS, "app-codebase")
        .await
        .unwrap()
        .unwrap();
    let params = folder_params(&folder.spec.job.unwrap().config);
    assert_eq!(
        params["REPOSITORY_PATH"],
        "ssh://edp-ci@gerrit.edp:29418/platform/app"
    );
}

#[tokio::test]
async fn test_existing_folder_is_left_alone() {
    let env = env_with_git_server(false).await;
    env.cluster
        .jenkins_folders
        .create(&jenkins_folder("app", true))
        .await
        .unwrap();
    env.cluster
        .codebases
        .create(&codebase("app", CiTool::Jenkins, false, false))
        .await
        .unwrap();

    env.reconcile_codebase("app").await.unwrap();

    let folder = env
        .cluster
        .jenkins_folders
        .get(NS, "app-codebase")
        .await
        .unwrap()
        .unwrap();
    assert!(folder.spec.job.is_none());
    assert_eq!(env.cluster.jenkins_folders.len(), 1);
    assert!(env.codebase("app").await.unwrap().is_available());
}

#[tokio::test]
async fn test_vcs_project_is_created_when_integration_enabled() {
    let env = env_with_git_server(true).await;
    env.cluster
        .codebases
        .create(&codebase("app", CiTool::Jenkins, false, false))
        .await
        .unwrap();

    env.reconcile_codebase("app").await.unwrap();

    assert_eq!(env.vcs.created(), vec![format!("{VCS_GROUP}/app")]);
    assert!(env
        .cluster
        .jenkins_folders
        .get(NS, "app-codebase")
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn test_existing_vcs_project_is_not_created_again() {
    let env = env_with_git_server(true).await;
    env.vcs.add_project(VCS_GROUP, "app");
    env.cluster
        .codebases
        .create(&codebase("app", CiTool::Jenkins, false, false))
        .await
        .unwrap();

    env.reconcile_codebase("app").await.unwrap();

    assert!(env.vcs.created().is_empty());
    assert!(env.codebase("app").await.unwrap().is_available());
}

#[tokio::test]
async fn test_gitlab_codebase_skips_jenkins_folder() {
    let env = env_with_git_server(false).await;
    env.cluster
        .codebases
        .create(&codebase("app", CiTool::GitlabCi, false, false))
        .await
        .unwrap();

    env.reconcile_codebase("app").await.unwrap();

    assert!(env.cluster.jenkins_folders.is_empty());
    let stored = env.codebase("app").await.unwrap();
    assert!(stored.is_available());
    assert_eq!(
        stored.status.unwrap().lifecycle.action,
        Some(ActionType::PutVcsProject)
    );
}

#[tokio::test]
async fn test_missing_job_provisioning_is_recorded_as_failure() {
    let env = env_with_git_server(false).await;
    let mut object = codebase("app", CiTool::Jenkins, false, false);
    object.spec.job_provisioning = None;
    env.cluster.codebases.create(&object).await.unwrap();

    let err = env.reconcile_codebase("app").await.unwrap_err();
    assert!(err.is_reported());

    let stored = env.codebase("app").await.unwrap();
    assert!(!stored.is_available());
    let status = stored.status.unwrap().lifecycle;
    assert_eq!(status.status, STATUS_FAILED);
    assert_eq!(status.action, Some(ActionType::PutJenkinsFolder));
    assert!(status
        .detailed_message
        .contains("jobProvisioning is not defined in spec"));
    assert!(env.cluster.jenkins_folders.is_empty());
}

#[tokio::test]
async fn test_missing_git_server_is_recorded_as_failure() {
    let env = TestEnv::new();
    env.cluster
        .codebases
        .create(&codebase("app", CiTool::Jenkins, false, false))
        .await
        .unwrap();

    env.reconcile_codebase("app").await.unwrap_err();

    let status = env.codebase("app").await.unwrap().status.unwrap().lifecycle;
    assert!(status
        .detailed_message
        .contains("an error has occurred while getting gerrit Git Server CR"));
}

#[tokio::test]
async fn test_deletion_cleans_secret_and_templates() {
    let env = env_with_git_server(false).await;
    let mut object = codebase("app", CiTool::Jenkins, true, false);
    object.metadata.finalizers = Some(vec![CODEBASE_FINALIZER.to_string()]);
    env.cluster.codebases.create(&object).await.unwrap();
    env.cluster
        .secrets
        .create(&secret("repository-codebase-app-temp", &[("username", "ci")]))
        .await
        .unwrap();

    let templates = env
        .work_path()
        .join(NS)
        .join("app")
        .join("templates")
        .join("app");
    std::fs::create_dir_all(&templates).unwrap();
    std::fs::write(templates.join("Dockerfile"), "FROM scratch\n").unwrap();

    env.cluster.codebases.delete(NS, "app").await.unwrap();
    let action = env.reconcile_codebase("app").await.unwrap();

    assert_eq!(action, Action::await_change());
    assert!(env.codebase("app").await.is_none());
    assert!(env
        .cluster
        .secrets
        .get(NS, "repository-codebase-app-temp")
        .await
        .unwrap()
        .is_none());
    assert!(!templates.exists());
}

#[tokio::test]
async fn test_deletion_without_leftovers_succeeds() {
    let env = TestEnv::new();
    let mut object = codebase("app", CiTool::GitlabCi, true, false);
    object.metadata.finalizers = Some(vec![CODEBASE_FINALIZER.to_string()]);
    env.cluster.codebases.create(&object).await.unwrap();
    env.cluster.codebases.delete(NS, "app").await.unwrap();

    env.reconcile_codebase("app").await.unwrap();

    assert!(env.codebase("app").await.is_none());
}
