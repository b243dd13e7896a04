//! # Shared Status Types
//!
//! Lifecycle status fields shared by every reconciled kind, the closed set of
//! reconcile actions and the helpers used to record outcomes.

use crate::constants::SYSTEM_USER;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle value written while a resource waits for its first provisioning step
pub const STATUS_INIT: &str = "init";
/// Lifecycle value written after a successful pass
pub const STATUS_FINISHED: &str = "finished";
/// Lifecycle value written after a failed pass
pub const STATUS_FAILED: &str = "failed";

/// Reconcile step recorded in the `action` status field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    AcceptCodebaseRegistration,
    AcceptCodebaseBranchRegistration,
    #[serde(rename = "put_branch_for_gitlab_ci_codebase")]
    PutBranchInGit,
    PutCodebaseImageStream,
    TriggerReleaseJob,
    #[serde(rename = "trigger_delete_job")]
    TriggerDeletionJob,
    PutJenkinsFolder,
    PutVcsProject,
    CleanData,
    #[serde(rename = "put_cd_stage_deploy")]
    PutCdStageDeploy,
}

impl ActionType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AcceptCodebaseRegistration => "accept_codebase_registration",
            Self::AcceptCodebaseBranchRegistration => "accept_codebase_branch_registration",
            Self::PutBranchInGit => "put_branch_for_gitlab_ci_codebase",
            Self::PutCodebaseImageStream => "put_codebase_image_stream",
            Self::TriggerReleaseJob => "trigger_release_job",
            Self::TriggerDeletionJob => "trigger_delete_job",
            Self::PutJenkinsFolder => "put_jenkins_folder",
            Self::PutVcsProject => "put_vcs_project",
            Self::CleanData => "clean_data",
            Self::PutCdStageDeploy => "put_cd_stage_deploy",
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of the recorded action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ActionResult {
    Success,
    Error,
}

/// Lifecycle fields tracked on every reconciled resource
///
/// Every outcome rewrites the whole block so the last write describes the last
/// attempted action.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LifecycleStatus {
    /// Lifecycle value: init, finished or failed
    #[serde(default)]
    pub status: String,
    /// Last step that ran
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<ActionType>,
    /// Outcome of the last step
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<ActionResult>,
    /// Error text of the last failure, or the reason a pass was postponed
    #[serde(default)]
    pub detailed_message: String,
    /// RFC3339 timestamp of the last status write
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_time_updated: Option<String>,
    #[serde(default)]
    pub username: String,
    /// active, inactive or failed
    #[serde(default)]
    pub value: String,
    /// Consecutive failed passes
    #[serde(default)]
    pub failure_count: u32,
    /// Generation the last successful pass reconciled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
}

impl LifecycleStatus {
    /// Marks a step as accepted but not yet finished.
    pub fn record_intermediate(&mut self, action: ActionType) {
        self.status = STATUS_INIT.to_string();
        self.action = Some(action);
        self.result = Some(ActionResult::Success);
        self.detailed_message.clear();
        self.username = SYSTEM_USER.to_string();
        self.value = "inactive".to_string();
        self.touch();
    }

    pub fn record_failure(&mut self, action: ActionType, message: String) {
        self.status = STATUS_FAILED.to_string();
        self.action = Some(action);
        self.result = Some(ActionResult::Error);
        self.detailed_message = message;
        self.username = SYSTEM_USER.to_string();
        self.value = "failed".to_string();
        self.failure_count = self.failure_count.saturating_add(1);
        self.touch();
    }

    /// Records a postponed pass without marking the resource failed.
    ///
    /// The lifecycle value and result are left as they were.
    pub fn record_pending(&mut self, action: ActionType, message: String) {
        self.action = Some(action);
        if self.result.is_none() {
            self.result = Some(ActionResult::Success);
        }
        self.detailed_message = message;
        self.username = SYSTEM_USER.to_string();
        self.touch();
    }

    pub fn record_success(&mut self, action: ActionType, generation: Option<i64>) {
        self.status = STATUS_FINISHED.to_string();
        self.action = Some(action);
        self.result = Some(ActionResult::Success);
        self.detailed_message.clear();
        self.username = SYSTEM_USER.to_string();
        self.value = "active".to_string();
        self.failure_count = 0;
        if generation.is_some() {
            self.observed_generation = generation;
        }
        self.touch();
    }

    fn touch(&mut self) {
        self.last_time_updated = Some(chrono::Utc::now().to_rfc3339());
    }
}

/// Access to the lifecycle block of a resource
///
/// Kinds without a status subresource return `None` and every recording
/// helper becomes a no-op for them.
pub trait StatusTracking {
    fn lifecycle(&self) -> Option<&LifecycleStatus>;

    fn lifecycle_mut(&mut self) -> Option<&mut LifecycleStatus>;

    fn record_failure(&mut self, action: ActionType, message: String) {
        if let Some(status) = self.lifecycle_mut() {
            status.record_failure(action, message);
        }
    }

    fn record_pending(&mut self, action: ActionType, message: String) {
        if let Some(status) = self.lifecycle_mut() {
            status.record_pending(action, message);
        }
    }

    fn record_success(&mut self, action: ActionType, generation: Option<i64>) {
        if let Some(status) = self.lifecycle_mut() {
            status.record_success(action, generation);
        }
    }

    fn observed_generation(&self) -> Option<i64> {
        self.lifecycle().and_then(|s| s.observed_generation)
    }

    fn last_time_updated(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        self.lifecycle()
            .and_then(|s| s.last_time_updated.as_deref())
            .and_then(|t| chrono::DateTime::parse_from_rfc3339(t).ok())
            .map(|t| t.with_timezone(&chrono::Utc))
    }
}
