//! # Jenkins
//!
//! CI job server access used by the branch chains.
//!
//! - `client.rs` - [`JenkinsClient`], the JSON REST implementation of [`JenkinsApi`]
//! - `poller.rs` - [`JobTriggerPoller`], bounded trigger-and-poll of a job
//! - `connect.rs` - resolves the Jenkins instance and credentials of a namespace

mod client;
mod connect;
mod poller;

pub use client::JenkinsClient;
pub use connect::{jenkins_url, ClusterJenkinsConnector, JenkinsConnector};
pub use poller::{JobOutcome, JobPolicy, JobState, JobTriggerPoller, PollSettings};

use crate::cluster::StoreError;
use async_trait::async_trait;
use std::collections::HashMap;

/// Color Jenkins reports for a job whose last build succeeded
pub const SUCCESS_COLOR: &str = "blue";
/// Color Jenkins reports for a job that has never been built
pub const NOT_BUILT_COLOR: &str = "notbuilt";

/// Error type for Jenkins operations
#[derive(Debug, thiserror::Error)]
pub enum JenkinsError {
    #[error("Job {0} not found")]
    JobNotFound(String),

    #[error("Job {name} has no builds")]
    NoBuilds { name: String },

    #[error("Job {name} finished with status {color}")]
    JobFailed { name: String, color: String },

    #[error("Job {name} has not been finished after {attempts} attempts")]
    Timeout { name: String, attempts: u32 },

    #[error("Jenkins request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Jenkins returned HTTP {status} for {url}")]
    Unexpected { status: u16, url: String },

    #[error("Jenkins is not configured: {0}")]
    Configuration(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Operations the chains need from a Jenkins server
///
/// Job names are folder paths in Jenkins notation, e.g. `app/job/Create-release-app`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait JenkinsApi: Send + Sync {
    async fn job_exists(&self, name: &str) -> Result<bool, JenkinsError>;

    /// Queue a parameterized build
    async fn build_job(
        &self,
        name: &str,
        params: &HashMap<String, String>,
    ) -> Result<(), JenkinsError>;

    async fn is_queued(&self, name: &str) -> Result<bool, JenkinsError>;

    /// Whether the last build is still running; errors when there is no build yet
    async fn is_running(&self, name: &str) -> Result<bool, JenkinsError>;

    async fn job_color(&self, name: &str) -> Result<String, JenkinsError>;
}

/// Release management jobs every codebase folder carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    Release,
    Deletion,
}

impl JobKind {
    #[must_use]
    pub fn job_name(self, codebase: &str) -> String {
        match self {
            Self::Release => format!("{codebase}/job/Create-release-{codebase}"),
            Self::Deletion => format!("{codebase}/job/Delete-release-{codebase}"),
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Release => "release",
            Self::Deletion => "deletion",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_names_follow_folder_convention() {
        assert_eq!(JobKind::Release.job_name("app"), "app/job/Create-release-app");
        assert_eq!(JobKind::Deletion.job_name("app"), "app/job/Delete-release-app");
    }
}
