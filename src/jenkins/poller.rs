//! # Job Trigger Poller
//!
//! Starts a named Jenkins job and follows it to a terminal color under a
//! bounded retry budget:
//!
//! `NotStarted -> WaitingToExist -> Triggered -> Polling -> {Succeeded | Failed | TimedOut}`
//!
//! Delays and attempt counts come from [`JobPolicy`] so tests can run with
//! zero delay. Timeouts are attempt based, there is no wall-clock deadline.

use super::{JenkinsApi, JenkinsError, NOT_BUILT_COLOR, SUCCESS_COLOR};
use crate::observability::metrics;
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Fixed delay and attempt budget of one polling loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub delay: Duration,
    pub attempts: u32,
}

impl PollSettings {
    #[must_use]
    pub fn new(delay: Duration, attempts: u32) -> Self {
        Self { delay, attempts }
    }

    /// No delay between attempts
    #[must_use]
    pub fn immediate(attempts: u32) -> Self {
        Self::new(Duration::ZERO, attempts)
    }
}

/// Budgets for waiting on a job to appear and on its build to finish
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobPolicy {
    pub existence: PollSettings,
    pub status: PollSettings,
}

/// Phase of a trigger-and-poll run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    NotStarted,
    WaitingToExist,
    Triggered,
    Polling,
    Succeeded,
    Failed,
    TimedOut,
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NotStarted => "NotStarted",
            Self::WaitingToExist => "WaitingToExist",
            Self::Triggered => "Triggered",
            Self::Polling => "Polling",
            Self::Succeeded => "Succeeded",
            Self::Failed => "Failed",
            Self::TimedOut => "TimedOut",
        };
        f.write_str(name)
    }
}

/// Terminal result of [`JobTriggerPoller::trigger`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Succeeded,
    Failed { color: String },
    /// The job never appeared within the existence budget
    NotFound,
}

/// Triggers one job and polls it to completion
pub struct JobTriggerPoller<'a> {
    api: &'a dyn JenkinsApi,
    policy: JobPolicy,
    state: JobState,
}

impl fmt::Debug for JobTriggerPoller<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobTriggerPoller")
            .field("policy", &self.policy)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl<'a> JobTriggerPoller<'a> {
    #[must_use]
    pub fn new(api: &'a dyn JenkinsApi, policy: JobPolicy) -> Self {
        Self {
            api,
            policy,
            state: JobState::NotStarted,
        }
    }

    #[must_use]
    pub fn state(&self) -> JobState {
        self.state
    }

    /// Wait for the job, build it with `params` and poll it to a terminal color.
    ///
    /// Timeouts while polling are returned as [`JenkinsError::Timeout`]; a
    /// missing job is reported as [`JobOutcome::NotFound`] and left to the
    /// caller to interpret.
    pub async fn trigger(
        &mut self,
        name: &str,
        params: &HashMap<String, String>,
    ) -> Result<JobOutcome, JenkinsError> {
        if !self.wait_for_job(name).await {
            info!(job = %name, "Job is not present in Jenkins");
            metrics::record_job_outcome("not_found");
            return Ok(JobOutcome::NotFound);
        }

        self.api.build_job(name, params).await?;
        self.transition(JobState::Triggered, name);
        metrics::increment_jobs_triggered();
        info!(job = %name, "Jenkins job has been triggered");

        let color = match self.job_status(name).await {
            Ok(color) => color,
            Err(e) => {
                if matches!(e, JenkinsError::Timeout { .. }) {
                    self.transition(JobState::TimedOut, name);
                    metrics::record_job_outcome("timed_out");
                }
                return Err(e);
            }
        };

        if color == SUCCESS_COLOR {
            self.transition(JobState::Succeeded, name);
            metrics::record_job_outcome("succeeded");
            Ok(JobOutcome::Succeeded)
        } else {
            self.transition(JobState::Failed, name);
            metrics::record_job_outcome("failed");
            Ok(JobOutcome::Failed { color })
        }
    }

    /// Check for the job up to the existence budget.
    ///
    /// Lookup errors count as "not there yet".
    pub async fn wait_for_job(&mut self, name: &str) -> bool {
        self.transition(JobState::WaitingToExist, name);
        let settings = self.policy.existence;

        for attempt in 0..settings.attempts {
            match self.api.job_exists(name).await {
                Ok(true) => return true,
                Ok(false) => {}
                Err(e) => debug!(job = %name, error = %e, "Job lookup failed"),
            }
            info!(
                job = %name,
                delay_ms = settings.delay.as_millis(),
                attempts_left = settings.attempts - attempt,
                "Job doesn't exist yet"
            );
            tokio::time::sleep(settings.delay).await;
        }
        false
    }

    /// Poll a triggered job until it is neither queued nor running and return its color.
    pub async fn job_status(&mut self, name: &str) -> Result<String, JenkinsError> {
        self.transition(JobState::Polling, name);
        let settings = self.policy.status;
        tokio::time::sleep(settings.delay).await;

        for attempt in 0..settings.attempts {
            let queued = self.api.is_queued(name).await;
            let running = self.api.is_running(name).await;

            if queued.is_err() || running.is_err() {
                let color = self.api.job_color(name).await?;
                if color == NOT_BUILT_COLOR {
                    info!(
                        job = %name,
                        attempts_left = settings.attempts - attempt,
                        "Job didn't start yet"
                    );
                    tokio::time::sleep(settings.delay).await;
                    continue;
                }
            }

            let busy = matches!(queued, Ok(true)) || matches!(running, Ok(true));
            if busy {
                info!(
                    job = %name,
                    attempts_left = settings.attempts - attempt,
                    "Job is running"
                );
                tokio::time::sleep(settings.delay).await;
            } else {
                return self.api.job_color(name).await;
            }
        }

        warn!(job = %name, attempts = settings.attempts, "Job has not been finished in time");
        Err(JenkinsError::Timeout {
            name: name.to_string(),
            attempts: settings.attempts,
        })
    }

    fn transition(&mut self, next: JobState, name: &str) {
        debug!(job = %name, from = %self.state, to = %next, "Job state transition");
        self.state = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jenkins::MockJenkinsApi;
    use mockall::predicate::eq;
    use mockall::Sequence;

    fn policy(existence: u32, status: u32) -> JobPolicy {
        JobPolicy {
            existence: PollSettings::immediate(existence),
            status: PollSettings::immediate(status),
        }
    }

    fn params() -> HashMap<String, String> {
        HashMap::from([("RELEASE_NAME".to_string(), "release-1.0".to_string())])
    }

    #[tokio::test]
    async fn test_missing_job_is_not_found_without_building() {
        let mut api = MockJenkinsApi::new();
        api.expect_job_exists().times(3).returning(|_| Ok(false));
        api.expect_build_job().never();

        let mut poller = JobTriggerPoller::new(&api, policy(3, 5));
        let outcome = poller.trigger("app/job/Create-release-app", &params()).await.unwrap();

        assert_eq!(outcome, JobOutcome::NotFound);
        assert_eq!(poller.state(), JobState::WaitingToExist);
    }

    #[tokio::test]
    async fn test_job_appearing_late_is_built() {
        let mut api = MockJenkinsApi::new();
        let mut seq = Sequence::new();
        api.expect_job_exists()
            .times(2)
            .in_sequence(&mut seq)
            .returning(|_| Ok(false));
        api.expect_job_exists()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(true));
        api.expect_build_job()
            .with(eq("app/job/Create-release-app"), eq(params()))
            .times(1)
            .returning(|_, _| Ok(()));
        api.expect_is_queued().returning(|_| Ok(false));
        api.expect_is_running().returning(|_| Ok(false));
        api.expect_job_color().returning(|_| Ok("blue".to_string()));

        let mut poller = JobTriggerPoller::new(&api, policy(5, 5));
        let outcome = poller.trigger("app/job/Create-release-app", &params()).await.unwrap();

        assert_eq!(outcome, JobOutcome::Succeeded);
        assert_eq!(poller.state(), JobState::Succeeded);
    }

    #[tokio::test]
    async fn test_non_success_color_is_failed_outcome() {
        let mut api = MockJenkinsApi::new();
        api.expect_job_exists().returning(|_| Ok(true));
        api.expect_build_job().returning(|_, _| Ok(()));
        api.expect_is_queued().returning(|_| Ok(false));
        api.expect_is_running().returning(|_| Ok(false));
        api.expect_job_color().returning(|_| Ok("red".to_string()));

        let mut poller = JobTriggerPoller::new(&api, policy(1, 5));
        let outcome = poller.trigger("app/job/Create-release-app", &params()).await.unwrap();

        assert_eq!(
            outcome,
            JobOutcome::Failed {
                color: "red".to_string()
            }
        );
        assert_eq!(poller.state(), JobState::Failed);
    }

    #[tokio::test]
    async fn test_running_job_exhausting_budget_times_out() {
        let mut api = MockJenkinsApi::new();
        api.expect_is_queued().times(4).returning(|_| Ok(false));
        api.expect_is_running().times(4).returning(|_| Ok(true));
        // A still-running job must never be reported with its (stale) color
        api.expect_job_color().never();

        let mut poller = JobTriggerPoller::new(&api, policy(1, 4));
        let err = poller.job_status("app/job/Create-release-app").await.unwrap_err();

        assert!(matches!(err, JenkinsError::Timeout { attempts: 4, .. }));
    }

    #[tokio::test]
    async fn test_queued_then_finished_returns_color() {
        let mut api = MockJenkinsApi::new();
        let mut seq = Sequence::new();
        api.expect_is_queued()
            .times(2)
            .in_sequence(&mut seq)
            .returning(|_| Ok(true));
        api.expect_is_queued()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(false));
        api.expect_is_running().returning(|_| Ok(false));
        api.expect_job_color().times(1).returning(|_| Ok("blue".to_string()));

        let mut poller = JobTriggerPoller::new(&api, policy(1, 5));
        let color = poller.job_status("app/job/Create-release-app").await.unwrap();

        assert_eq!(color, "blue");
    }

    #[tokio::test]
    async fn test_not_built_job_consumes_attempts() {
        let mut api = MockJenkinsApi::new();
        api.expect_is_queued().returning(|_| Ok(false));
        api.expect_is_running().returning(|name| {
            Err(JenkinsError::NoBuilds {
                name: name.to_string(),
            })
        });
        api.expect_job_color()
            .times(3)
            .returning(|_| Ok("notbuilt".to_string()));

        let mut poller = JobTriggerPoller::new(&api, policy(1, 3));
        let err = poller.job_status("app/job/Delete-release-app").await.unwrap_err();

        assert!(matches!(err, JenkinsError::Timeout { attempts: 3, .. }));
    }

    #[tokio::test]
    async fn test_lookup_error_with_terminal_color_returns_color() {
        let mut api = MockJenkinsApi::new();
        api.expect_is_queued()
            .returning(|name| Err(JenkinsError::JobNotFound(name.to_string())));
        api.expect_is_running().returning(|_| Ok(false));
        api.expect_job_color().returning(|_| Ok("red".to_string()));

        let mut poller = JobTriggerPoller::new(&api, policy(1, 3));
        let color = poller.job_status("app/job/Delete-release-app").await.unwrap();

        assert_eq!(color, "red");
    }
}
