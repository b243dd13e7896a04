//! # Operator Configuration
//!
//! Operator-level settings loaded from environment variables.

use crate::constants::{
    DEFAULT_DELETION_JOB_WAIT_ATTEMPTS, DEFAULT_JOB_POLL_ATTEMPTS, DEFAULT_JOB_POLL_DELAY_MS,
    DEFAULT_JOB_WAIT_DELAY_MS, DEFAULT_METRICS_PORT, DEFAULT_RECONCILIATION_ERROR_REQUEUE_SECS,
    DEFAULT_RELEASE_JOB_WAIT_ATTEMPTS, DEFAULT_TRANSIENT_REQUEUE_SECS, DEFAULT_WORKING_DIR,
};
use crate::jenkins::{JobPolicy, PollSettings};
use std::path::PathBuf;
use std::time::Duration;

/// Operator-level configuration
///
/// All settings have sensible defaults and can be overridden via environment variables.
/// Environment variables are populated from a ConfigMap using `envFrom` in the deployment.
#[derive(Debug, Clone)]
pub struct OperatorConfig {
    /// Namespace to watch; `None` watches all namespaces
    pub watch_namespace: Option<String>,
    /// Base directory for git working copies
    pub working_dir: PathBuf,
    /// Requeue delay after a transient reconcile error (seconds)
    pub transient_requeue_secs: u64,
    /// Requeue delay after errors outside the handler chains (seconds)
    pub reconciliation_error_requeue_secs: u64,
    /// Delay between Jenkins job existence checks (milliseconds)
    pub job_wait_delay_ms: u64,
    /// Existence checks for release jobs
    pub release_job_wait_attempts: u32,
    /// Existence checks for deletion jobs
    pub deletion_job_wait_attempts: u32,
    /// Initial delay and interval of Jenkins job status polling (milliseconds)
    pub job_poll_delay_ms: u64,
    /// Status checks before a running job times out
    pub job_poll_attempts: u32,
    /// Platform reported to Jenkins provisioning jobs (kubernetes, openshift)
    pub platform_type: String,
    /// HTTP port for metrics and probes
    pub metrics_port: u16,
    /// Global log level (ERROR, WARN, INFO, DEBUG, TRACE)
    pub log_level: String,
    /// Log format (json, text)
    pub log_format: String,
    /// VCS integration used when provisioning codebases
    pub vcs: VcsSettings,
}

/// Settings of the optional VCS integration
#[derive(Debug, Clone, Default)]
pub struct VcsSettings {
    /// Whether new codebases get a project in the VCS group
    pub integration_enabled: bool,
    /// VCS tool discriminator (gitlab, bitbucket)
    pub tool_name: String,
    /// Group URL projects are created in, e.g. `https://gitlab.example.com/edp`
    pub group_name_url: String,
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            watch_namespace: None,
            working_dir: PathBuf::from(DEFAULT_WORKING_DIR),
            transient_requeue_secs: DEFAULT_TRANSIENT_REQUEUE_SECS,
            reconciliation_error_requeue_secs: DEFAULT_RECONCILIATION_ERROR_REQUEUE_SECS,
            job_wait_delay_ms: DEFAULT_JOB_WAIT_DELAY_MS,
            release_job_wait_attempts: DEFAULT_RELEASE_JOB_WAIT_ATTEMPTS,
            deletion_job_wait_attempts: DEFAULT_DELETION_JOB_WAIT_ATTEMPTS,
            job_poll_delay_ms: DEFAULT_JOB_POLL_DELAY_MS,
            job_poll_attempts: DEFAULT_JOB_POLL_ATTEMPTS,
            platform_type: "kubernetes".to_string(),
            metrics_port: DEFAULT_METRICS_PORT,
            log_level: "INFO".to_string(),
            log_format: "json".to_string(),
            vcs: VcsSettings::default(),
        }
    }
}

impl OperatorConfig {
    /// Load configuration from environment variables with defaults
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            watch_namespace: std::env::var("WATCH_NAMESPACE")
                .ok()
                .filter(|ns| !ns.trim().is_empty()),
            working_dir: PathBuf::from(env_var_or_default_str("WORKING_DIR", DEFAULT_WORKING_DIR)),
            transient_requeue_secs: env_var_or_default(
                "TRANSIENT_REQUEUE_SECS",
                DEFAULT_TRANSIENT_REQUEUE_SECS,
            ),
            reconciliation_error_requeue_secs: env_var_or_default(
                "RECONCILIATION_ERROR_REQUEUE_SECS",
                DEFAULT_RECONCILIATION_ERROR_REQUEUE_SECS,
            ),
            job_wait_delay_ms: env_var_or_default("JENKINS_JOB_WAIT_DELAY_MS", DEFAULT_JOB_WAIT_DELAY_MS),
            release_job_wait_attempts: env_var_or_default(
                "JENKINS_RELEASE_JOB_WAIT_ATTEMPTS",
                DEFAULT_RELEASE_JOB_WAIT_ATTEMPTS,
            ),
            deletion_job_wait_attempts: env_var_or_default(
                "JENKINS_DELETION_JOB_WAIT_ATTEMPTS",
                DEFAULT_DELETION_JOB_WAIT_ATTEMPTS,
            ),
            job_poll_delay_ms: env_var_or_default("JENKINS_JOB_POLL_DELAY_MS", DEFAULT_JOB_POLL_DELAY_MS),
            job_poll_attempts: env_var_or_default("JENKINS_JOB_POLL_ATTEMPTS", DEFAULT_JOB_POLL_ATTEMPTS),
            platform_type: env_var_or_default_str("PLATFORM_TYPE", "kubernetes"),
            metrics_port: env_var_or_default("METRICS_PORT", DEFAULT_METRICS_PORT),
            log_level: env_var_or_default_str("LOG_LEVEL", "INFO"),
            log_format: env_var_or_default_str("LOG_FORMAT", "json"),
            vcs: VcsSettings {
                integration_enabled: env_var_or_default_bool("VCS_INTEGRATION_ENABLED", false),
                tool_name: env_var_or_default_str("VCS_TOOL_NAME", ""),
                group_name_url: env_var_or_default_str("VCS_GROUP_NAME_URL", ""),
            },
        }
    }

    /// Get transient requeue duration
    #[must_use]
    pub fn transient_requeue_duration(&self) -> Duration {
        Duration::from_secs(self.transient_requeue_secs)
    }

    /// Get reconciliation error requeue duration
    #[must_use]
    pub fn reconciliation_error_requeue_duration(&self) -> Duration {
        Duration::from_secs(self.reconciliation_error_requeue_secs)
    }

    /// Retry budget for triggering and observing release jobs
    #[must_use]
    pub fn release_job_policy(&self) -> JobPolicy {
        JobPolicy {
            existence: PollSettings::new(
                Duration::from_millis(self.job_wait_delay_ms),
                self.release_job_wait_attempts,
            ),
            status: self.status_poll_settings(),
        }
    }

    /// Retry budget for triggering and observing deletion jobs
    #[must_use]
    pub fn deletion_job_policy(&self) -> JobPolicy {
        JobPolicy {
            existence: PollSettings::new(
                Duration::from_millis(self.job_wait_delay_ms),
                self.deletion_job_wait_attempts,
            ),
            status: self.status_poll_settings(),
        }
    }

    fn status_poll_settings(&self) -> PollSettings {
        PollSettings::new(
            Duration::from_millis(self.job_poll_delay_ms),
            self.job_poll_attempts,
        )
    }
}

/// Read environment variable or return default value
fn env_var_or_default<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Read environment variable as boolean or return default
fn env_var_or_default_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes" | "on"))
        .unwrap_or(default)
}

/// Read environment variable as string or return default
fn env_var_or_default_str(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_job_policies_match_jenkins_conventions() {
        let config = OperatorConfig::default();

        let release = config.release_job_policy();
        assert_eq!(release.existence.attempts, 60);
        assert_eq!(release.existence.delay, Duration::from_secs(1));
        assert_eq!(release.status.attempts, 50);
        assert_eq!(release.status.delay, Duration::from_secs(5));

        let deletion = config.deletion_job_policy();
        assert_eq!(deletion.existence.attempts, 1);
        assert_eq!(deletion.status, release.status);
    }

    #[test]
    fn test_transient_requeue_is_five_seconds_by_default() {
        let config = OperatorConfig::default();
        assert_eq!(config.transient_requeue_duration(), Duration::from_secs(5));
    }
}
