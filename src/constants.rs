//! # Constants
//!
//! Shared constants used throughout the operator.
//!
//! These values represent reasonable defaults and can be overridden via
//! configuration or environment variables where applicable.

/// Default HTTP server port for metrics and health probes
pub const DEFAULT_METRICS_PORT: u16 = 8080;

/// Default base directory for git working copies
pub const DEFAULT_WORKING_DIR: &str = "/home/codebase-operator/edp";

/// Requeue delay when a dependency (owning codebase, CI folder) is not available yet (seconds)
pub const DEFAULT_TRANSIENT_REQUEUE_SECS: u64 = 5;

/// Requeue delay for errors outside the handler chains, e.g. API outages (seconds)
pub const DEFAULT_RECONCILIATION_ERROR_REQUEUE_SECS: u64 = 60;

/// Delay between checks for a Jenkins job to appear (milliseconds)
pub const DEFAULT_JOB_WAIT_DELAY_MS: u64 = 1000;

/// Number of existence checks before a release job is considered missing
pub const DEFAULT_RELEASE_JOB_WAIT_ATTEMPTS: u32 = 60;

/// Number of existence checks before a deletion job is considered missing
pub const DEFAULT_DELETION_JOB_WAIT_ATTEMPTS: u32 = 1;

/// Delay before the first status check and between subsequent ones (milliseconds)
pub const DEFAULT_JOB_POLL_DELAY_MS: u64 = 5000;

/// Number of status checks before a queued/running job times out
pub const DEFAULT_JOB_POLL_ATTEMPTS: u32 = 50;

/// Field manager used for every write issued by the operator
pub const FIELD_MANAGER: &str = "codebase-operator";

/// User recorded in status writes made by the operator itself
pub const SYSTEM_USER: &str = "system";

/// Annotation prefix shared with the Jenkins operator
pub const EDP_ANNOTATIONS_PREFIX: &str = "edp.epam.com";

/// Label carrying the owning codebase name on generated objects
pub const CODEBASE_LABEL_KEY: &str = "app.edp.epam.com/codebaseName";

/// Name of the `EDPComponent` describing the docker registry
pub const DOCKER_REGISTRY_COMPONENT: &str = "docker-registry";

/// Key of the private SSH key inside a git server secret
pub const PRIVATE_SSH_KEY_NAME: &str = "id_rsa";
