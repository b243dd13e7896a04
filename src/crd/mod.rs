//! # Custom Resource Definitions
//!
//! CRD types for the Codebase Operator.
//!
//! ## Module Structure
//!
//! - `common.rs` - Lifecycle status, reconcile actions and outcome recording
//! - `codebase.rs` - Codebase and its CI/versioning settings
//! - `branch.rs` - CodebaseBranch with version history and build counters
//! - `image_stream.rs` - CodebaseImageStream and its tags
//! - `stage_deploy.rs` - CDStageDeploy deploy triggers
//! - `external.rs` - JenkinsFolder, Jenkins, GitServer and EDPComponent

mod branch;
mod codebase;
mod common;
mod external;
mod image_stream;
mod stage_deploy;

pub use branch::{CodebaseBranch, CodebaseBranchSpec, CodebaseBranchStatus};
pub use codebase::{
    CiTool, Codebase, CodebaseSpec, CodebaseStatus, Repository, Strategy, Versioning,
    VersioningType,
};
pub use common::{
    ActionResult, ActionType, LifecycleStatus, StatusTracking, STATUS_FAILED, STATUS_FINISHED,
    STATUS_INIT,
};
pub use external::{
    EDPComponent, EDPComponentSpec, GitServer, GitServerSpec, Jenkins, JenkinsFolder,
    JenkinsFolderSpec, JenkinsFolderStatus, JenkinsJob, JenkinsSpec,
};
pub use image_stream::{CodebaseImageStream, CodebaseImageStreamSpec, Tag};
pub use stage_deploy::{CDStageDeploy, CDStageDeploySpec, CodebaseTag};
