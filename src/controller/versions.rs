//! # Version History
//!
//! Branches under edp versioning keep every version they were released under.
//! A version is appended only when it is not in the history yet, and
//! appending resets the build counters of the branch.

use crate::cluster::ObjectStore;
use crate::controller::error::StatusError;
use crate::controller::status::update_status;
use crate::crd::{CodebaseBranch, CodebaseBranchStatus};
use tracing::info;

/// Exact match of `version` in `history`
#[must_use]
pub fn search_version(history: &[String], version: &str) -> bool {
    history.iter().any(|v| v == version)
}

/// Whether the branch declares a version that is missing from its history
#[must_use]
pub fn has_new_version(branch: &CodebaseBranch) -> bool {
    let Some(version) = branch.spec.version.as_deref() else {
        return false;
    };
    let history = branch
        .status
        .as_ref()
        .map_or(&[][..], |s| s.version_history.as_slice());
    !search_version(history, version)
}

/// Append the declared version and reset the build counters in memory.
///
/// Returns whether anything changed.
pub fn append_version(branch: &mut CodebaseBranch) -> bool {
    if !has_new_version(branch) {
        return false;
    }
    let Some(version) = branch.spec.version.clone() else {
        return false;
    };

    let status = branch
        .status
        .get_or_insert_with(CodebaseBranchStatus::default);
    if status.build.is_some() {
        status.build = Some("0".to_string());
    }
    if status.last_successful_build.is_some() {
        status.last_successful_build = None;
    }
    status.version_history.push(version);
    true
}

/// Record a new branch version and persist the status right away.
///
/// No-op when the branch declares no version or the version is known.
pub async fn process_new_version(
    store: &dyn ObjectStore<CodebaseBranch>,
    branch: &mut CodebaseBranch,
) -> Result<(), StatusError> {
    if !append_version(branch) {
        return Ok(());
    }
    info!(
        branch = %branch.metadata.name.as_deref().unwrap_or_default(),
        version = %branch.spec.version.as_deref().unwrap_or_default(),
        "New version has been added to history"
    );
    update_status(store, branch).await
}
