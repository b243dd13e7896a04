//! # Reconciler Errors

use crate::cluster::StoreError;
use crate::controller::chain::ChainError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconcilerError {
    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error(transparent)]
    Status(#[from] StatusError),

    #[error("Cluster store error: {0}")]
    Store(#[from] StoreError),

    #[error("Failed to remove working directory {}: {source}", path.display())]
    WorkDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ReconcilerError {
    /// Failures already reported on the resource status; these wait for the next change
    #[must_use]
    pub fn is_reported(&self) -> bool {
        matches!(self, Self::Chain(ChainError::Failed { .. }))
    }

    /// Short label used for metrics
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Chain(ChainError::Failed { .. }) => "handler",
            Self::Chain(_) => "transient",
            Self::Status(_) => "status",
            Self::Store(_) => "store",
            Self::WorkDir { .. } => "workdir",
        }
    }
}

/// Both the status-only write and the full-object fallback failed
#[derive(Debug, Error)]
#[error("couldn't update status of {kind} {name}: {status_error}; full update also failed: {update_error}")]
pub struct StatusError {
    pub kind: String,
    pub name: String,
    #[source]
    pub status_error: StoreError,
    pub update_error: StoreError,
}

impl StatusError {
    /// The object disappeared between the two writes
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.status_error.is_not_found() && self.update_error.is_not_found()
    }
}
