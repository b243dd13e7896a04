use crate::controller::chain::{Handler, HandlerError};
use crate::crd::{ActionType, CodebaseBranch};
use async_trait::async_trait;
use kube::ResourceExt;
use tracing::info;

/// Placeholder step of a chain with nothing to do
#[derive(Debug)]
pub struct Empty {
    message: &'static str,
    return_error: bool,
}

impl Empty {
    #[must_use]
    pub fn new(message: &'static str, return_error: bool) -> Self {
        Self {
            message,
            return_error,
        }
    }
}

#[async_trait]
impl Handler<CodebaseBranch> for Empty {
    fn name(&self) -> &'static str {
        "empty"
    }

    fn action(&self) -> ActionType {
        ActionType::TriggerDeletionJob
    }

    async fn serve(&self, branch: &mut CodebaseBranch) -> Result<(), HandlerError> {
        if self.return_error {
            return Err(HandlerError::failed(self.message));
        }
        info!(branch = %branch.name_any(), "{}", self.message);
        Ok(())
    }
}
