use crate::controller::chain::{Handler, HandlerError};
use crate::controller::context::Services;
use crate::crd::{ActionType, Codebase};
use crate::git::{codebase_templates_dir, remove_dir_if_exists};
use anyhow::Context as _;
use async_trait::async_trait;
use kube::ResourceExt;
use std::sync::Arc;
use tracing::info;

/// Removes the temporary repository secret and the templates checkout
#[derive(Debug)]
pub struct Cleaner {
    services: Arc<Services>,
}

impl Cleaner {
    #[must_use]
    pub fn new(services: Arc<Services>) -> Self {
        Self { services }
    }
}

#[must_use]
pub fn repository_secret_name(codebase: &str) -> String {
    format!("repository-codebase-{codebase}-temp")
}

#[async_trait]
impl Handler<Codebase> for Cleaner {
    fn name(&self) -> &'static str {
        "cleaner"
    }

    fn action(&self) -> ActionType {
        ActionType::CleanData
    }

    async fn serve(&self, codebase: &mut Codebase) -> Result<(), HandlerError> {
        let name = codebase.name_any();
        let namespace = codebase.namespace().unwrap_or_default();

        let secret = repository_secret_name(&name);
        match self.services.stores.secrets.delete(&namespace, &secret).await {
            Ok(()) => info!(name = %secret, "Secret has been deleted"),
            Err(e) if e.is_not_found() => {
                info!(name = %secret, "Secret doesn't exist, skip deleting");
            }
            Err(e) => {
                return Err(anyhow::Error::new(e)
                    .context(format!("unable to delete secret {secret}"))
                    .into())
            }
        }

        let dir = codebase_templates_dir(&self.services.config.working_dir, &namespace, &name);
        remove_dir_if_exists(&dir)
            .await
            .with_context(|| format!("couldn't delete directory {}", dir.display()))?;
        info!(path = %dir.display(), "Directory was cleaned");
        Ok(())
    }
}
