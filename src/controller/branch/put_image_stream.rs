use super::owning_codebase;
use crate::constants::DOCKER_REGISTRY_COMPONENT;
use crate::controller::chain::{Handler, HandlerError};
use crate::controller::context::Services;
use crate::crd::{ActionType, CodebaseBranch, CodebaseImageStream, CodebaseImageStreamSpec};
use anyhow::{anyhow, Context as _};
use async_trait::async_trait;
use kube::api::ObjectMeta;
use kube::ResourceExt;
use std::sync::Arc;
use tracing::info;

/// Registers the image stream a branch publishes its images to
#[derive(Debug)]
pub struct PutCodebaseImageStream {
    services: Arc<Services>,
}

impl PutCodebaseImageStream {
    #[must_use]
    pub fn new(services: Arc<Services>) -> Self {
        Self { services }
    }
}

/// `{codebase}-{branch}` with slashes replaced, `edp` infix for edp versioning
#[must_use]
pub fn image_stream_name(codebase: &str, branch: &str, edp_versioning: bool) -> String {
    let branch = branch.replace('/', "-");
    if edp_versioning {
        format!("{codebase}-edp-{branch}")
    } else {
        format!("{codebase}-{branch}")
    }
}

#[async_trait]
impl Handler<CodebaseBranch> for PutCodebaseImageStream {
    fn name(&self) -> &'static str {
        "put-codebase-image-stream"
    }

    fn action(&self) -> ActionType {
        ActionType::PutCodebaseImageStream
    }

    async fn serve(&self, branch: &mut CodebaseBranch) -> Result<(), HandlerError> {
        let namespace = branch.namespace().unwrap_or_default();
        let stores = &self.services.stores;

        let codebase = owning_codebase(&self.services, branch)
            .await
            .with_context(|| format!("couldn't get {} codebase", branch.spec.codebase_name))?
            .ok_or_else(|| anyhow!("{} codebase is not found", branch.spec.codebase_name))?;

        let registry = stores
            .components
            .fetch(&namespace, DOCKER_REGISTRY_COMPONENT)
            .await
            .with_context(|| format!("couldn't get {DOCKER_REGISTRY_COMPONENT} EDP component"))?;

        let name = image_stream_name(
            &codebase.name_any(),
            &branch.spec.branch_name,
            codebase.uses_edp_versioning(),
        );
        let stream = CodebaseImageStream {
            metadata: ObjectMeta {
                name: Some(name.clone()),
                namespace: Some(namespace),
                ..ObjectMeta::default()
            },
            spec: CodebaseImageStreamSpec {
                codebase: codebase.name_any(),
                image_name: format!("{}/{name}", registry.spec.url),
                tags: Vec::new(),
            },
        };

        match stores.image_streams.create(&stream).await {
            Ok(_) => info!(name = %name, "Codebase image stream has been created"),
            Err(e) if e.is_already_exists() => {
                info!(name = %name, "Codebase image stream already exists");
            }
            Err(e) => {
                return Err(anyhow::Error::new(e)
                    .context(format!("couldn't create image stream {name}"))
                    .into())
            }
        }
        Ok(())
    }
}
