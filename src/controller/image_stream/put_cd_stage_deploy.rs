use crate::controller::chain::{Handler, HandlerError};
use crate::controller::context::Services;
use crate::crd::{ActionType, CDStageDeploy, CDStageDeploySpec, CodebaseImageStream, CodebaseTag, Tag};
use anyhow::{anyhow, Context as _};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use kube::api::ObjectMeta;
use kube::ResourceExt;
use regex::Regex;
use std::sync::Arc;
use tracing::info;

/// Layout of `Tag::created`
const TAG_DATE_LAYOUT: &str = "%Y-%m-%dT%H:%M:%S";

/// Requests deployment of the newest tag into every `pipeline/stage` labelled on the stream
#[derive(Debug)]
pub struct PutCdStageDeploy {
    services: Arc<Services>,
}

impl PutCdStageDeploy {
    #[must_use]
    pub fn new(services: Arc<Services>) -> Self {
        Self { services }
    }
}

/// `{pipeline}-{stage}-{codebase}`
#[must_use]
pub fn stage_deploy_name(label: &str, codebase: &str) -> String {
    format!("{}-{codebase}", label.replace('/', "-"))
}

/// Tag with the newest parseable `created` time; unparseable tags are ignored
#[must_use]
pub fn latest_tag(tags: &[Tag]) -> Option<&Tag> {
    let mut latest: Option<(NaiveDateTime, &Tag)> = None;
    for tag in tags {
        let Ok(created) = NaiveDateTime::parse_from_str(&tag.created, TAG_DATE_LAYOUT) else {
            continue;
        };
        match latest {
            Some((time, _)) if created <= time => {}
            _ => latest = Some((created, tag)),
        }
    }
    latest.map(|(_, tag)| tag).filter(|tag| !tag.name.is_empty())
}

/// Check every label of the stream and report all problems at once
pub fn validate_labels<'a>(
    stream: &CodebaseImageStream,
    labels: impl IntoIterator<Item = &'a String>,
) -> anyhow::Result<()> {
    let label_regex = Regex::new(r"^[-A-Za-z0-9_.]+/[-A-Za-z0-9_.]+$")
        .map_err(|e| anyhow!("Failed to compile regex: {e}"))?;

    let mut errors = Vec::new();
    if stream.spec.codebase.is_empty() {
        errors.push("codebase is not defined in spec".to_string());
    }
    if stream.spec.tags.is_empty() {
        errors.push("tags are not defined in spec".to_string());
    }
    for label in labels {
        if !label_regex.is_match(label) {
            errors.push(format!(
                "Label must be in format cd-pipeline-name/stage-name, got {label}"
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(anyhow!(errors.join("; ")))
    }
}

impl PutCdStageDeploy {
    async fn put_stage_deploy(
        &self,
        label: &str,
        namespace: &str,
        stream: &CodebaseImageStream,
    ) -> Result<(), HandlerError> {
        let store = &self.services.stores.stage_deploys;
        let codebase = &stream.spec.codebase;
        let name = stage_deploy_name(label, codebase);

        if store
            .get(namespace, &name)
            .await
            .with_context(|| format!("couldn't get {name} cd stage deploy"))?
            .is_some()
        {
            info!(name = %name, "CDStageDeploy already exists, skip creating");
            return Err(HandlerError::NotYetProcessed(format!(
                "{name} has not been processed for previous version of application yet"
            )));
        }

        let tag = latest_tag(&stream.spec.tags)
            .ok_or_else(|| anyhow!("There are no valid tags"))
            .with_context(|| format!("couldn't construct command to create {name} cd stage deploy"))?;
        let (pipeline, stage) = label
            .split_once('/')
            .ok_or_else(|| anyhow!("Label must be in format cd-pipeline-name/stage-name"))?;

        let deploy = CDStageDeploy {
            metadata: ObjectMeta {
                name: Some(name.clone()),
                namespace: Some(namespace.to_string()),
                ..ObjectMeta::default()
            },
            spec: CDStageDeploySpec {
                pipeline: pipeline.to_string(),
                stage: stage.to_string(),
                tag: CodebaseTag {
                    codebase: codebase.clone(),
                    tag: tag.name.clone(),
                },
            },
        };
        store
            .create(&deploy)
            .await
            .with_context(|| format!("couldn't create {name} cd stage deploy"))?;
        info!(name = %name, tag = %tag.name, "CDStageDeploy has been created");
        Ok(())
    }
}

#[async_trait]
impl Handler<CodebaseImageStream> for PutCdStageDeploy {
    fn name(&self) -> &'static str {
        "put-cd-stage-deploy"
    }

    fn action(&self) -> ActionType {
        ActionType::PutCdStageDeploy
    }

    async fn serve(&self, stream: &mut CodebaseImageStream) -> Result<(), HandlerError> {
        let stream_name = stream.name_any();
        let labels: Vec<String> = stream.labels().keys().cloned().collect();
        if labels.is_empty() {
            info!(name = %stream_name, "Codebase image stream doesn't contain env labels, skip CDStageDeploy creating");
            return Ok(());
        }

        validate_labels(stream, &labels)
            .with_context(|| format!("couldn't handle {stream_name} codebase image stream"))?;

        let namespace = stream.namespace().unwrap_or_default();
        for label in &labels {
            match self.put_stage_deploy(label, &namespace, stream).await {
                Ok(()) => {}
                Err(HandlerError::Failed(e)) => {
                    return Err(e
                        .context(format!("couldn't handle {stream_name} codebase image stream"))
                        .into())
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}
