//! # Bitbucket Server
//!
//! Bitbucket Server REST API 1.0 adapter with basic auth. The group path is
//! the Bitbucket project key, codebase projects are repositories in it.

use super::{push_segment, Vcs, VcsError};
use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use tracing::info;

#[derive(Debug, Deserialize)]
struct Repository {
    #[serde(default)]
    slug: String,
    #[serde(default)]
    links: Links,
}

#[derive(Debug, Default, Deserialize)]
struct Links {
    #[serde(default)]
    clone: Vec<CloneLink>,
}

#[derive(Debug, Deserialize)]
struct CloneLink {
    href: String,
    name: String,
}

/// Bitbucket Server client for one user
#[derive(Debug)]
pub struct BitBucket {
    http: reqwest::Client,
    host: Url,
    username: String,
    password: String,
}

impl BitBucket {
    pub fn new(host_url: &str, username: &str, password: &str) -> Result<Self, VcsError> {
        let host = Url::parse(host_url).map_err(|e| VcsError::InvalidGroupUrl {
            url: host_url.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            http: reqwest::Client::builder().build()?,
            host,
            username: username.to_string(),
            password: password.to_string(),
        })
    }

    fn repos_url(&self, project_key: &str) -> Url {
        let mut url = self.host.clone();
        url.set_path("/rest/api/1.0/projects");
        push_segment(&mut url, project_key);
        push_segment(&mut url, "repos");
        url
    }

    async fn get_repository(
        &self,
        project_key: &str,
        repository: &str,
    ) -> Result<Option<Repository>, VcsError> {
        let mut url = self.repos_url(project_key);
        push_segment(&mut url, repository);
        let response = self
            .http
            .get(url.clone())
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => Ok(Some(response.json().await?)),
            status => Err(VcsError::Unexpected {
                status: status.as_u16(),
                url: url.to_string(),
            }),
        }
    }
}

#[async_trait]
impl Vcs for BitBucket {
    async fn project_exists(&self, group_path: &str, project: &str) -> Result<bool, VcsError> {
        Ok(self.get_repository(group_path, project).await?.is_some())
    }

    async fn create_project(&self, group_path: &str, project: &str) -> Result<String, VcsError> {
        let url = self.repos_url(group_path);
        let response = self
            .http
            .post(url.clone())
            .basic_auth(&self.username, Some(&self.password))
            .json(&serde_json::json!({ "name": project, "scmId": "git" }))
            .send()
            .await?;
        match response.status() {
            StatusCode::NOT_FOUND => Err(VcsError::GroupNotFound(group_path.to_string())),
            status if status.is_success() => {
                let created: Repository = response.json().await?;
                info!(project = %project, group = %group_path, "Bitbucket repository has been created");
                Ok(created.slug)
            }
            status => Err(VcsError::Unexpected {
                status: status.as_u16(),
                url: url.to_string(),
            }),
        }
    }

    async fn repository_ssh_url(
        &self,
        group_path: &str,
        project: &str,
    ) -> Result<String, VcsError> {
        let repository = self
            .get_repository(group_path, project)
            .await?
            .ok_or_else(|| VcsError::ProjectNotFound(format!("{group_path}/{project}")))?;
        repository
            .links
            .clone
            .into_iter()
            .find(|link| link.name == "ssh")
            .map(|link| link.href)
            .ok_or_else(|| VcsError::ProjectNotFound(format!("{group_path}/{project} (ssh link)")))
    }
}
