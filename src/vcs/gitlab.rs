//! # GitLab
//!
//! GitLab API v4 adapter authenticating with the OAuth password grant.

use super::{push_segment, Vcs, VcsError};
use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use tokio::sync::OnceCell;
use tracing::info;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct Group {
    id: u64,
}

#[derive(Debug, Deserialize)]
struct Project {
    id: u64,
    #[serde(default)]
    ssh_url_to_repo: String,
}

/// GitLab client for one user
#[derive(Debug)]
pub struct GitLab {
    http: reqwest::Client,
    host: Url,
    username: String,
    password: String,
    token: OnceCell<String>,
}

impl GitLab {
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
            token: OnceCell::new(),
        })
    }

    async fn token(&self) -> Result<&str, VcsError> {
        let token = self
            .token
            .get_or_try_init(|| async {
                let mut url = self.host.clone();
                url.set_path("/oauth/token");
                let response = self
                    .http
                    .post(url.clone())
                    .form(&[
                        ("grant_type", "password"),
                        ("username", self.username.as_str()),
                        ("password", self.password.as_str()),
                    ])
                    .send()
                    .await?;
                if !response.status().is_success() {
                    return Err(VcsError::Unexpected {
                        status: response.status().as_u16(),
                        url: url.to_string(),
                    });
                }
                let body: TokenResponse = response.json().await?;
                Ok::<String, VcsError>(body.access_token)
            })
            .await?;
        Ok(token.as_str())
    }

    /// `{host}/api/v4/{collection}/{url-encoded id}`
    fn api_url(&self, collection: &str, id: &str) -> Url {
        let mut url = self.host.clone();
        url.set_path("/api/v4");
        push_segment(&mut url, collection);
        push_segment(&mut url, id);
        url
    }

    async fn get_project(&self, group_path: &str, project: &str) -> Result<Option<Project>, VcsError> {
        let url = self.api_url("projects", &format!("{group_path}/{project}"));
        let response = self
            .http
            .get(url.clone())
            .bearer_auth(self.token().await?)
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
impl Vcs for GitLab {
    async fn project_exists(&self, group_path: &str, project: &str) -> Result<bool, VcsError> {
        Ok(self.get_project(group_path, project).await?.is_some())
    }

    async fn create_project(&self, group_path: &str, project: &str) -> Result<String, VcsError> {
        let token = self.token().await?;

        let group_url = self.api_url("groups", group_path);
        let response = self.http.get(group_url.clone()).bearer_auth(token).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(VcsError::GroupNotFound(group_path.to_string()));
        }
        if !response.status().is_success() {
            return Err(VcsError::Unexpected {
                status: response.status().as_u16(),
                url: group_url.to_string(),
            });
        }
        let group: Group = response.json().await?;

        let mut url = self.host.clone();
        url.set_path("/api/v4/projects");
        let response = self
            .http
            .post(url.clone())
            .bearer_auth(token)
            .json(&serde_json::json!({ "name": project, "namespace_id": group.id }))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(VcsError::Unexpected {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }
        let created: Project = response.json().await?;
        info!(project = %project, group = %group_path, "GitLab project has been created");
        Ok(created.id.to_string())
    }

    async fn repository_ssh_url(
        &self,
        group_path: &str,
        project: &str,
    ) -> Result<String, VcsError> {
        self.get_project(group_path, project)
            .await?
            .map(|p| p.ssh_url_to_repo)
            .ok_or_else(|| VcsError::ProjectNotFound(format!("{group_path}/{project}")))
    }
}
