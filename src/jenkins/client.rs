//! # Jenkins REST Client
//!
//! [`JenkinsApi`] over the Jenkins JSON API with basic auth.

use super::{JenkinsApi, JenkinsError};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobInfo {
    #[serde(default)]
    color: Option<String>,
    #[serde(default)]
    in_queue: bool,
    #[serde(default)]
    last_build: Option<BuildRef>,
}

#[derive(Debug, Deserialize)]
struct BuildRef {
    number: u64,
}

#[derive(Debug, Deserialize)]
struct BuildInfo {
    #[serde(default)]
    building: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Crumb {
    crumb: String,
    crumb_request_field: String,
}

/// Jenkins client bound to one server and user
#[derive(Debug, Clone)]
pub struct JenkinsClient {
    http: reqwest::Client,
    base_url: String,
    username: String,
    token: String,
}

impl JenkinsClient {
    /// Create a client for `base_url` authenticating as `username` with an API token
    pub fn new(base_url: &str, username: &str, token: &str) -> Result<Self, JenkinsError> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            username: username.to_string(),
            token: token.to_string(),
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `a/job/b` lives under `{base}/job/a/job/b`
    fn job_url(&self, name: &str) -> String {
        format!("{}/job/{}", self.base_url, name.trim_matches('/'))
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
    ) -> Result<Option<T>, JenkinsError> {
        let response = self
            .http
            .get(url)
            .basic_auth(&self.username, Some(&self.token))
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => Ok(Some(response.json().await?)),
            status => Err(JenkinsError::Unexpected {
                status: status.as_u16(),
                url: url.to_string(),
            }),
        }
    }

    async fn job_info(&self, name: &str) -> Result<JobInfo, JenkinsError> {
        let url = format!("{}/api/json", self.job_url(name));
        self.get_json(&url)
            .await?
            .ok_or_else(|| JenkinsError::JobNotFound(name.to_string()))
    }

    /// CSRF crumb, `None` when the server has CSRF protection disabled
    async fn crumb(&self) -> Result<Option<Crumb>, JenkinsError> {
        let url = format!("{}/crumbIssuer/api/json", self.base_url);
        self.get_json(&url).await
    }
}

#[async_trait]
impl JenkinsApi for JenkinsClient {
    async fn job_exists(&self, name: &str) -> Result<bool, JenkinsError> {
        match self.job_info(name).await {
            Ok(_) => Ok(true),
            Err(JenkinsError::JobNotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn build_job(
        &self,
        name: &str,
        params: &HashMap<String, String>,
    ) -> Result<(), JenkinsError> {
        let url = format!("{}/buildWithParameters", self.job_url(name));
        let mut request = self
            .http
            .post(&url)
            .basic_auth(&self.username, Some(&self.token))
            .form(params);
        if let Some(crumb) = self.crumb().await? {
            request = request.header(crumb.crumb_request_field, crumb.crumb);
        }

        let response = request.send().await?;
        let status = response.status();
        debug!(job = %name, status = %status, "Build request sent");

        if status == StatusCode::NOT_FOUND {
            return Err(JenkinsError::JobNotFound(name.to_string()));
        }
        if !(status.is_success() || status.is_redirection()) {
            return Err(JenkinsError::Unexpected {
                status: status.as_u16(),
                url,
            });
        }
        Ok(())
    }

    async fn is_queued(&self, name: &str) -> Result<bool, JenkinsError> {
        Ok(self.job_info(name).await?.in_queue)
    }

    async fn is_running(&self, name: &str) -> Result<bool, JenkinsError> {
        let last_build = self
            .job_info(name)
            .await?
            .last_build
            .ok_or_else(|| JenkinsError::NoBuilds {
                name: name.to_string(),
            })?;

        let url = format!("{}/{}/api/json", self.job_url(name), last_build.number);
        let build: BuildInfo = self
            .get_json(&url)
            .await?
            .ok_or_else(|| JenkinsError::NoBuilds {
                name: name.to_string(),
            })?;
        Ok(build.building)
    }

    async fn job_color(&self, name: &str) -> Result<String, JenkinsError> {
        Ok(self.job_info(name).await?.color.unwrap_or_default())
    }
}
