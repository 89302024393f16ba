//! `reqwest` implementation of [`ContentWriter`] against the GitHub REST API.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use url::Url;

use super::{ContentWriter, CreateFileRequest, GithubError, RepositoryInfo, Result, WriteOutcome};
use crate::config::GithubApiConfig;
use crate::types::{GithubToken, abbrev_sha};

const ACCEPT: &str = "application/vnd.github+json";
const API_VERSION: &str = "2022-11-28";

/// GitHub API client. Cheap to clone; the connection pool is shared.
#[derive(Debug, Clone)]
pub struct GithubClient {
    client: Client,
    base_url: Url,
}

#[derive(Debug, Serialize)]
struct CreateFileBody<'a> {
    message: &'a str,
    content: &'a str,
    branch: &'a str,
}

#[derive(Debug, Deserialize)]
struct CreateFileResponse {
    content: Option<ContentInfo>,
    commit: CommitInfo,
}

#[derive(Debug, Deserialize)]
struct ContentInfo {
    html_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CommitInfo {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

impl GithubClient {
    pub fn new(config: &GithubApiConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create GitHub HTTP client: {}", e))?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
        })
    }

    /// Build an API URL from path segments. Segments are percent-encoded individually, so a
    /// repository path like `pics/a b.png` stays two segments.
    fn endpoint<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| GithubError::Upstream {
                status: None,
                message: format!("Invalid GitHub API base URL: {}", self.base_url),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorized(&self, builder: RequestBuilder, token: &GithubToken) -> RequestBuilder {
        builder
            .bearer_auth(token.expose())
            .header(reqwest::header::ACCEPT, ACCEPT)
            .header("X-GitHub-Api-Version", API_VERSION)
    }
}

fn transport_error(e: reqwest::Error) -> GithubError {
    GithubError::Upstream {
        status: e.status().map(|s| s.as_u16()),
        message: e.to_string(),
    }
}

/// Map a non-success response into the error taxonomy, keeping GitHub's message verbatim.
async fn error_from_response(response: Response) -> GithubError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .ok()
        .and_then(|b| b.message)
        .unwrap_or_else(|| {
            if body.is_empty() {
                status.canonical_reason().unwrap_or("Unknown error").to_string()
            } else {
                body.clone()
            }
        });

    debug!(status = status.as_u16(), message = %message, "GitHub API returned an error");

    match status {
        StatusCode::UNAUTHORIZED => GithubError::Unauthorized(message),
        StatusCode::NOT_FOUND => GithubError::NotFound(message),
        _ if message.contains("Bad credentials") => GithubError::Unauthorized(message),
        _ => GithubError::Upstream {
            status: Some(status.as_u16()),
            message,
        },
    }
}

#[async_trait]
impl ContentWriter for GithubClient {
    #[instrument(skip_all, fields(repo = %request.coordinates, path = request.path))]
    async fn create_file(&self, request: CreateFileRequest<'_>) -> Result<WriteOutcome> {
        let coords = request.coordinates;
        let url = self.endpoint(
            ["repos", coords.owner.as_str(), coords.repo.as_str(), "contents"]
                .into_iter()
                .chain(request.path.split('/')),
        )?;

        let body = CreateFileBody {
            message: request.message,
            content: request.content_base64,
            branch: &coords.branch,
        };

        let response = self
            .authorized(self.client.put(url), request.token)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let parsed: CreateFileResponse = response.json().await.map_err(|e| GithubError::Upstream {
            status: None,
            message: format!("error decoding GitHub response: {}", e),
        })?;

        debug!(commit_sha = abbrev_sha(&parsed.commit.sha), "GitHub accepted file");

        Ok(WriteOutcome {
            commit_sha: parsed.commit.sha,
            html_url: parsed.content.and_then(|c| c.html_url),
        })
    }

    #[instrument(skip(self, token))]
    async fn get_repository(&self, token: &GithubToken, owner: &str, repo: &str) -> Result<RepositoryInfo> {
        let url = self.endpoint(["repos", owner, repo])?;
        let response = self
            .authorized(self.client.get(url), token)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        response.json().await.map_err(|e| GithubError::Upstream {
            status: None,
            message: format!("error decoding GitHub response: {}", e),
        })
    }

    #[instrument(skip(self, token))]
    async fn branch_exists(&self, token: &GithubToken, owner: &str, repo: &str, branch: &str) -> Result<bool> {
        let url = self.endpoint(["repos", owner, repo, "branches", branch])?;
        let response = self
            .authorized(self.client.get(url), token)
            .send()
            .await
            .map_err(transport_error)?;

        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            _ => Err(error_from_response(response).await),
        }
    }
}
