//! Test doubles and app constructors shared by the unit tests.

use async_trait::async_trait;
use axum_test::TestServer;
use std::sync::{Arc, Mutex};

use crate::config::{Config, GithubConfig};
use crate::github::{ContentWriter, CreateFileRequest, GithubError, RepositoryInfo, Result, WriteOutcome};
use crate::types::{GithubToken, RepoCoordinates};

/// A `create_file` invocation as seen by [`RecordingWriter`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedWrite {
    pub token: String,
    pub coordinates: RepoCoordinates,
    pub path: String,
    pub message: String,
    pub content_base64: String,
}

/// In-memory [`ContentWriter`] that records every write and answers from a script.
#[derive(Debug)]
pub struct RecordingWriter {
    outcome: std::result::Result<String, GithubError>,
    repository: std::result::Result<RepositoryInfo, GithubError>,
    existing_branches: Vec<String>,
    calls: Mutex<Vec<RecordedWrite>>,
}

impl RecordingWriter {
    /// Every write succeeds with `commit_sha`.
    pub fn succeeding(commit_sha: &str) -> Self {
        Self {
            outcome: Ok(commit_sha.to_string()),
            repository: Ok(sample_repository("acme", "imgs")),
            existing_branches: vec!["main".to_string()],
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Every call fails with `error`.
    pub fn failing(error: GithubError) -> Self {
        Self {
            outcome: Err(error.clone()),
            repository: Err(error),
            existing_branches: Vec::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_branches(mut self, branches: &[&str]) -> Self {
        self.existing_branches = branches.iter().map(|b| b.to_string()).collect();
        self
    }

    pub fn calls(&self) -> Vec<RecordedWrite> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ContentWriter for RecordingWriter {
    async fn create_file(&self, request: CreateFileRequest<'_>) -> Result<WriteOutcome> {
        self.calls.lock().unwrap().push(RecordedWrite {
            token: request.token.expose().to_string(),
            coordinates: request.coordinates.clone(),
            path: request.path.to_string(),
            message: request.message.to_string(),
            content_base64: request.content_base64.to_string(),
        });
        self.outcome.clone().map(|commit_sha| WriteOutcome {
            html_url: Some(format!(
                "https://github.com/{}/{}/blob/{}/{}",
                request.coordinates.owner, request.coordinates.repo, request.coordinates.branch, request.path
            )),
            commit_sha,
        })
    }

    async fn get_repository(&self, _token: &GithubToken, _owner: &str, _repo: &str) -> Result<RepositoryInfo> {
        self.repository.clone()
    }

    async fn branch_exists(&self, _token: &GithubToken, _owner: &str, _repo: &str, branch: &str) -> Result<bool> {
        Ok(self.existing_branches.iter().any(|b| b == branch))
    }
}

pub fn sample_repository(owner: &str, repo: &str) -> RepositoryInfo {
    RepositoryInfo {
        name: repo.to_string(),
        full_name: format!("{owner}/{repo}"),
        private: false,
        default_branch: "main".to_string(),
        permissions: Some(serde_json::json!({"admin": false, "push": true, "pull": true})),
    }
}

/// Config with a single-tenant repository, as a deployment with GITHUB_* set would have.
pub fn create_test_config() -> Config {
    Config {
        github: Some(GithubConfig {
            token: GithubToken::new("ghp_server_token"),
            owner: "house".to_string(),
            repo: "cdn".to_string(),
            branch: "main".to_string(),
            folder: "uploads".to_string(),
        }),
        ..Config::default()
    }
}

pub fn create_test_app(config: Config, writer: Arc<RecordingWriter>) -> TestServer {
    crate::Application::new_with_writer(config, writer)
        .expect("Failed to create application")
        .into_test_server()
}
