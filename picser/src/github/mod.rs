//! GitHub content API abstraction layer
//!
//! This module defines the `ContentWriter` trait, the only path by which the service talks to
//! GitHub. Upload handlers call through the trait and never build HTTP requests themselves, which
//! keeps the pipeline testable with a recording fake (see `test_utils`).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::types::{GithubToken, RepoCoordinates};

pub mod client;

pub use client::GithubClient;

/// Result type for content writer operations
pub type Result<T> = std::result::Result<T, GithubError>;

/// Errors surfaced by the GitHub API.
///
/// There is no retry anywhere below this type: every failure is terminal for the attempt.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GithubError {
    /// The credential was rejected (HTTP 401, "Bad credentials")
    #[error("GitHub rejected the credential: {0}")]
    Unauthorized(String),

    /// Repository or branch missing, or not visible with this credential (HTTP 404)
    #[error("GitHub resource not found: {0}")]
    NotFound(String),

    /// Any other failure, carrying the upstream message verbatim
    #[error("{message}")]
    Upstream { status: Option<u16>, message: String },
}

/// Request to create a single file through the contents API.
#[derive(Debug, Clone)]
pub struct CreateFileRequest<'a> {
    pub token: &'a GithubToken,
    pub coordinates: &'a RepoCoordinates,
    /// Repository-relative path of the new file
    pub path: &'a str,
    pub message: &'a str,
    /// File content, base64 encoded
    pub content_base64: &'a str,
}

/// Outcome of a successful write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOutcome {
    pub commit_sha: String,
    /// `html_url` of the created content, when GitHub returns one
    pub html_url: Option<String>,
}

/// Repository metadata returned by the configuration check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RepositoryInfo {
    pub name: String,
    pub full_name: String,
    pub private: bool,
    pub default_branch: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub permissions: Option<serde_json::Value>,
}

/// Abstract interface to the remote repository host
#[async_trait]
pub trait ContentWriter: Send + Sync {
    /// Commit one new file to `coordinates.branch`.
    ///
    /// A single round trip: if the call fails partway, the file may or may not exist remotely
    /// and nothing here reconciles that.
    async fn create_file(&self, request: CreateFileRequest<'_>) -> Result<WriteOutcome>;

    /// Read-only check that the repository is reachable with this credential.
    async fn get_repository(&self, token: &GithubToken, owner: &str, repo: &str) -> Result<RepositoryInfo>;

    /// Whether `branch` exists in the repository.
    async fn branch_exists(&self, token: &GithubToken, owner: &str, repo: &str, branch: &str) -> Result<bool>;
}
