use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::upload::{UploadResult, UploadUrls};

/// Successful upload response.
///
/// The flat fields are common to both endpoints; `message` and `repository` are only present on
/// the multi-tenant endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct UploadResponse {
    /// Always `true`
    pub success: bool,
    /// Branch-based raw URL
    pub url: String,
    pub urls: UploadUrls,
    /// Repository-relative path of the committed file
    #[schema(example = "uploads/2026-10-17T08-30-05-123Z-k3j9x0a1b.png")]
    pub filename: String,
    /// Size in bytes
    pub size: u64,
    /// Declared MIME type
    #[serde(rename = "type")]
    pub content_type: String,
    pub commit_sha: String,
    /// Blob page on github.com, when GitHub reports one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<RepositorySummary>,
}

/// Where a multi-tenant upload landed
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct RepositorySummary {
    pub owner: String,
    pub repo: String,
    pub branch: String,
    pub folder: String,
}

impl UploadResponse {
    /// Response body for the single-tenant endpoint.
    pub fn from_result(result: UploadResult) -> Self {
        let github_url = result.html_url.or_else(|| Some(result.urls.github.clone()));
        Self {
            success: true,
            url: result.urls.primary().to_string(),
            filename: result.path,
            size: result.size,
            content_type: result.content_type,
            commit_sha: result.commit_sha,
            github_url,
            urls: result.urls,
            message: None,
            repository: None,
        }
    }

    /// Response body for the multi-tenant endpoint, which also echoes the destination.
    pub fn with_repository(result: UploadResult) -> Self {
        let repository = RepositorySummary {
            owner: result.coordinates.owner.clone(),
            repo: result.coordinates.repo.clone(),
            branch: result.coordinates.branch.clone(),
            folder: result.folder.clone(),
        };
        Self {
            message: Some("Image uploaded successfully".to_string()),
            repository: Some(repository),
            ..Self::from_result(result)
        }
    }
}

/// One parameter in an endpoint description
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ParameterInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    pub description: String,
}

impl ParameterInfo {
    pub fn required(name: &str, kind: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: kind.to_string(),
            required: true,
            default: None,
            description: description.to_string(),
        }
    }

    pub fn optional(name: &str, kind: &str, default: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: kind.to_string(),
            required: false,
            default: Some(default.to_string()),
            description: description.to_string(),
        }
    }
}

/// Self-description returned by `GET` on each API endpoint
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EndpointInfo {
    pub endpoint: String,
    pub description: String,
    pub method: String,
    pub content_type: String,
    pub parameters: Vec<ParameterInfo>,
    /// Human readable upload limit, e.g. "100MB"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_file_size: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowed_types: Vec<String>,
}
