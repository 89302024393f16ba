use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::github::RepositoryInfo;

pub const BRANCH_EXISTS_NOTE: &str = "Branch exists and is accessible";
pub const BRANCH_MISSING_NOTE: &str = "Branch will be created on first upload";

/// Body of `POST /api/test-config`
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct TestConfigRequest {
    pub github_token: Option<String>,
    pub github_owner: Option<String>,
    pub github_repo: Option<String>,
    /// Defaults to `main`
    pub github_branch: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TestConfigResponse {
    pub success: bool,
    pub message: String,
    pub repository: RepositoryInfo,
    pub branch: BranchStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct BranchStatus {
    pub name: String,
    pub exists: bool,
    pub note: String,
}

impl BranchStatus {
    pub fn new(name: impl Into<String>, exists: bool) -> Self {
        let note = if exists { BRANCH_EXISTS_NOTE } else { BRANCH_MISSING_NOTE };
        Self {
            name: name.into(),
            exists,
            note: note.to_string(),
        }
    }
}

/// 400 body when required fields are absent
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MissingFieldsResponse {
    pub error: String,
    pub required_fields: Vec<String>,
    pub optional_fields: Vec<String>,
}
