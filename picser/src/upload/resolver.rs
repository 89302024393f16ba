//! Resolution of the destination repository for an upload.
//!
//! The pipeline is identical in both deployment modes; only the source of the credential and
//! repository coordinates differs:
//!
//! - [`PerRequestResolver`]: multi-tenant, the caller supplies token and repository in the form
//! - [`ConfiguredResolver`]: single-tenant, one repository fixed at startup for every caller

use crate::config::UploadDefaults;
use crate::errors::{Error, Result};
use crate::types::{GithubToken, RepoCoordinates, RepoTarget};

/// Message returned when multi-tenant fields are absent
pub const MISSING_GITHUB_FIELDS_MESSAGE: &str = "Missing required GitHub configuration: github_token, github_owner, github_repo";

/// Text fields of an upload form. Empty strings are treated as absent.
#[derive(Debug, Clone, Default)]
pub struct RequestFields {
    pub github_token: Option<String>,
    pub github_owner: Option<String>,
    pub github_repo: Option<String>,
    pub github_branch: Option<String>,
    pub folder: Option<String>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Turns request fields into a destination.
pub trait TargetResolver: Send + Sync {
    fn resolve(&self, fields: &RequestFields) -> Result<RepoTarget>;

    /// Whether this resolver reads the `github_*` fields (used for response shaping).
    fn is_multi_tenant(&self) -> bool;
}

/// Multi-tenant mode: credential and repository come from the request.
#[derive(Debug, Clone)]
pub struct PerRequestResolver {
    defaults: UploadDefaults,
}

impl PerRequestResolver {
    pub fn new(defaults: UploadDefaults) -> Self {
        Self { defaults }
    }
}

impl TargetResolver for PerRequestResolver {
    fn resolve(&self, fields: &RequestFields) -> Result<RepoTarget> {
        let (Some(token), Some(owner), Some(repo)) = (
            non_empty(&fields.github_token),
            non_empty(&fields.github_owner),
            non_empty(&fields.github_repo),
        ) else {
            return Err(Error::BadRequest {
                message: MISSING_GITHUB_FIELDS_MESSAGE.to_string(),
            });
        };

        let branch = non_empty(&fields.github_branch).unwrap_or(&self.defaults.branch);
        let folder = non_empty(&fields.folder).unwrap_or(&self.defaults.folder);

        Ok(RepoTarget {
            token: GithubToken::new(token),
            coordinates: RepoCoordinates::new(owner, repo, branch),
            folder: folder.to_string(),
        })
    }

    fn is_multi_tenant(&self) -> bool {
        true
    }
}

/// Single-tenant mode: one repository configured for the whole deployment.
///
/// Any `github_*` or `folder` fields in the request are ignored.
#[derive(Debug, Clone)]
pub struct ConfiguredResolver {
    target: RepoTarget,
}

impl ConfiguredResolver {
    pub fn new(target: RepoTarget) -> Self {
        Self { target }
    }
}

impl TargetResolver for ConfiguredResolver {
    fn resolve(&self, _fields: &RequestFields) -> Result<RepoTarget> {
        Ok(self.target.clone())
    }

    fn is_multi_tenant(&self) -> bool {
        false
    }
}
