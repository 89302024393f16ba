//! Common type definitions shared by the upload pipeline, the GitHub client and the API layer.
//!
//! - [`GithubToken`]: a credential whose `Debug` output is redacted so it never reaches logs
//! - [`RepoCoordinates`]: owner / repository / branch triple identifying where content lands
//! - [`RepoTarget`]: everything an upload needs to know about its destination
//! - [`HistoryId`]: identifier of a client-local history record
//!
//! # Utility Functions
//!
//! - [`abbrev_sha`]: Abbreviate commit hashes to 7 chars for logging

use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

pub type HistoryId = Uuid;

/// A GitHub personal access token.
#[derive(Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct GithubToken(String);

impl GithubToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl FromStr for GithubToken {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl fmt::Debug for GithubToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("GithubToken(***)")
    }
}

/// Where in GitHub a piece of content lives (minus the path within the repository).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RepoCoordinates {
    pub owner: String,
    pub repo: String,
    pub branch: String,
}

impl RepoCoordinates {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>, branch: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
            branch: branch.into(),
        }
    }
}

impl fmt::Display for RepoCoordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}@{}", self.owner, self.repo, self.branch)
    }
}

/// Fully resolved destination of one upload: credential, repository and folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoTarget {
    pub token: GithubToken,
    pub coordinates: RepoCoordinates,
    pub folder: String,
}

/// Abbreviate a commit sha to its first 7 characters for more readable logs
/// Example: "6dcb09b5b57875f334f61aebed695e2e4193db5e" -> "6dcb09b"
pub fn abbrev_sha(sha: &str) -> &str {
    sha.get(..7).unwrap_or(sha)
}
