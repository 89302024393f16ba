//! Public URL derivation for committed content.
//!
//! Every uploaded file is reachable through three hosts (GitHub's web UI, the raw content host
//! and the jsDelivr GitHub mirror), each addressable by branch or by commit. Branch URLs follow
//! the branch tip and may change; commit URLs stay valid as long as the commit is reachable.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::types::RepoCoordinates;

const GITHUB_WEB: &str = "https://github.com";
const GITHUB_RAW: &str = "https://raw.githubusercontent.com";
const JSDELIVR_GH: &str = "https://cdn.jsdelivr.net/gh";

/// The six canonical URLs of one committed file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UploadUrls {
    /// GitHub blob page on the branch
    pub github: String,
    /// Raw content on the branch
    pub raw: String,
    /// jsDelivr CDN on the branch
    pub jsdelivr: String,
    /// GitHub blob page pinned to the commit
    pub github_commit: String,
    /// Raw content pinned to the commit
    pub raw_commit: String,
    /// jsDelivr CDN pinned to the commit
    pub jsdelivr_commit: String,
}

/// Which ref a URL resolves against.
#[derive(Debug, Clone, Copy)]
enum RefKind<'a> {
    Branch(&'a str),
    Commit(&'a str),
}

impl<'a> RefKind<'a> {
    fn as_str(self) -> &'a str {
        match self {
            RefKind::Branch(r) | RefKind::Commit(r) => r,
        }
    }
}

fn github_url(owner: &str, repo: &str, git_ref: RefKind<'_>, path: &str) -> String {
    format!("{GITHUB_WEB}/{owner}/{repo}/blob/{}/{path}", git_ref.as_str())
}

fn raw_url(owner: &str, repo: &str, git_ref: RefKind<'_>, path: &str) -> String {
    format!("{GITHUB_RAW}/{owner}/{repo}/{}/{path}", git_ref.as_str())
}

fn jsdelivr_url(owner: &str, repo: &str, git_ref: RefKind<'_>, path: &str) -> String {
    format!("{JSDELIVR_GH}/{owner}/{repo}@{}/{path}", git_ref.as_str())
}

/// Build all six URLs for `path` in the given repository. Pure; performs no network access.
pub fn derive_urls(coordinates: &RepoCoordinates, commit_sha: &str, path: &str) -> UploadUrls {
    let RepoCoordinates { owner, repo, branch } = coordinates;
    let branch = RefKind::Branch(branch);
    let commit = RefKind::Commit(commit_sha);

    UploadUrls {
        github: github_url(owner, repo, branch, path),
        raw: raw_url(owner, repo, branch, path),
        jsdelivr: jsdelivr_url(owner, repo, branch, path),
        github_commit: github_url(owner, repo, commit, path),
        raw_commit: raw_url(owner, repo, commit, path),
        jsdelivr_commit: jsdelivr_url(owner, repo, commit, path),
    }
}

impl UploadUrls {
    /// The URL handed out as the default `url` of a response.
    pub fn primary(&self) -> &str {
        &self.raw
    }

    /// URL preferred for embedding: the commit-pinned CDN link.
    pub fn best(&self) -> &str {
        &self.jsdelivr_commit
    }
}
