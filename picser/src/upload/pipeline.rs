//! The upload pipeline: validate, encode, name, write, derive URLs.
//!
//! Stages run strictly in sequence. A validation failure returns before any network access; a
//! write failure returns after it, with no compensating action. If the write times out on our
//! side but succeeds at GitHub, the file stays in the repository unreferenced.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, instrument};

use super::resolver::{RequestFields, TargetResolver};
use super::urls::{UploadUrls, derive_urls};
use super::{naming, validator};
use crate::errors::{Error, Result};
use crate::github::{ContentWriter, CreateFileRequest};
use crate::types::{RepoCoordinates, abbrev_sha};

/// An image received from a client, before any checks.
#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub file_name: String,
    /// Caller-declared MIME type
    pub content_type: String,
    pub content: Bytes,
    /// Bytes seen on the wire; exceeds `content.len()` when buffering stopped early
    size: u64,
}

impl IncomingFile {
    pub fn new(file_name: impl Into<String>, content_type: impl Into<String>, content: Bytes) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            size: content.len() as u64,
            content,
        }
    }

    /// A file whose content was not kept, either because it outgrew the limit after `seen`
    /// bytes or because its declared type ruled it out before reading.
    pub fn discarded(file_name: impl Into<String>, content_type: impl Into<String>, seen: u64) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            content: Bytes::new(),
            size: seen,
        }
    }

    pub fn size(&self) -> u64 {
        self.size
    }
}

/// Everything produced by a successful upload.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadResult {
    /// Repository-relative path of the new file
    pub path: String,
    pub size: u64,
    pub content_type: String,
    pub commit_sha: String,
    pub html_url: Option<String>,
    pub urls: UploadUrls,
    pub coordinates: RepoCoordinates,
    /// Folder after sanitizing
    pub folder: String,
}

/// Pipeline stages, in order. Only used for tracing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    Validated,
    Encoded,
    Named,
    Written,
    UrlsDerived,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Received => "received",
            Stage::Validated => "validated",
            Stage::Encoded => "encoded",
            Stage::Named => "named",
            Stage::Written => "written",
            Stage::UrlsDerived => "urls_derived",
        };
        f.write_str(name)
    }
}

/// Runs uploads against a [`ContentWriter`]. Holds no per-request state.
#[derive(Clone)]
pub struct Uploader {
    writer: Arc<dyn ContentWriter>,
    max_file_size: u64,
}

impl Uploader {
    pub fn new(writer: Arc<dyn ContentWriter>, max_file_size: u64) -> Self {
        Self { writer, max_file_size }
    }

    pub fn max_file_size(&self) -> u64 {
        self.max_file_size
    }

    /// Run the full pipeline for one request.
    ///
    /// Checks happen in this order: file present, destination resolvable, type, size.
    #[instrument(skip_all, fields(multi_tenant = resolver.is_multi_tenant()))]
    pub async fn upload(&self, resolver: &dyn TargetResolver, fields: &RequestFields, file: Option<IncomingFile>) -> Result<UploadResult> {
        debug!(stage = %Stage::Received, "Upload received");

        let file = file.ok_or(validator::ValidationError::MissingFile)?;
        let target = resolver.resolve(fields)?;
        validator::validate(&file.content_type, file.size(), self.max_file_size)?;
        debug!(stage = %Stage::Validated, size = file.size(), content_type = %file.content_type, "Upload validated");

        let content = file.content.clone();
        let encoded = tokio::task::spawn_blocking(move || STANDARD.encode(&content))
            .await
            .map_err(|e| Error::Internal {
                operation: format!("encode upload content: {}", e),
            })?;
        debug!(stage = %Stage::Encoded, encoded_len = encoded.len(), "Upload encoded");

        let path = naming::generate_path(&file.file_name, &target.folder);
        debug!(stage = %Stage::Named, path = %path, "Upload named");

        let message = format!("Upload image: {}", file.file_name);
        let outcome = self
            .writer
            .create_file(CreateFileRequest {
                token: &target.token,
                coordinates: &target.coordinates,
                path: &path,
                message: &message,
                content_base64: &encoded,
            })
            .await
            .map_err(|e| Error::from_github("Upload", e))?;
        debug!(stage = %Stage::Written, "Upload written");

        let urls = derive_urls(&target.coordinates, &outcome.commit_sha, &path);
        debug!(stage = %Stage::UrlsDerived, "Upload URLs derived");

        info!(
            repo = %target.coordinates,
            path = %path,
            size = file.size(),
            commit_sha = abbrev_sha(&outcome.commit_sha),
            "Image uploaded"
        );

        Ok(UploadResult {
            size: file.size(),
            content_type: file.content_type,
            commit_sha: outcome.commit_sha,
            html_url: outcome.html_url,
            urls,
            folder: naming::sanitize_folder(&target.folder),
            coordinates: target.coordinates,
            path,
        })
    }
}
