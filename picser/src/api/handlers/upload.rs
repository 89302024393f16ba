use axum::{
    Json,
    extract::{
        Multipart, State,
        multipart::Field,
    },
};
use bytes::BytesMut;

use crate::AppState;
use crate::api::models::upload::{EndpointInfo, ParameterInfo, UploadResponse};
use crate::errors::{Error, ErrorResponse, Result};
use crate::upload::{IncomingFile, PerRequestResolver, RequestFields, validator};

/// File name used when the multipart part carries none
const FALLBACK_FILE_NAME: &str = "image";

/// Upper bound on each text field of the upload form, in bytes
pub const MAX_TEXT_FIELD_LEN: usize = 4 * 1024;

/// Read the upload form, streaming the file part and stopping as soon as it outgrows the limit.
///
/// Unknown fields are skipped without buffering. A form without a `file` part yields `None`.
/// A file that is not an image, or that is too large, is returned without content so the
/// pipeline reports it in the usual order.
async fn read_upload_form(multipart: &mut Multipart, max_file_size: u64) -> Result<(Option<IncomingFile>, RequestFields)> {
    let mut file = None;
    let mut fields = RequestFields::default();

    while let Some(mut field) = multipart.next_field().await.map_err(|e| Error::BadRequest {
        message: format!("Failed to parse multipart data: {}", e),
    })? {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "file" => {
                let file_name = field
                    .file_name()
                    .filter(|n| !n.is_empty())
                    .unwrap_or(FALLBACK_FILE_NAME)
                    .to_string();
                let content_type = field.content_type().unwrap_or("application/octet-stream").to_string();

                if validator::check_type(&content_type).is_err() {
                    tracing::debug!(content_type = %content_type, "Skipping content of non-image file part");
                    file = Some(IncomingFile::discarded(file_name, content_type, 0));
                    continue;
                }

                let mut content = BytesMut::new();
                let mut total_size = 0u64;
                while let Some(chunk) = field.chunk().await.map_err(|e| Error::BadRequest {
                    message: format!("Failed to read file chunk: {}", e),
                })? {
                    total_size += chunk.len() as u64;

                    // Check size limit incrementally to fail fast
                    if total_size > max_file_size {
                        tracing::warn!(
                            total_size = total_size,
                            max_file_size = max_file_size,
                            "File size limit exceeded, discarding upload content"
                        );
                        break;
                    }
                    content.extend_from_slice(&chunk);
                }

                tracing::debug!(file_name = %file_name, size = total_size, "Received file part");
                file = Some(if total_size > max_file_size {
                    IncomingFile::discarded(file_name, content_type, total_size)
                } else {
                    IncomingFile::new(file_name, content_type, content.freeze())
                });
            }
            "github_token" | "github_owner" | "github_repo" | "github_branch" | "folder" => {
                let value = read_text_field(&mut field, &field_name).await?;
                let slot = match field_name.as_str() {
                    "github_token" => &mut fields.github_token,
                    "github_owner" => &mut fields.github_owner,
                    "github_repo" => &mut fields.github_repo,
                    "github_branch" => &mut fields.github_branch,
                    _ => &mut fields.folder,
                };
                *slot = Some(value);
            }
            _ => {
                // Ignore unknown fields (forward compatibility)
            }
        }
    }

    Ok((file, fields))
}

async fn read_text_field(field: &mut Field<'_>, name: &str) -> Result<String> {
    let mut buf = BytesMut::new();
    while let Some(chunk) = field.chunk().await.map_err(|e| Error::BadRequest {
        message: format!("Failed to read field '{}': {}", name, e),
    })? {
        if buf.len() + chunk.len() > MAX_TEXT_FIELD_LEN {
            return Err(Error::BadRequest {
                message: format!("Field '{}' must be at most {} bytes", name, MAX_TEXT_FIELD_LEN),
            });
        }
        buf.extend_from_slice(&chunk);
    }
    String::from_utf8(buf.to_vec()).map_err(|_| Error::BadRequest {
        message: format!("Field '{}' is not valid UTF-8", name),
    })
}

fn file_parameter(max_file_size: u64) -> ParameterInfo {
    ParameterInfo::required(
        "file",
        "File",
        &format!("Image file to upload (JPG, PNG, GIF, WebP), at most {}", validator::format_size(max_file_size)),
    )
}

/// Upload an image to the repository configured for this deployment.
#[utoipa::path(
    post,
    path = "/api/upload",
    tag = "upload",
    summary = "Upload image (single-tenant)",
    description = "Commit an image to the repository configured on the server and return its URLs.",
    request_body(content_type = "multipart/form-data", description = "Form with a single `file` part"),
    responses(
        (status = 200, description = "Image uploaded", body = UploadResponse),
        (status = 400, description = "No file, wrong type or file too large", body = ErrorResponse),
        (status = 401, description = "Configured token rejected by GitHub", body = ErrorResponse),
        (status = 404, description = "Configured repository not reachable", body = ErrorResponse),
        (status = 500, description = "Upload failed", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip_all)]
pub async fn upload(State(state): State<AppState>, mut multipart: Multipart) -> Result<Json<UploadResponse>> {
    let resolver = state.single_tenant.clone().ok_or_else(|| Error::Internal {
        operation: "upload: no repository configured".to_string(),
    })?;

    let (file, fields) = read_upload_form(&mut multipart, state.uploader.max_file_size()).await?;
    let result = state.uploader.upload(resolver.as_ref(), &fields, file).await?;

    Ok(Json(UploadResponse::from_result(result)))
}

/// Upload an image to a repository named in the request.
#[utoipa::path(
    post,
    path = "/api/public-upload",
    tag = "upload",
    summary = "Upload image (multi-tenant)",
    description = "Commit an image to any repository the supplied token can write to.",
    request_body(
        content_type = "multipart/form-data",
        description = "Form with `file`, `github_token`, `github_owner`, `github_repo` and optional `github_branch` and `folder`"
    ),
    responses(
        (status = 200, description = "Image uploaded", body = UploadResponse),
        (status = 400, description = "Missing fields, wrong type or file too large", body = ErrorResponse),
        (status = 401, description = "Invalid GitHub token", body = ErrorResponse),
        (status = 404, description = "Repository not found or insufficient permissions", body = ErrorResponse),
        (status = 500, description = "Upload failed", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip_all)]
pub async fn public_upload(State(state): State<AppState>, mut multipart: Multipart) -> Result<Json<UploadResponse>> {
    let resolver = PerRequestResolver::new(state.config.defaults.clone());

    let (file, fields) = read_upload_form(&mut multipart, state.uploader.max_file_size()).await?;
    let result = state.uploader.upload(&resolver, &fields, file).await?;

    Ok(Json(UploadResponse::with_repository(result)))
}

/// Describe the single-tenant upload endpoint.
#[utoipa::path(
    get,
    path = "/api/upload",
    tag = "upload",
    summary = "Describe single-tenant upload",
    responses((status = 200, description = "Endpoint description", body = EndpointInfo))
)]
pub async fn upload_info(State(state): State<AppState>) -> Json<EndpointInfo> {
    let max_file_size = state.uploader.max_file_size();
    Json(EndpointInfo {
        endpoint: "/api/upload".to_string(),
        description: "Image upload API endpoint".to_string(),
        method: "POST".to_string(),
        content_type: "multipart/form-data".to_string(),
        parameters: vec![file_parameter(max_file_size)],
        max_file_size: Some(validator::format_size(max_file_size)),
        allowed_types: vec!["image/*".to_string()],
    })
}

/// Describe the multi-tenant upload endpoint.
#[utoipa::path(
    get,
    path = "/api/public-upload",
    tag = "upload",
    summary = "Describe multi-tenant upload",
    responses((status = 200, description = "Endpoint description", body = EndpointInfo))
)]
pub async fn public_upload_info(State(state): State<AppState>) -> Json<EndpointInfo> {
    let max_file_size = state.uploader.max_file_size();
    let defaults = &state.config.defaults;
    Json(EndpointInfo {
        endpoint: "/api/public-upload".to_string(),
        description: "Public API for uploading images to any GitHub repository".to_string(),
        method: "POST".to_string(),
        content_type: "multipart/form-data".to_string(),
        parameters: vec![
            file_parameter(max_file_size),
            ParameterInfo::required("github_token", "string", "GitHub Personal Access Token with Contents permission"),
            ParameterInfo::required("github_owner", "string", "GitHub username or organization name"),
            ParameterInfo::required("github_repo", "string", "GitHub repository name"),
            ParameterInfo::optional("github_branch", "string", &defaults.branch, "Target branch name"),
            ParameterInfo::optional("folder", "string", &defaults.folder, "Folder path within the repository"),
        ],
        max_file_size: Some(validator::format_size(max_file_size)),
        allowed_types: vec!["image/*".to_string()],
    })
}
