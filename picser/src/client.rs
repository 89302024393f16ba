//! HTTP client for a running picser service, used by the `upload` subcommand.

use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

use crate::api::models::upload::UploadResponse;
use crate::errors::ErrorResponse;
use crate::types::GithubToken;

const SINGLE_TENANT_PATH: &str = "/api/upload";
const MULTI_TENANT_PATH: &str = "/api/public-upload";

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Request to picser failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with an error body
    #[error("Upload rejected ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("Invalid server URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Caller-supplied destination for the multi-tenant endpoint.
#[derive(Debug, Clone)]
pub struct TenantTarget {
    pub token: GithubToken,
    pub owner: String,
    pub repo: String,
    pub branch: Option<String>,
    pub folder: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PicserClient {
    client: Client,
    base_url: Url,
}

impl PicserClient {
    pub fn new(base_url: Url) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(300))
            .user_agent(concat!("picser-cli/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, base_url })
    }

    /// Upload one local image.
    ///
    /// With a `tenant`, the multi-tenant endpoint is used and the destination travels in the
    /// form; otherwise the service's configured repository receives the file.
    #[instrument(skip_all, fields(file = %file.display()))]
    pub async fn upload(&self, file: &Path, tenant: Option<&TenantTarget>) -> Result<UploadResponse, ClientError> {
        let content = tokio::fs::read(file).await.map_err(|source| ClientError::Io {
            path: file.to_path_buf(),
            source,
        })?;
        let file_name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());
        let mime = mime_guess::from_path(file).first_or_octet_stream();
        debug!(size = content.len(), mime = %mime, "Sending upload");

        let part = Part::bytes(content).file_name(file_name).mime_str(mime.essence_str())?;
        let mut form = Form::new().part("file", part);

        let path = match tenant {
            Some(tenant) => {
                form = form
                    .text("github_token", tenant.token.expose().to_string())
                    .text("github_owner", tenant.owner.clone())
                    .text("github_repo", tenant.repo.clone());
                if let Some(branch) = &tenant.branch {
                    form = form.text("github_branch", branch.clone());
                }
                if let Some(folder) = &tenant.folder {
                    form = form.text("folder", folder.clone());
                }
                MULTI_TENANT_PATH
            }
            None => SINGLE_TENANT_PATH,
        };

        let response = self.client.post(self.base_url.join(path)?).multipart(form).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response.json::<UploadResponse>().await?);
        }

        Err(ClientError::Server {
            status: status.as_u16(),
            message: error_message(status, response.text().await.unwrap_or_default()),
        })
    }
}

fn error_message(status: StatusCode, body: String) -> String {
    match serde_json::from_str::<ErrorResponse>(&body) {
        Ok(parsed) => parsed.error,
        Err(_) if body.trim().is_empty() => status.canonical_reason().unwrap_or("Unknown error").to_string(),
        Err(_) => body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn success_body() -> serde_json::Value {
        json!({
            "success": true,
            "url": "https://raw.githubusercontent.com/acme/imgs/main/pics/x.png",
            "urls": {
                "github": "https://github.com/acme/imgs/blob/main/pics/x.png",
                "raw": "https://raw.githubusercontent.com/acme/imgs/main/pics/x.png",
                "jsdelivr": "https://cdn.jsdelivr.net/gh/acme/imgs@main/pics/x.png",
                "github_commit": "https://github.com/acme/imgs/blob/abc/pics/x.png",
                "raw_commit": "https://raw.githubusercontent.com/acme/imgs/abc/pics/x.png",
                "jsdelivr_commit": "https://cdn.jsdelivr.net/gh/acme/imgs@abc/pics/x.png"
            },
            "filename": "pics/x.png",
            "size": 4,
            "type": "image/png",
            "commit_sha": "abc"
        })
    }

    fn image_file() -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".png").tempfile().unwrap();
        file.write_all(b"PNG!").unwrap();
        file
    }

    #[tokio::test]
    async fn single_tenant_upload_decodes_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/upload"))
            .and(body_string_contains("image/png"))
            .respond_with(ResponseTemplate::new(200).set_body_json(success_body()))
            .expect(1)
            .mount(&server)
            .await;

        let client = PicserClient::new(server.uri().parse().unwrap()).unwrap();
        let file = image_file();
        let response = client.upload(file.path(), None).await.unwrap();

        assert!(response.success);
        assert_eq!(response.filename, "pics/x.png");
        assert_eq!(response.urls.jsdelivr_commit, "https://cdn.jsdelivr.net/gh/acme/imgs@abc/pics/x.png");
    }

    #[tokio::test]
    async fn tenant_upload_sends_github_fields() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/public-upload"))
            .and(body_string_contains("name=\"github_owner\""))
            .and(body_string_contains("name=\"folder\""))
            .respond_with(ResponseTemplate::new(200).set_body_json(success_body()))
            .expect(1)
            .mount(&server)
            .await;

        let client = PicserClient::new(server.uri().parse().unwrap()).unwrap();
        let file = image_file();
        let tenant = TenantTarget {
            token: GithubToken::new("ghp_x"),
            owner: "acme".into(),
            repo: "imgs".into(),
            branch: None,
            folder: Some("pics".into()),
        };
        client.upload(file.path(), Some(&tenant)).await.unwrap();
    }

    #[tokio::test]
    async fn error_body_is_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({"error": "Invalid GitHub token"})))
            .mount(&server)
            .await;

        let client = PicserClient::new(server.uri().parse().unwrap()).unwrap();
        let file = image_file();
        let err = client.upload(file.path(), None).await.unwrap_err();

        match err {
            ClientError::Server { status, message } => {
                assert_eq!(status, 401);
                assert_eq!(message, "Invalid GitHub token");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_local_file_is_io_error() {
        let client = PicserClient::new("http://127.0.0.1:9".parse().unwrap()).unwrap();
        let err = client.upload(Path::new("/definitely/not/here.png"), None).await.unwrap_err();
        assert!(matches!(err, ClientError::Io { .. }));
    }

    #[test]
    fn non_json_error_bodies_pass_through() {
        assert_eq!(error_message(StatusCode::BAD_GATEWAY, "upstream down".into()), "upstream down");
        assert_eq!(error_message(StatusCode::BAD_GATEWAY, String::new()), "Bad Gateway");
    }
}
