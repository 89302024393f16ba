//! OpenAPI documentation for the upload API.
//!
//! Served as an interactive reference at `/api-docs` and as JSON at `/api-docs/openapi.json`.

use utoipa::OpenApi;

use crate::api;
use crate::errors::ErrorResponse;
use crate::github::RepositoryInfo;
use crate::upload::UploadUrls;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Picser API",
        description = "Upload images to GitHub repositories and receive branch-based and commit-pinned URLs \
                       (github.com, raw.githubusercontent.com and the jsDelivr CDN)."
    ),
    paths(
        api::handlers::upload::upload,
        api::handlers::upload::upload_info,
        api::handlers::upload::public_upload,
        api::handlers::upload::public_upload_info,
        api::handlers::test_config::test_config,
        api::handlers::test_config::test_config_info,
    ),
    components(
        schemas(
            api::models::upload::UploadResponse,
            api::models::upload::RepositorySummary,
            api::models::upload::EndpointInfo,
            api::models::upload::ParameterInfo,
            api::models::test_config::TestConfigRequest,
            api::models::test_config::TestConfigResponse,
            api::models::test_config::BranchStatus,
            api::models::test_config::MissingFieldsResponse,
            UploadUrls,
            RepositoryInfo,
            ErrorResponse,
        )
    ),
    tags(
        (name = "upload", description = "Image upload"),
        (name = "configuration", description = "Repository configuration checks"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documents_every_endpoint() {
        let doc = ApiDoc::openapi();
        for path in ["/api/upload", "/api/public-upload", "/api/test-config"] {
            let item = doc.paths.paths.get(path).unwrap_or_else(|| panic!("{path} missing"));
            assert!(item.get.is_some(), "{path} GET missing");
            assert!(item.post.is_some(), "{path} POST missing");
        }
    }
}
