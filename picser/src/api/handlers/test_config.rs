use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::AppState;
use crate::api::models::test_config::{BranchStatus, MissingFieldsResponse, TestConfigRequest, TestConfigResponse};
use crate::api::models::upload::{EndpointInfo, ParameterInfo};
use crate::errors::{Error, ErrorResponse, Result};
use crate::types::GithubToken;

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Check that a token can see a repository, and whether the branch exists yet.
///
/// Read-only: nothing is written to the repository.
#[utoipa::path(
    post,
    path = "/api/test-config",
    tag = "configuration",
    summary = "Test GitHub configuration",
    request_body = TestConfigRequest,
    responses(
        (status = 200, description = "Repository reachable", body = TestConfigResponse),
        (status = 400, description = "Missing required fields", body = MissingFieldsResponse),
        (status = 401, description = "Invalid GitHub token", body = ErrorResponse),
        (status = 404, description = "Repository not found or insufficient permissions", body = ErrorResponse),
        (status = 500, description = "GitHub API error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip_all)]
pub async fn test_config(State(state): State<AppState>, payload: std::result::Result<Json<TestConfigRequest>, JsonRejection>) -> Result<Response> {
    let Json(request) = payload.map_err(|e| Error::BadRequest {
        message: format!("Invalid JSON body: {}", e.body_text()),
    })?;

    let (Some(token), Some(owner), Some(repo)) = (
        present(&request.github_token),
        present(&request.github_owner),
        present(&request.github_repo),
    ) else {
        let body = MissingFieldsResponse {
            error: "Missing required GitHub configuration".to_string(),
            required_fields: vec!["github_token".into(), "github_owner".into(), "github_repo".into()],
            optional_fields: vec!["github_branch".into()],
        };
        return Ok((StatusCode::BAD_REQUEST, Json(body)).into_response());
    };
    let branch = present(&request.github_branch).unwrap_or(&state.config.defaults.branch);
    let token = GithubToken::new(token);

    let repository = state
        .writer
        .get_repository(&token, owner, repo)
        .await
        .map_err(|e| Error::from_github("Repository check", e))?;

    let exists = state
        .writer
        .branch_exists(&token, owner, repo, branch)
        .await
        .map_err(|e| Error::from_github("Branch check", e))?;

    tracing::info!(repo = %repository.full_name, branch = %branch, branch_exists = exists, "GitHub configuration checked");

    let response = TestConfigResponse {
        success: true,
        message: "GitHub configuration is valid".to_string(),
        repository,
        branch: BranchStatus::new(branch, exists),
    };
    Ok(Json(response).into_response())
}

/// Describe the configuration check endpoint.
#[utoipa::path(
    get,
    path = "/api/test-config",
    tag = "configuration",
    summary = "Describe configuration test",
    responses((status = 200, description = "Endpoint description", body = EndpointInfo))
)]
pub async fn test_config_info(State(state): State<AppState>) -> Json<EndpointInfo> {
    Json(EndpointInfo {
        endpoint: "/api/test-config".to_string(),
        description: "Test GitHub configuration for the public upload API".to_string(),
        method: "POST".to_string(),
        content_type: "application/json".to_string(),
        parameters: vec![
            ParameterInfo::required("github_token", "string", "GitHub personal access token with repo permissions"),
            ParameterInfo::required("github_owner", "string", "GitHub username or organization name"),
            ParameterInfo::required("github_repo", "string", "Repository name"),
            ParameterInfo::optional("github_branch", "string", &state.config.defaults.branch, "Target branch name"),
        ],
        max_file_size: None,
        allowed_types: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use crate::api::models::test_config::{BRANCH_EXISTS_NOTE, BRANCH_MISSING_NOTE};
    use crate::errors::{INVALID_TOKEN_MESSAGE, REPO_NOT_FOUND_MESSAGE};
    use crate::github::GithubError;
    use crate::test_utils::{RecordingWriter, create_test_app, create_test_config};
    use axum::http::StatusCode;
    use serde_json::{Value, json};
    use std::sync::Arc;

    fn body(branch: Option<&str>) -> Value {
        let mut body = json!({
            "github_token": "ghp_tenant",
            "github_owner": "acme",
            "github_repo": "imgs",
        });
        if let Some(branch) = branch {
            body["github_branch"] = json!(branch);
        }
        body
    }

    #[tokio::test]
    async fn reports_repository_and_existing_branch() {
        let writer = Arc::new(RecordingWriter::succeeding("sha"));
        let app = create_test_app(create_test_config(), writer.clone());

        let response = app.post("/api/test-config").json(&body(None)).await;

        response.assert_status(StatusCode::OK);
        let json: Value = response.json();
        assert_eq!(json["success"], true);
        assert_eq!(json["message"], "GitHub configuration is valid");
        assert_eq!(json["repository"]["full_name"], "acme/imgs");
        assert_eq!(json["repository"]["default_branch"], "main");
        assert_eq!(json["repository"]["permissions"]["push"], true);
        assert_eq!(json["branch"], json!({"name": "main", "exists": true, "note": BRANCH_EXISTS_NOTE}));

        // Read-only
        assert!(writer.calls().is_empty());
    }

    #[tokio::test]
    async fn missing_branch_will_be_created() {
        let writer = Arc::new(RecordingWriter::succeeding("sha").with_branches(&["main"]));
        let app = create_test_app(create_test_config(), writer);

        let response = app.post("/api/test-config").json(&body(Some("gh-pages"))).await;

        response.assert_status(StatusCode::OK);
        let json: Value = response.json();
        assert_eq!(json["branch"]["exists"], false);
        assert_eq!(json["branch"]["note"], BRANCH_MISSING_NOTE);
    }

    #[tokio::test]
    async fn missing_fields_list_requirements() {
        let app = create_test_app(create_test_config(), Arc::new(RecordingWriter::succeeding("sha")));

        let response = app.post("/api/test-config").json(&json!({"github_owner": "acme"})).await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let json: Value = response.json();
        assert_eq!(json["error"], "Missing required GitHub configuration");
        assert_eq!(json["required_fields"], json!(["github_token", "github_owner", "github_repo"]));
        assert_eq!(json["optional_fields"], json!(["github_branch"]));
    }

    #[test_log::test(tokio::test)]
    async fn github_errors_follow_taxonomy() {
        let cases = [
            (GithubError::Unauthorized("Bad credentials".into()), StatusCode::UNAUTHORIZED, INVALID_TOKEN_MESSAGE.to_string()),
            (GithubError::NotFound("Not Found".into()), StatusCode::NOT_FOUND, REPO_NOT_FOUND_MESSAGE.to_string()),
            (
                GithubError::Upstream {
                    status: Some(403),
                    message: "API rate limit exceeded".into(),
                },
                StatusCode::INTERNAL_SERVER_ERROR,
                "Repository check failed: API rate limit exceeded".to_string(),
            ),
        ];

        for (error, status, message) in cases {
            let app = create_test_app(create_test_config(), Arc::new(RecordingWriter::failing(error)));
            let response = app.post("/api/test-config").json(&body(None)).await;
            response.assert_status(status);
            response.assert_json(&json!({ "error": message }));
        }
    }

    #[tokio::test]
    async fn malformed_json_is_bad_request() {
        let app = create_test_app(create_test_config(), Arc::new(RecordingWriter::succeeding("sha")));

        let response = app
            .post("/api/test-config")
            .content_type("application/json")
            .text("{not json")
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let json: Value = response.json();
        assert!(json["error"].as_str().unwrap().starts_with("Invalid JSON body"));
    }

    #[tokio::test]
    async fn describes_itself() {
        let app = create_test_app(create_test_config(), Arc::new(RecordingWriter::succeeding("sha")));
        let info: Value = app.get("/api/test-config").await.json();
        assert_eq!(info["content_type"], "application/json");
        assert!(info.get("max_file_size").is_none());
    }
}
