//! # picser: image hosting on top of GitHub repositories
//!
//! `picser` accepts an image over HTTP, commits it to a GitHub repository through the contents
//! API, and answers with six URLs for the new file: the github.com blob page, the raw file and
//! the jsDelivr CDN mirror, each in a branch-based and a commit-pinned form.
//!
//! ## Overview
//!
//! The service runs in one of two modes, possibly both at once:
//!
//! - **Multi-tenant** (`POST /api/public-upload`): every request carries its own GitHub token and
//!   target repository. The service stores nothing.
//! - **Single-tenant** (`POST /api/upload`): one repository and token are configured for the
//!   whole deployment (see [`config::GithubConfig`]); callers only send the file. The route is
//!   mounted only when that configuration is present.
//!
//! Both go through the same pipeline ([`upload::Uploader`]): validate the declared type and size,
//! base64-encode, generate a collision-resistant path, create the file with a single GitHub API
//! call, derive the URLs. There is no retry and no rollback. A failed write is reported with the
//! status GitHub's answer maps to (401, 404 or 500), see [`errors::Error`].
//!
//! The binary also ships a small client (`picser upload <FILE>`) that posts to a running service
//! and keeps a local, bounded history of uploads ([`history`]).
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use picser::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = picser::config::Args::parse();
//!     let config = Config::load(&args)?;
//!
//!     picser::telemetry::init_telemetry(config.enable_otel_export, "info")?;
//!
//!     let app = Application::new(config)?;
//!     app.serve(async {
//!         tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
//!     })
//!     .await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration
//!
//! See the [`config`] module for configuration options.
pub mod api;
pub mod client;
pub mod config;
pub mod errors;
pub mod github;
pub mod history;
mod openapi;
pub mod telemetry;
pub mod types;
pub mod upload;

#[cfg(test)]
pub mod test_utils;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{self, HeaderValue, Method},
    routing::get,
};
use bon::Builder;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, info, instrument};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

use crate::config::CorsOrigin;
use crate::github::{ContentWriter, GithubClient};
use crate::openapi::ApiDoc;
use crate::upload::{ConfiguredResolver, Uploader};

pub use config::Config;

/// Application state shared across all request handlers.
///
/// Everything in here is immutable after startup; requests share no mutable state.
///
/// # Example
///
/// ```ignore
/// let state = AppState::builder()
///     .config(config)
///     .writer(writer)
///     .uploader(uploader)
///     .build();
/// ```
#[derive(Clone, Builder)]
pub struct AppState {
    pub config: Arc<Config>,
    /// The only way handlers reach GitHub
    pub writer: Arc<dyn ContentWriter>,
    pub uploader: Uploader,
    /// Present when a deployment-wide repository is configured
    pub single_tenant: Option<Arc<ConfiguredResolver>>,
}

/// Create CORS layer from configuration
fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let cors_config = &config.cors;
    let allow_origin = if cors_config.allowed_origins.iter().any(|o| matches!(o, CorsOrigin::Wildcard)) {
        AllowOrigin::any()
    } else {
        let mut origins = Vec::new();
        for origin in &cors_config.allowed_origins {
            if let CorsOrigin::Url(url) = origin {
                // Origins never carry a path; Url always renders one
                origins.push(url.as_str().trim_end_matches('/').parse::<HeaderValue>()?);
            }
        }
        AllowOrigin::list(origins)
    };

    let mut cors = CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([http::header::CONTENT_TYPE, http::header::AUTHORIZATION])
        .allow_credentials(cors_config.allow_credentials);

    if let Some(max_age) = cors_config.max_age {
        cors = cors.max_age(std::time::Duration::from_secs(max_age));
    }

    Ok(cors)
}

/// Build the application router.
///
/// - `/healthz`
/// - `/api/public-upload` and `/api/test-config` (always)
/// - `/api/upload` (only with a single-tenant repository configured)
/// - `/api-docs` and `/api-docs/openapi.json`
///
/// Upload routes have axum's body limit disabled; the handler enforces the configured maximum
/// while streaming.
#[instrument(skip_all)]
pub fn build_router(state: AppState) -> anyhow::Result<Router> {
    let mut api_routes = Router::new()
        .route(
            "/api/public-upload",
            get(api::handlers::upload::public_upload_info)
                .post(api::handlers::upload::public_upload)
                .layer(DefaultBodyLimit::disable()),
        )
        .route(
            "/api/test-config",
            get(api::handlers::test_config::test_config_info).post(api::handlers::test_config::test_config),
        );

    if state.single_tenant.is_some() {
        api_routes = api_routes.route(
            "/api/upload",
            get(api::handlers::upload::upload_info)
                .post(api::handlers::upload::upload)
                .layer(DefaultBodyLimit::disable()),
        );
    } else {
        info!("No github section configured, /api/upload is disabled");
    }

    let cors_layer = create_cors_layer(&state.config)?;

    let router = Router::new()
        .route("/healthz", get(|| async { "OK" }))
        .merge(api_routes.with_state(state))
        .route("/api-docs/openapi.json", get(|| async { axum::Json(ApiDoc::openapi()) }))
        .merge(Scalar::with_url("/api-docs", ApiDoc::openapi()))
        .layer(cors_layer)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        );

    Ok(router)
}

/// The assembled service: configuration plus router, ready to serve.
pub struct Application {
    router: Router,
    config: Arc<Config>,
}

impl Application {
    /// Create the application, talking to the GitHub API configured in `config.github_api`.
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let writer = Arc::new(GithubClient::new(&config.github_api)?);
        Self::new_with_writer(config, writer)
    }

    /// Create the application with a caller-supplied [`ContentWriter`].
    pub fn new_with_writer(config: Config, writer: Arc<dyn ContentWriter>) -> anyhow::Result<Self> {
        config.validate()?;

        let config = Arc::new(config);
        let single_tenant = config.github.as_ref().map(|github| {
            let target = github.target();
            info!(repo = %target.coordinates, folder = %target.folder, "Single-tenant uploads enabled");
            Arc::new(ConfiguredResolver::new(target))
        });

        let state = AppState::builder()
            .config(config.clone())
            .uploader(Uploader::new(writer.clone(), config.limits.max_file_size))
            .writer(writer)
            .maybe_single_tenant(single_tenant)
            .build();

        let router = build_router(state)?;
        Ok(Self { router, config })
    }

    /// Convert application into a test server (for tests)
    #[cfg(test)]
    pub fn into_test_server(self) -> axum_test::TestServer {
        axum_test::TestServer::new(self.router.into_make_service()).expect("Failed to create test server")
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            "picser listening on http://{}, available at http://localhost:{}",
            bind_addr, self.config.port
        );

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Shutting down telemetry...");
        telemetry::shutdown_telemetry();

        Ok(())
    }
}
