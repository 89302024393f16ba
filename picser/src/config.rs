//! Application configuration management.
//!
//! Configuration is loaded from a YAML file with environment variable overrides. The configuration
//! file path defaults to `config.yaml` but can be specified via `-f` flag or `PICSER_CONFIG`
//! environment variable. A missing file is not an error; every field has a default.
//!
//! ## Loading Priority
//!
//! Configuration sources are merged in the following order (later sources override earlier ones):
//!
//! 1. **YAML config file** - Base configuration (default: `config.yaml`)
//! 2. **Environment variables** - Variables prefixed with `PICSER_` override YAML values
//! 3. **GITHUB_TOKEN / GITHUB_OWNER / GITHUB_REPO / GITHUB_BRANCH** - Special case: populate the
//!    single-tenant `github` section
//!
//! For nested config values, use double underscores in environment variables. For example,
//! `PICSER_GITHUB__FOLDER=images` sets the `github.folder` field.
//!
//! ## Usage
//!
//! ```no_run
//! use clap::Parser;
//! use picser::config::{Args, Config};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let args = Args::parse();
//! let config = Config::load(&args)?;
//!
//! println!("Server will bind to {}:{}", config.host, config.port);
//! # Ok(())
//! # }
//! ```
//!
//! ## Configuration Structure
//!
//! - **Server**: `host`, `port` - HTTP server binding configuration
//! - **Single-tenant target**: `github.token`, `github.owner`, `github.repo`, `github.branch`,
//!   `github.folder` - the deployment-wide repository used by `/api/upload`
//! - **GitHub API**: `github_api.base_url`, `github_api.user_agent`, `github_api.request_timeout`
//! - **Limits**: `limits.max_file_size` - upload size ceiling in bytes
//! - **Defaults**: `defaults.branch`, `defaults.folder` - fallbacks for multi-tenant requests
//! - **CORS**: `cors.allowed_origins`, `cors.allow_credentials`, `cors.max_age`
//! - **History**: `history.path`, `history.capacity` - client-side upload history
//! - **Telemetry**: `enable_otel_export`
//!
//! ## Environment Variable Examples
//!
//! ```bash
//! # Override server port
//! PICSER_PORT=8080
//!
//! # Single-tenant repository (either form works)
//! GITHUB_TOKEN=ghp_xxx GITHUB_OWNER=acme GITHUB_REPO=imgs
//! PICSER_GITHUB__TOKEN=ghp_xxx PICSER_GITHUB__OWNER=acme PICSER_GITHUB__REPO=imgs
//!
//! # Point at a GitHub Enterprise API
//! PICSER_GITHUB_API__BASE_URL=https://github.example.com/api/v3
//! ```

use clap::{Parser, Subcommand};
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};
use url::Url;

use crate::errors::Error;
use crate::types::{GithubToken, RepoCoordinates, RepoTarget};
use crate::upload::validator::DEFAULT_MAX_FILE_SIZE;

/// Deployment variables recognised without the `PICSER_` prefix.
const GITHUB_ENV_VARS: &[&str] = &["GITHUB_TOKEN", "GITHUB_OWNER", "GITHUB_REPO", "GITHUB_BRANCH"];

/// CLI args: config file location plus an optional subcommand (defaults to `serve`)
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "PICSER_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// Validate configuration and exit without starting the server.
    #[arg(long)]
    pub validate: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the HTTP service (default)
    Serve,
    /// Upload a local image to a running picser service
    Upload(UploadArgs),
    /// Inspect or clear the local upload history
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },
}

#[derive(clap::Args, Debug, Clone)]
pub struct UploadArgs {
    /// Image file to upload
    pub file: PathBuf,

    /// Base URL of the picser service
    #[arg(long, env = "PICSER_SERVER", default_value = "http://localhost:3000")]
    pub server: Url,

    /// GitHub token; when set, the upload uses the multi-tenant endpoint
    #[arg(long, env = "PICSER_UPLOAD_TOKEN", requires_all = ["owner", "repo"])]
    pub token: Option<GithubToken>,

    /// Repository owner (multi-tenant mode)
    #[arg(long)]
    pub owner: Option<String>,

    /// Repository name (multi-tenant mode)
    #[arg(long)]
    pub repo: Option<String>,

    /// Target branch (multi-tenant mode)
    #[arg(long)]
    pub branch: Option<String>,

    /// Folder within the repository (multi-tenant mode)
    #[arg(long)]
    pub folder: Option<String>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum HistoryAction {
    /// Print recorded uploads, newest first
    List,
    /// Remove every recorded upload
    Clear,
}

/// Main application configuration.
///
/// This is the root configuration structure loaded from YAML and environment variables.
/// All fields have sensible defaults defined in the `Default` implementation.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// HTTP server host to bind to (e.g., "0.0.0.0" for all interfaces)
    pub host: String,
    /// HTTP server port to bind to
    pub port: u16,
    /// Single-tenant repository. When absent, `/api/upload` is not served.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub github: Option<GithubConfig>,
    /// GitHub REST API client settings
    pub github_api: GithubApiConfig,
    /// Upload limits
    pub limits: LimitsConfig,
    /// Fallbacks for optional multi-tenant form fields
    pub defaults: UploadDefaults,
    /// CORS settings for browser clients
    pub cors: CorsConfig,
    /// Client-side upload history
    pub history: HistoryConfig,
    /// Enable OpenTelemetry OTLP export for distributed tracing
    pub enable_otel_export: bool,
}

/// The deployment-wide repository used in single-tenant mode.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GithubConfig {
    pub token: GithubToken,
    pub owner: String,
    pub repo: String,
    #[serde(default = "default_branch")]
    pub branch: String,
    #[serde(default = "default_folder")]
    pub folder: String,
}

impl GithubConfig {
    pub fn target(&self) -> RepoTarget {
        RepoTarget {
            token: self.token.clone(),
            coordinates: RepoCoordinates::new(&self.owner, &self.repo, &self.branch),
            folder: self.folder.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct GithubApiConfig {
    /// API root (default: https://api.github.com)
    pub base_url: Url,
    /// User-Agent header sent with every request; GitHub rejects requests without one
    pub user_agent: String,
    /// Per-request timeout
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct LimitsConfig {
    /// Largest accepted upload in bytes (default 100 MiB)
    pub max_file_size: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct UploadDefaults {
    pub branch: String,
    pub folder: String,
}

/// CORS configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct CorsConfig {
    /// Allowed origins for CORS requests
    pub allowed_origins: Vec<CorsOrigin>,
    /// Allow credentials (cookies) in CORS requests
    pub allow_credentials: bool,
    /// Cache preflight requests for this many seconds
    pub max_age: Option<u64>,
}

/// CORS origin specification.
///
/// Can be either a wildcard (`*`) to allow all origins, or a specific URL.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum CorsOrigin {
    /// Allow all origins (`*`)
    #[serde(deserialize_with = "parse_wildcard")]
    Wildcard,
    /// Specific origin URL (e.g., `https://app.example.com`)
    #[serde(deserialize_with = "parse_url")]
    Url(Url),
}

fn parse_wildcard<'de, D>(deserializer: D) -> Result<(), D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    if s == "*" {
        Ok(())
    } else {
        Err(serde::de::Error::custom("Expected '*'"))
    }
}

fn parse_url<'de, D>(deserializer: D) -> Result<Url, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    Url::parse(&s).map_err(serde::de::Error::custom)
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct HistoryConfig {
    /// JSON file holding the history list
    pub path: PathBuf,
    /// Maximum number of records kept; oldest are dropped first
    pub capacity: usize,
}

fn default_branch() -> String {
    "main".to_string()
}

fn default_folder() -> String {
    "uploads".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            github: None,
            github_api: GithubApiConfig::default(),
            limits: LimitsConfig::default(),
            defaults: UploadDefaults::default(),
            cors: CorsConfig::default(),
            history: HistoryConfig::default(),
            enable_otel_export: false,
        }
    }
}

impl Default for GithubApiConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse("https://api.github.com").expect("static URL is valid"),
            user_agent: concat!("picser/", env!("CARGO_PKG_VERSION")).to_string(),
            request_timeout: Duration::from_secs(60),
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

impl Default for UploadDefaults {
    fn default() -> Self {
        Self {
            branch: default_branch(),
            folder: default_folder(),
        }
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![CorsOrigin::Wildcard],
            allow_credentials: false,
            max_age: Some(3600), // Cache preflight for 1 hour
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(".picser/history.json"),
            capacity: crate::history::DEFAULT_CAPACITY,
        }
    }
}

fn github_env_names_repository() -> bool {
    ["GITHUB_OWNER", "GITHUB_REPO"]
        .iter()
        .all(|key| std::env::var(key).is_ok_and(|value| !value.trim().is_empty()))
}

impl Config {
    #[allow(clippy::result_large_err)]
    pub fn load(args: &Args) -> Result<Self, figment::Error> {
        let config: Self = Self::figment(args).extract()?;
        config.validate().map_err(|e| figment::Error::from(e.to_string()))?;
        Ok(config)
    }

    /// Validate the configuration for consistency and required fields
    pub fn validate(&self) -> Result<(), Error> {
        if let Some(github) = &self.github {
            let mut missing = Vec::new();
            if github.token.is_empty() {
                missing.push("token");
            }
            if github.owner.trim().is_empty() {
                missing.push("owner");
            }
            if github.repo.trim().is_empty() {
                missing.push("repo");
            }
            if github.branch.trim().is_empty() {
                missing.push("branch");
            }
            if !missing.is_empty() {
                return Err(Error::Internal {
                    operation: format!(
                        "Config validation: github section is incomplete, missing: {}. \
                         Set GITHUB_TOKEN, GITHUB_OWNER and GITHUB_REPO or remove the section.",
                        missing.join(", ")
                    ),
                });
            }
        }

        if self.limits.max_file_size == 0 {
            return Err(Error::Internal {
                operation: "Config validation: limits.max_file_size must be greater than zero".to_string(),
            });
        }

        if self.defaults.branch.trim().is_empty() {
            return Err(Error::Internal {
                operation: "Config validation: defaults.branch cannot be empty".to_string(),
            });
        }

        if self.history.capacity == 0 {
            return Err(Error::Internal {
                operation: "Config validation: history.capacity must be at least 1".to_string(),
            });
        }

        if self.github_api.user_agent.trim().is_empty() {
            return Err(Error::Internal {
                operation: "Config validation: github_api.user_agent cannot be empty".to_string(),
            });
        }

        // Validate that wildcard is not used with credentials
        let has_wildcard = self.cors.allowed_origins.iter().any(|origin| matches!(origin, CorsOrigin::Wildcard));
        if has_wildcard && self.cors.allow_credentials {
            return Err(Error::Internal {
                operation: "Config validation: CORS cannot use wildcard origin '*' with allow_credentials=true. Specify explicit origins."
                    .to_string(),
            });
        }

        Ok(())
    }

    pub fn figment(args: &Args) -> Figment {
        let figment = Figment::new()
            // Load base config file
            .merge(Yaml::file(&args.config))
            // Environment variables can still override specific values
            // (CLI-only variables share the prefix and are skipped)
            .merge(Env::prefixed("PICSER_").ignore(&["config", "server", "upload_token"]).split("__"));

        // A lone GITHUB_TOKEN is common in CI and `gh` shells; only a usable set names a repository
        if !github_env_names_repository() {
            return figment;
        }

        // Conventional deployment variables feed the single-tenant section
        figment.merge(
            Env::raw()
                .only(GITHUB_ENV_VARS)
                .map(|key| format!("github.{}", key.as_str().to_ascii_lowercase().trim_start_matches("github_")).into()),
        )
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    fn args(path: &str) -> Args {
        Args {
            config: path.to_string(),
            validate: false,
            command: None,
        }
    }

    #[test]
    fn defaults_without_config_file() {
        Jail::expect_with(|jail| {
            jail.clear_env();
            let config = Config::load(&args("missing.yaml"))?;

            assert_eq!(config.port, 3000);
            assert!(config.github.is_none());
            assert_eq!(config.limits.max_file_size, 104_857_600);
            assert_eq!(config.defaults.branch, "main");
            assert_eq!(config.defaults.folder, "uploads");
            assert_eq!(config.history.capacity, 50);
            assert_eq!(config.github_api.base_url.as_str(), "https://api.github.com/");
            Ok(())
        });
    }

    #[test]
    fn single_tenant_section_from_yaml() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "test.yaml",
                r#"
github:
  token: ghp_yaml
  owner: acme
  repo: imgs
github_api:
  request_timeout: 15s
"#,
            )?;

            let config = Config::load(&args("test.yaml"))?;
            let github = config.github.expect("github section");
            assert_eq!(github.token.expose(), "ghp_yaml");
            assert_eq!(github.branch, "main");
            assert_eq!(github.folder, "uploads");
            assert_eq!(config.github_api.request_timeout, Duration::from_secs(15));

            let target = github.target();
            assert_eq!(target.coordinates, RepoCoordinates::new("acme", "imgs", "main"));
            Ok(())
        });
    }

    #[test]
    fn conventional_github_env_vars() {
        Jail::expect_with(|jail| {
            jail.set_env("GITHUB_TOKEN", "ghp_env");
            jail.set_env("GITHUB_OWNER", "acme");
            jail.set_env("GITHUB_REPO", "imgs");
            jail.set_env("GITHUB_BRANCH", "assets");

            let config = Config::load(&args("missing.yaml"))?;
            let github = config.github.expect("github section");
            assert_eq!(github.token.expose(), "ghp_env");
            assert_eq!(github.owner, "acme");
            assert_eq!(github.repo, "imgs");
            assert_eq!(github.branch, "assets");
            Ok(())
        });
    }

    #[test]
    fn lone_github_token_is_ignored() {
        Jail::expect_with(|jail| {
            jail.clear_env();
            jail.set_env("GITHUB_TOKEN", "ghp_ambient");

            let mut history_args = args("missing.yaml");
            history_args.command = Some(Command::History {
                action: HistoryAction::List,
            });
            let config = Config::load(&history_args)?;
            assert!(config.github.is_none());

            let config = Config::load(&args("missing.yaml"))?;
            assert!(config.github.is_none());
            Ok(())
        });
    }

    #[test]
    fn github_env_without_token_still_fails_validation() {
        Jail::expect_with(|jail| {
            jail.clear_env();
            jail.set_env("GITHUB_OWNER", "acme");
            jail.set_env("GITHUB_REPO", "imgs");

            assert!(Config::load(&args("missing.yaml")).is_err());
            Ok(())
        });
    }

    #[test]
    fn upload_args_debug_redacts_token() {
        let args = Args::try_parse_from([
            "picser",
            "upload",
            "cat.png",
            "--token",
            "ghp_secret_value",
            "--owner",
            "acme",
            "--repo",
            "imgs",
        ])
        .unwrap();

        let rendered = format!("{:?}", args);
        assert!(!rendered.contains("ghp_secret_value"), "{rendered}");
        let Some(Command::Upload(upload)) = args.command else {
            panic!("expected upload subcommand");
        };
        assert_eq!(upload.token.unwrap().expose(), "ghp_secret_value");
    }

    #[test]
    fn prefixed_env_override() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "test.yaml",
                r#"
port: 4000
limits:
  max_file_size: 1024
"#,
            )?;

            jail.set_env("PICSER_HOST", "127.0.0.1");
            jail.set_env("PICSER_PORT", "8080");
            jail.set_env("PICSER_DEFAULTS__FOLDER", "images");

            let config = Config::load(&args("test.yaml"))?;

            // Env vars should override
            assert_eq!(config.host, "127.0.0.1");
            assert_eq!(config.port, 8080);
            assert_eq!(config.defaults.folder, "images");

            // YAML values should be preserved
            assert_eq!(config.limits.max_file_size, 1024);
            Ok(())
        });
    }

    #[test]
    fn incomplete_github_section_fails_at_load() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "test.yaml",
                r#"
github:
  token: ""
  owner: acme
  repo: imgs
"#,
            )?;

            let err = Config::load(&args("test.yaml")).unwrap_err();
            assert!(err.to_string().contains("missing: token"), "{err}");
            Ok(())
        });
    }

    #[test]
    fn zero_file_size_rejected() {
        let mut config = Config::default();
        config.limits.max_file_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn wildcard_with_credentials_rejected() {
        let mut config = Config::default();
        config.cors.allow_credentials = true;
        assert!(config.validate().is_err());

        config.cors.allowed_origins = vec![CorsOrigin::Url(Url::parse("https://app.example.com").unwrap())];
        assert!(config.validate().is_ok());
    }

    #[test]
    fn unknown_fields_rejected() {
        Jail::expect_with(|jail| {
            jail.create_file("test.yaml", "not_a_field: true\n")?;
            assert!(Config::load(&args("test.yaml")).is_err());
            Ok(())
        });
    }
}
