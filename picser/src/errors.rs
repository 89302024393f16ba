use crate::github::GithubError;
use crate::upload::validator::ValidationError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;
use tracing::Level;
use utoipa::ToSchema;

/// Message returned when GitHub rejects the credential
pub const INVALID_TOKEN_MESSAGE: &str = "Invalid GitHub token";
/// Message returned when the repository or branch cannot be reached
pub const REPO_NOT_FOUND_MESSAGE: &str = "Repository not found or insufficient permissions";

#[derive(ThisError, Debug)]
pub enum Error {
    /// Bad file type, oversized file, or no file at all
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Invalid request data (missing fields, malformed multipart)
    #[error("{message}")]
    BadRequest { message: String },

    /// GitHub rejected the credential
    #[error("{}", INVALID_TOKEN_MESSAGE)]
    Unauthorized { upstream: String },

    /// Repository or branch absent, or not visible with this credential
    #[error("{}", REPO_NOT_FOUND_MESSAGE)]
    NotFound { upstream: String },

    /// Any other failure reported by GitHub, message passed through verbatim
    #[error("{operation} failed: {message}")]
    Upstream { operation: String, message: String },

    /// Generic internal service error
    #[error("Failed to {operation}")]
    Internal { operation: String },

    /// Unexpected error with full context chain
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// JSON body of every error response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

impl Error {
    /// Wrap a GitHub failure that happened while performing `operation` (e.g. "Upload").
    pub fn from_github(operation: &str, err: GithubError) -> Self {
        match err {
            GithubError::Unauthorized(upstream) => Error::Unauthorized { upstream },
            GithubError::NotFound(upstream) => Error::NotFound { upstream },
            GithubError::Upstream { message, .. } => Error::Upstream {
                operation: operation.to_string(),
                message,
            },
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Validation(_) | Error::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Error::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::Upstream { .. } | Error::Internal { .. } | Error::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Log level for this error: every 5xx is an error, GitHub access denials are info and
    /// client mistakes are debug.
    pub fn severity(&self) -> Level {
        match self {
            Error::Internal { .. } | Error::Other(_) | Error::Upstream { .. } => Level::ERROR,
            Error::Unauthorized { .. } | Error::NotFound { .. } => Level::INFO,
            Error::Validation(_) | Error::BadRequest { .. } => Level::DEBUG,
        }
    }

    /// Returns a user-safe error message, without leaking internal implementation details
    pub fn user_message(&self) -> String {
        match self {
            Error::Internal { .. } | Error::Other(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        // Log full error details for debugging - different log levels based on severity
        match (self.severity(), &self) {
            (Level::ERROR, _) => tracing::error!("Service error: {:#}", self),
            (_, Error::Unauthorized { upstream } | Error::NotFound { upstream }) => {
                tracing::info!(upstream = %upstream, "GitHub access error: {}", self)
            }
            _ => tracing::debug!("Client error: {}", self),
        }

        let status = self.status_code();
        let body = ErrorResponse {
            error: self.user_message(),
        };
        (status, Json(body)).into_response()
    }
}

/// Type alias for service operation results
pub type Result<T> = std::result::Result<T, Error>;
